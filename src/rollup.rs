//! Keyed rollups over the kill log and the mission board
//!
//! Three kill rollups are maintained incrementally as kills arrive:
//! - by reward faction (one contribution per reward share)
//! - by ship type (bounty amount)
//! - by victim faction (bounty amount)
//!
//! The mission rollup groups active missions by faction pair and is rebuilt from
//! the mission map whenever it changes. Every rollup can be rebuilt from the
//! [`AggregationStore`] at any time and yields the same rows.

use crate::events::{KillEvent, MissionEvent};
use crate::store::AggregationStore;
use std::collections::HashMap;

/// Which kill rollup a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollupKind {
    Faction,
    ShipType,
    VictimFaction,
}

impl RollupKind {
    pub fn all() -> [RollupKind; 3] {
        [RollupKind::Faction, RollupKind::ShipType, RollupKind::VictimFaction]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupRow {
    pub key: String,
    pub total_value: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollupFooter {
    pub total_value: u64,
    pub count: u64,
}

/// Sum + count per key, rows in first-seen order
#[derive(Debug, Clone, Default)]
pub struct KeyedRollup {
    rows: Vec<RollupRow>,
    index: HashMap<String, usize>,
    footer: RollupFooter,
}

impl KeyedRollup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` under `key`. A missing or empty key only refreshes the footer.
    pub fn contribute(&mut self, key: Option<&str>, value: u64) {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            match self.index.get(key) {
                Some(&i) => {
                    let row = &mut self.rows[i];
                    row.total_value = row.total_value.saturating_add(value);
                    row.count = row.count.saturating_add(1);
                }
                None => {
                    self.index.insert(key.to_string(), self.rows.len());
                    self.rows.push(RollupRow {
                        key: key.to_string(),
                        total_value: value,
                        count: 1,
                    });
                }
            }
        }
        self.recompute_footer();
    }

    /// Footer = sums over all rows, saturating at `u64::MAX`. O(rows), bounded by distinct keys.
    pub fn recompute_footer(&mut self) {
        self.footer = self.rows.iter().fold(RollupFooter::default(), |acc, row| RollupFooter {
            total_value: acc.total_value.saturating_add(row.total_value),
            count: acc.count.saturating_add(row.count),
        });
    }

    pub fn rows(&self) -> &[RollupRow] {
        &self.rows
    }

    pub fn row(&self, key: &str) -> Option<&RollupRow> {
        self.index.get(key).map(|&i| &self.rows[i])
    }

    pub fn footer(&self) -> RollupFooter {
        self.footer
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.index.clear();
        self.footer = RollupFooter::default();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionRow {
    /// `faction + target` with whitespace removed
    pub key: String,
    pub faction: String,
    pub target: String,
    pub kills: u64,
    pub reward: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissionFooter {
    /// Most demanding single faction pair; kills across pairs are not additive
    pub max_kills: u64,
    pub total_reward: u64,
}

/// Active massacre missions grouped by faction pair
#[derive(Debug, Clone, Default)]
pub struct MissionRollup {
    rows: Vec<MissionRow>,
    footer: MissionFooter,
}

/// Grouping key for a mission. Direction sensitive: A→B and B→A are different rows.
pub fn faction_pair_key(faction: &str, target: &str) -> String {
    faction
        .chars()
        .chain(target.chars())
        .filter(|c| !c.is_whitespace())
        .collect()
}

impl MissionRollup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild rows and footer from the current missions
    pub fn rebuild<'a>(&mut self, missions: impl IntoIterator<Item = &'a MissionEvent>) {
        self.rows.clear();

        for mission in missions {
            let key = faction_pair_key(&mission.faction, &mission.target);
            match self.rows.iter_mut().find(|r| r.key == key) {
                Some(row) => {
                    row.kills = row.kills.saturating_add(mission.kills_required);
                    row.reward = row.reward.saturating_add(mission.reward);
                }
                None => self.rows.push(MissionRow {
                    key,
                    faction: mission.faction.clone(),
                    target: mission.target.clone(),
                    kills: mission.kills_required,
                    reward: mission.reward,
                }),
            }
        }

        self.footer = MissionFooter {
            max_kills: self.rows.iter().map(|r| r.kills).max().unwrap_or(0),
            total_reward: self.rows.iter().fold(0u64, |acc, r| acc.saturating_add(r.reward)),
        };
    }

    pub fn rows(&self) -> &[MissionRow] {
        &self.rows
    }

    pub fn row(&self, key: &str) -> Option<&MissionRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    pub fn footer(&self) -> MissionFooter {
        self.footer
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.footer = MissionFooter::default();
    }
}

/// All rollups the dashboard shows
#[derive(Debug, Clone, Default)]
pub struct RollupEngine {
    faction: KeyedRollup,
    ship_type: KeyedRollup,
    victim_faction: KeyedRollup,
    missions: MissionRollup,
}

impl RollupEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every rollup from scratch out of the store
    pub fn from_store(store: &AggregationStore) -> Self {
        let mut engine = Self::new();
        engine.rebuild(store);
        engine
    }

    /// Fold one new kill into the three kill rollups
    pub fn apply_kill(&mut self, kill: &KillEvent) {
        if kill.rewards.is_empty() {
            // No reward shares: nothing to attribute, footer refresh only
            self.faction.contribute(None, 0);
        } else {
            for share in &kill.rewards {
                self.faction.contribute(Some(&share.faction), share.reward);
            }
        }

        self.ship_type.contribute(Some(&kill.ship_name), kill.bounty_amount);
        self.victim_faction
            .contribute(kill.victim_faction.as_deref(), kill.bounty_amount);
    }

    pub fn rebuild_missions(&mut self, store: &AggregationStore) {
        self.missions.rebuild(store.missions());
    }

    pub fn rebuild(&mut self, store: &AggregationStore) {
        self.faction.clear();
        self.ship_type.clear();
        self.victim_faction.clear();
        for kill in store.kills() {
            self.apply_kill(kill);
        }
        self.rebuild_missions(store);
    }

    pub fn clear(&mut self) {
        self.faction.clear();
        self.ship_type.clear();
        self.victim_faction.clear();
        self.missions.clear();
    }

    pub fn keyed(&self, kind: RollupKind) -> &KeyedRollup {
        match kind {
            RollupKind::Faction => &self.faction,
            RollupKind::ShipType => &self.ship_type,
            RollupKind::VictimFaction => &self.victim_faction,
        }
    }

    pub fn missions(&self) -> &MissionRollup {
        &self.missions
    }
}
