use crate::events::{KillEvent, MissionEvent};

/// Authoritative in-memory model: the append-only kill log and the active
/// massacre missions.
///
/// The kill log keeps arrival order; display ordering is a view concern.
/// Missions iterate in the order they were first accepted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationStore {
    /// Every kill ever received, oldest first
    kills: Vec<KillEvent>,
    /// Active missions keyed by id (few enough that a linear scan is fine)
    missions: Vec<MissionEvent>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a kill. Duplicates are valid (simultaneous kills share timestamps).
    pub fn append_kill(&mut self, kill: KillEvent) {
        self.kills.push(kill);
    }

    /// Insert a mission or replace the one with the same id in place
    pub fn upsert_mission(&mut self, mission: MissionEvent) {
        match self.missions.iter_mut().find(|m| m.id == mission.id) {
            Some(existing) => *existing = mission,
            None => self.missions.push(mission),
        }
    }

    /// Remove a mission. Unknown ids are a no-op: the acceptance may predate a reload gap.
    pub fn remove_mission(&mut self, id: &str) -> Option<MissionEvent> {
        let position = self.missions.iter().position(|m| m.id == id)?;
        Some(self.missions.remove(position))
    }

    pub fn reset(&mut self) {
        self.kills.clear();
        self.missions.clear();
    }

    pub fn kills(&self) -> &[KillEvent] {
        &self.kills
    }

    pub fn missions(&self) -> &[MissionEvent] {
        &self.missions
    }

    pub fn mission(&self, id: &str) -> Option<&MissionEvent> {
        self.missions.iter().find(|m| m.id == id)
    }

    pub fn kill_count(&self) -> usize {
        self.kills.len()
    }

    pub fn mission_count(&self) -> usize {
        self.missions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kills.is_empty() && self.missions.is_empty()
    }
}
