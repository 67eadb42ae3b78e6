//! The tracker owns one of each engine component and applies messages to them
//! one at a time.
//!
//! Feed readers, the demo generator, the autosave timer and the UI all talk to
//! the tracker through a single `mpsc` channel. The tracker task applies each
//! message under the write lock before taking the next, so every kill and
//! every view command runs to completion. The UI only ever takes read locks.

use {
    crate::{
        demo,
        error::TrackerResult,
        events::{normalize, InboundEvent, KillEvent, MissionEvent, MissionOutcome, Normalized},
        persistence::{PersistenceBridge, RestoreReport},
        reference::ShipCatalog,
        rollup::RollupEngine,
        store::AggregationStore,
        view::{KillLogPage, ShipCard, TableId, TableView, ViewProjector},
    },
    std::{sync::Arc, time::Duration},
    tokio::sync::{mpsc, RwLock},
};

/// User actions forwarded by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCommand {
    NextPage,
    PreviousPage,
    SetRowsPerPage(usize),
    SortKillsByTime,
    ToggleSort { table: TableId, column: usize },
    CycleGridMode,
    Clear,
    Reload,
    Save,
    DemoKill,
    DemoMission,
}

/// Message sent through the channel to the tracker task
#[derive(Debug, Clone)]
pub enum TrackerMessage {
    Inbound(InboundEvent),
    Command(ViewCommand),
    Shutdown,
}

pub struct Tracker {
    store: AggregationStore,
    rollups: RollupEngine,
    views: ViewProjector,
    catalog: ShipCatalog,
    persistence: PersistenceBridge,
    /// Commander/location line from the latest test event
    status: Option<String>,
    /// Short description of the last state change, for the footer
    last_activity: Option<String>,
}

impl Tracker {
    pub fn new(persistence: PersistenceBridge, catalog: ShipCatalog, rows_per_page: usize) -> Self {
        Self {
            store: AggregationStore::new(),
            rollups: RollupEngine::new(),
            views: ViewProjector::new(rows_per_page),
            catalog,
            persistence,
            status: None,
            last_activity: None,
        }
    }

    /// Normalize and apply one inbound event. Returns whether any state changed.
    pub fn dispatch(&mut self, event: &InboundEvent) -> bool {
        log::debug!("Dispatching {}", event.name.as_str());
        let normalized = normalize(event, &self.catalog);
        self.apply(normalized)
    }

    /// Apply an already-normalized event
    pub fn apply(&mut self, normalized: Normalized) -> bool {
        match normalized {
            Normalized::Kill { kill, status } => {
                if status.is_some() {
                    self.status = status;
                }
                self.record_kill(kill);
                true
            }
            Normalized::MissionAccepted(mission) => {
                self.accept_mission(mission);
                true
            }
            Normalized::MissionClosed { id, outcome, reward } => self.close_mission(&id, outcome, reward),
            Normalized::Probe => {
                log::info!("📡 Server connectivity probe received");
                self.last_activity = Some("Server test received".to_string());
                false
            }
            Normalized::Ignored => false,
        }
    }

    /// Append a kill, fold it into the rollups and bring the log back to newest-first
    pub fn record_kill(&mut self, kill: KillEvent) {
        log::debug!("Kill: {} ({} cr)", kill.ship_name, kill.bounty_amount);
        self.rollups.apply_kill(&kill);
        self.last_activity = Some(format!("Killed {}", kill.ship_name));
        self.store.append_kill(kill);
        self.views.sort_kills_by_time();
    }

    pub fn accept_mission(&mut self, mission: MissionEvent) {
        log::debug!("Mission {} accepted: {} vs {}", mission.id, mission.faction, mission.target);
        self.last_activity = Some(format!("Mission {} accepted", mission.id));
        self.store.upsert_mission(mission);
        self.rollups.rebuild_missions(&self.store);
    }

    /// Drop a mission on fail or complete. Unknown ids change nothing.
    pub fn close_mission(&mut self, id: &str, outcome: MissionOutcome, reward: Option<u64>) -> bool {
        if self.store.remove_mission(id).is_none() {
            log::debug!("{:?} for unknown mission {}", outcome, id);
            return false;
        }

        match (outcome, reward) {
            (MissionOutcome::Completed, Some(reward)) => {
                log::info!("✅ Mission {} completed for {} credits", id, reward)
            }
            (MissionOutcome::Completed, None) => log::info!("✅ Mission {} completed", id),
            (MissionOutcome::Failed, _) => log::info!("❌ Mission {} failed", id),
        }

        self.last_activity = Some(format!("Mission {} {:?}", id, outcome).to_lowercase());
        self.rollups.rebuild_missions(&self.store);
        true
    }

    /// Apply a UI command
    pub fn command(&mut self, command: ViewCommand) -> TrackerResult<()> {
        match command {
            ViewCommand::NextPage => {
                let total = self.store.kill_count();
                self.views.pagination_mut().next_page(total);
            }
            ViewCommand::PreviousPage => self.views.pagination_mut().previous_page(),
            ViewCommand::SetRowsPerPage(rows) => self.views.pagination_mut().set_rows_per_page(rows),
            ViewCommand::SortKillsByTime => self.views.sort_kills_by_time(),
            ViewCommand::ToggleSort { table, column } => self.views.toggle_sort(table, column),
            ViewCommand::CycleGridMode => {
                let mode = self.views.cycle_grid_mode();
                log::debug!("Grid sorted by {}", mode.label());
            }
            ViewCommand::Clear => self.clear()?,
            ViewCommand::Reload => {
                self.restore();
            }
            ViewCommand::Save => self.snapshot()?,
            ViewCommand::DemoKill => {
                let kill = demo::random_kill(&mut rand::thread_rng());
                self.record_kill(kill);
            }
            ViewCommand::DemoMission => {
                let mission = demo::random_mission(&mut rand::thread_rng());
                self.accept_mission(mission);
            }
        }
        Ok(())
    }

    /// Replace the in-memory state with the persisted snapshot, then rebuild once
    pub fn restore(&mut self) -> RestoreReport {
        let report = self.persistence.restore(&mut self.store);
        self.rollups.rebuild(&self.store);
        self.views.sort_kills_by_time();
        self.last_activity = Some(format!(
            "Restored {} kills, {} missions",
            report.kills, report.missions
        ));
        report
    }

    pub fn snapshot(&mut self) -> TrackerResult<()> {
        self.persistence.snapshot(&self.store)?;
        self.last_activity = Some("Saved".to_string());
        Ok(())
    }

    /// Forget everything, on disk and in memory
    pub fn clear(&mut self) -> TrackerResult<()> {
        self.rollups.clear();
        self.views.pagination_mut().reset();
        self.status = None;
        self.last_activity = Some("Cleared".to_string());
        self.persistence.clear(&mut self.store)
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    pub fn rollups(&self) -> &RollupEngine {
        &self.rollups
    }

    pub fn views(&self) -> &ViewProjector {
        &self.views
    }

    pub fn catalog(&self) -> &ShipCatalog {
        &self.catalog
    }

    pub fn persistence(&self) -> &PersistenceBridge {
        &self.persistence
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn last_activity(&self) -> Option<&str> {
        self.last_activity.as_deref()
    }

    pub fn kill_log(&self) -> KillLogPage {
        self.views.kill_log(&self.store)
    }

    pub fn summary(&self, table: TableId) -> TableView {
        self.views.summary(table, &self.rollups)
    }

    pub fn ship_cards(&self) -> Vec<ShipCard> {
        self.views
            .ship_cards(self.rollups.keyed(crate::rollup::RollupKind::ShipType))
    }
}

/// Background task that receives messages and applies them to the tracker.
/// Takes a final snapshot on shutdown.
pub async fn tracker_task(mut receiver: mpsc::Receiver<TrackerMessage>, tracker: Arc<RwLock<Tracker>>) {
    while let Some(msg) = receiver.recv().await {
        match msg {
            TrackerMessage::Inbound(event) => {
                let mut tracker = tracker.write().await;
                tracker.dispatch(&event);
            }
            TrackerMessage::Command(command) => {
                let mut tracker = tracker.write().await;
                if let Err(e) = tracker.command(command) {
                    log::warn!("Command {:?} failed: {}", command, e);
                }
            }
            TrackerMessage::Shutdown => {
                log::info!("Tracker shutting down");
                let mut tracker = tracker.write().await;
                if let Err(e) = tracker.snapshot() {
                    log::warn!("Failed to save snapshot on shutdown: {}", e);
                }
                break;
            }
        }
    }
}

/// Ask the tracker to save every `every`
pub async fn autosave_task(tx: mpsc::Sender<TrackerMessage>, every: Duration) {
    let mut timer = tokio::time::interval(every);
    // First tick fires immediately; nothing worth saving yet
    timer.tick().await;

    loop {
        timer.tick().await;
        if tx.send(TrackerMessage::Command(ViewCommand::Save)).await.is_err() {
            break;
        }
    }
}
