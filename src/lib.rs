//! Live bounty and massacre-mission dashboard for Elite Dangerous
//!
//! ```text
//! JSONL feed ─┐
//! demo ───────┼─► mpsc ─► tracker_task ─► Tracker { store, rollups, views, persistence }
//! UI keys ────┘                                   ▲
//!                                   UI (read lock)┘
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod events;
pub mod persistence;
pub mod reference;
pub mod rollup;
pub mod store;
pub mod tracker;
pub mod ui;
pub mod view;

pub use error::{TrackerError, TrackerResult};
pub use tracker::{Tracker, TrackerMessage, ViewCommand};
