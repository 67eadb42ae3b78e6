//! Kill Tracker - live bounty and massacre-mission dashboard
//!
//! Tails a JSONL event feed written by the game-client plugin and renders the
//! running kill log, bounty rollups, mission totals and ship grid in the terminal.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin killtracker -- [--backend file|sqlite] [--replay] [--demo]
//! ```
//!
//! ## Environment Variables
//!
//! - KILLTRACKER_EVENTS_PATH - JSONL event feed (default: streams/events.jsonl)
//! - KILLTRACKER_DATA_DIR - Snapshot directory for the file backend (default: data)
//! - KILLTRACKER_DB_PATH - SQLite database for the sqlite backend (default: data/killtracker.db)
//! - KILLTRACKER_SHIP_DATA - Ship data file or URL (default: static/ship_data.json)
//! - KILLTRACKER_ROWS_PER_PAGE - Kill log page size (default: 10)
//! - KILLTRACKER_CHANNEL_BUFFER - Tracker channel capacity (default: 1000)
//! - KILLTRACKER_AUTOSAVE_SECS - Autosave interval, 0 disables (default: 0)
//! - RUST_LOG - Logging level (optional, default: info)

use killtracker::{
    config::TrackerConfig,
    demo,
    events::{forward_events, JsonlFeed},
    persistence::{BlobStore, MemoryBlobStore, PersistenceBridge},
    reference::ShipCatalog,
    tracker::{autosave_task, tracker_task, Tracker, TrackerMessage},
    ui,
};
use std::{path::Path, sync::Arc, time::Duration};
use tokio::sync::{mpsc, RwLock};

/// Make sure the feed exists so the reader can start before the first event arrives
async fn ensure_feed_file(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr so they stay out of the alternate screen
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = TrackerConfig::from_env();

    log::info!("🚀 Starting Kill Tracker");
    log::info!("   Event feed: {}", config.events_path.display());
    log::info!("   Backend: {}", config.backend.as_str());
    log::info!("   Ship data: {}", config.ship_data);
    log::info!("   Rows per page: {}", config.rows_per_page);

    // Ship names resolve to placeholders until this finishes
    let catalog = ShipCatalog::new();
    {
        let catalog = catalog.clone();
        let source = config.ship_data.clone();
        tokio::spawn(async move {
            if let Err(e) = catalog.load(&source).await {
                log::warn!("Failed to load ship data from {}: {}", source, e);
            }
        });
    }

    let blobs: Box<dyn BlobStore> = match config.open_blob_store() {
        Ok(blobs) => blobs,
        Err(e) => {
            log::error!("Failed to open {} backend, snapshots will not persist: {}", config.backend.as_str(), e);
            Box::new(MemoryBlobStore::new())
        }
    };

    let mut tracker = Tracker::new(PersistenceBridge::new(blobs), catalog, config.rows_per_page);
    tracker.restore();
    let tracker = Arc::new(RwLock::new(tracker));

    let (tx, rx) = mpsc::channel::<TrackerMessage>(config.channel_buffer);

    let tracker_handle = tokio::spawn(tracker_task(rx, tracker.clone()));

    ensure_feed_file(&config.events_path).await?;
    let mut feed = JsonlFeed::new(config.events_path.clone());
    if config.replay {
        feed = feed.from_start();
    }
    feed.start().await?;
    tokio::spawn(forward_events(feed, tx.clone(), TrackerMessage::Inbound));

    if let Some(every) = config.autosave_interval {
        log::info!("💾 Autosave every {}s", every.as_secs());
        tokio::spawn(autosave_task(tx.clone(), every));
    }

    if config.demo {
        tokio::spawn(demo::demo_task(tx.clone(), Duration::from_secs(2)));
    }

    log::info!("✅ Tracker running");

    if let Err(e) = ui::run_ui(tracker.clone(), tx.clone()).await {
        log::error!("UI error: {}", e);
    }

    // Final snapshot happens in the tracker task
    if tx.send(TrackerMessage::Shutdown).await.is_err() {
        log::warn!("Tracker already stopped, last changes may be unsaved");
    }
    tracker_handle.await?;

    log::info!("👋 Kill Tracker stopped");
    Ok(())
}
