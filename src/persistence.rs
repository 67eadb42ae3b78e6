use {
    crate::{
        error::{TrackerError, TrackerResult},
        events::{
            normalizer::{kill_from_payload, mission_from_payload},
            KillEvent, MissionEvent,
        },
        store::AggregationStore,
    },
    rusqlite::{params, Connection, OptionalExtension},
    std::{
        collections::HashMap,
        fs,
        path::{Path, PathBuf},
        sync::Mutex,
    },
};

/// Blob holding the kill log as a JSON array
pub const KILLS_KEY: &str = "killTracker-kills";
/// Blob holding the mission map as a JSON object keyed by mission id
pub const MISSIONS_KEY: &str = "killTracker-missions";

/// Whole-value string storage keyed by name
pub trait BlobStore: Send + Sync {
    fn load(&self, key: &str) -> TrackerResult<Option<String>>;

    fn save(&self, key: &str, value: &str) -> TrackerResult<()>;

    /// Delete a blob; deleting an absent blob is not an error
    fn remove(&self, key: &str) -> TrackerResult<()>;

    /// Backend type for logging
    fn backend_type(&self) -> &'static str;
}

/// Volatile store, used by tests and as a fallback when no backend opens
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> TrackerResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.blobs
            .lock()
            .map_err(|_| TrackerError::Database("memory store lock poisoned".to_string()))
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, key: &str) -> TrackerResult<Option<String>> {
        Ok(self.blobs()?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> TrackerResult<()> {
        self.blobs()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> TrackerResult<()> {
        self.blobs()?.remove(key);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

/// One `<key>.json` file per blob inside a directory
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl BlobStore for FileBlobStore {
    fn load(&self, key: &str) -> TrackerResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn save(&self, key: &str, value: &str) -> TrackerResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Write then rename so a crash mid-write never leaves a truncated blob
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> TrackerResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_type(&self) -> &'static str {
        "file"
    }
}

/// Blobs in a single SQLite table
pub struct SqliteBlobStore {
    conn: Mutex<Connection>,
}

const BLOBS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS blobs (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
)";

impl SqliteBlobStore {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("SQLite journal mode: {}", mode);

        conn.execute_batch(BLOBS_SCHEMA)?;
        log::info!("📊 Opened blob store at {}", path.display());

        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn in_memory() -> TrackerResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(BLOBS_SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> TrackerResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TrackerError::Database("connection lock poisoned".to_string()))
    }
}

impl BlobStore for SqliteBlobStore {
    fn load(&self, key: &str) -> TrackerResult<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM blobs WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn save(&self, key: &str, value: &str) -> TrackerResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> TrackerResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM blobs WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "sqlite"
    }
}

/// What a restore brought back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub kills: usize,
    pub missions: usize,
    /// Records present in a blob that could not be replayed
    pub skipped: usize,
}

/// Saves and reloads the store as two whole-snapshot blobs
pub struct PersistenceBridge {
    blobs: Box<dyn BlobStore>,
}

impl PersistenceBridge {
    pub fn new(blobs: Box<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBlobStore::new()))
    }

    pub fn backend_type(&self) -> &'static str {
        self.blobs.backend_type()
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    /// Write the kill log and mission map
    pub fn snapshot(&self, store: &AggregationStore) -> TrackerResult<()> {
        self.blobs.save(KILLS_KEY, &encode_kills(store.kills())?)?;
        self.blobs.save(MISSIONS_KEY, &encode_missions(store.missions())?)?;

        log::info!(
            "💾 Saved {} kills and {} missions ({})",
            store.kill_count(),
            store.mission_count(),
            self.backend_type()
        );
        Ok(())
    }

    /// Reset the store and replay both blobs into it.
    ///
    /// Missing, unreadable or corrupt blobs count as no data. The caller rebuilds
    /// rollups and views once afterwards; nothing is saved during the replay.
    pub fn restore(&self, store: &mut AggregationStore) -> RestoreReport {
        store.reset();
        let mut report = RestoreReport::default();

        if let Some(json) = self.load_blob(KILLS_KEY) {
            let (kills, skipped) = decode_kills(&json);
            report.kills = kills.len();
            report.skipped += skipped;
            for kill in kills {
                store.append_kill(kill);
            }
        }

        if let Some(json) = self.load_blob(MISSIONS_KEY) {
            let (missions, skipped) = decode_missions(&json);
            report.missions = missions.len();
            report.skipped += skipped;
            for mission in missions {
                store.upsert_mission(mission);
            }
        }

        log::info!(
            "📂 Restored {} kills and {} missions ({} skipped)",
            report.kills,
            report.missions,
            report.skipped
        );
        report
    }

    /// Delete both blobs and empty the store
    pub fn clear(&self, store: &mut AggregationStore) -> TrackerResult<()> {
        store.reset();
        self.blobs.remove(KILLS_KEY)?;
        self.blobs.remove(MISSIONS_KEY)?;
        log::info!("🧹 Cleared saved data ({})", self.backend_type());
        Ok(())
    }

    fn load_blob(&self, key: &str) -> Option<String> {
        match self.blobs.load(key) {
            Ok(Some(json)) => Some(json),
            Ok(None) => {
                log::info!("No saved data for {}", key);
                None
            }
            Err(e) => {
                log::warn!("Failed to read {}: {}", key, e);
                None
            }
        }
    }
}

pub fn encode_kills(kills: &[KillEvent]) -> TrackerResult<String> {
    Ok(serde_json::to_string(kills)?)
}

/// Missions as an object keyed by id, in mission order
pub fn encode_missions(missions: &[MissionEvent]) -> TrackerResult<String> {
    let mut map = serde_json::Map::with_capacity(missions.len());
    for mission in missions {
        map.insert(mission.id.clone(), serde_json::to_value(mission)?);
    }
    Ok(serde_json::to_string(&map)?)
}

/// Decode a kill blob through the normalizer. Returns the kills and the number skipped.
pub fn decode_kills(json: &str) -> (Vec<KillEvent>, usize) {
    let records = match serde_json::from_str::<serde_json::Value>(json) {
        Ok(serde_json::Value::Array(records)) => records,
        Ok(_) => {
            log::warn!("Saved kill data is not an array, ignoring it");
            return (Vec::new(), 0);
        }
        Err(e) => {
            log::warn!("Error parsing saved kill data: {}", e);
            return (Vec::new(), 0);
        }
    };

    let total = records.len();
    let kills: Vec<KillEvent> = records.iter().filter_map(kill_from_payload).collect();
    if kills.len() < total {
        log::warn!("Skipped {} unreadable kill records", total - kills.len());
    }
    let skipped = total - kills.len();
    (kills, skipped)
}

/// Decode a mission blob through the normalizer. Returns the missions and the number skipped.
pub fn decode_missions(json: &str) -> (Vec<MissionEvent>, usize) {
    let records = match serde_json::from_str::<serde_json::Value>(json) {
        Ok(serde_json::Value::Object(records)) => records,
        Ok(_) => {
            log::warn!("Saved mission data is not an object, ignoring it");
            return (Vec::new(), 0);
        }
        Err(e) => {
            log::warn!("Error parsing saved mission data: {}", e);
            return (Vec::new(), 0);
        }
    };

    let total = records.len();
    let missions: Vec<MissionEvent> = records.values().filter_map(mission_from_payload).collect();
    if missions.len() < total {
        log::warn!("Skipped {} unreadable mission records", total - missions.len());
    }
    let skipped = total - missions.len();
    (missions, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventType, RewardShare};

    fn sample_store() -> AggregationStore {
        let mut store = AggregationStore::new();
        store.append_kill(KillEvent {
            timestamp: "2025-03-01T10:00:00Z".to_string(),
            event_type: EventType::Bounty,
            ship_name: "Vulture".to_string(),
            victim_faction: Some("Pirates".to_string()),
            bounty_amount: 1_000,
            rewards: vec![RewardShare { faction: "Federal Navy".to_string(), reward: 1_000 }],
        });
        store.append_kill(KillEvent {
            timestamp: "2025-03-01T10:01:00Z".to_string(),
            event_type: EventType::Bounty,
            ship_name: "Eagle".to_string(),
            victim_faction: None,
            bounty_amount: 0,
            rewards: Vec::new(),
        });
        store.upsert_mission(MissionEvent {
            id: "9".to_string(),
            is_massacre: true,
            faction: "Federation".to_string(),
            target: "Empire".to_string(),
            kills_required: 12,
            reward: 2_000_000,
        });
        store.upsert_mission(MissionEvent {
            id: "10".to_string(),
            is_massacre: true,
            faction: "Empire".to_string(),
            target: "Federation".to_string(),
            kills_required: 4,
            reward: 300_000,
        });
        store
    }

    fn assert_round_trip(bridge: PersistenceBridge) {
        let original = sample_store();
        bridge.snapshot(&original).unwrap();

        let mut restored = AggregationStore::new();
        let report = bridge.restore(&mut restored);
        assert_eq!(report, RestoreReport { kills: 2, missions: 2, skipped: 0 });
        assert_eq!(restored, original);
    }

    #[test]
    fn test_memory_round_trip() {
        assert_round_trip(PersistenceBridge::in_memory());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        assert_round_trip(PersistenceBridge::new(Box::new(FileBlobStore::new(dir.path()))));
        assert!(dir.path().join("killTracker-kills.json").exists());
    }

    #[test]
    fn test_sqlite_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteBlobStore::open(dir.path().join("nested").join("tracker.db")).unwrap();
        assert_round_trip(PersistenceBridge::new(Box::new(store)));
    }

    #[test]
    fn test_missions_are_keyed_by_id() {
        let json = encode_missions(sample_store().missions()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["9"]["kills"], 12);
        assert_eq!(value["10"]["ID"], "10");
    }

    #[test]
    fn test_corrupt_blob_is_no_data() {
        let bridge = PersistenceBridge::in_memory();
        bridge.blobs().save(KILLS_KEY, "[{\"timestamp\": ").unwrap();
        bridge.blobs().save(MISSIONS_KEY, "[1, 2, 3]").unwrap();

        let mut store = sample_store();
        let report = bridge.restore(&mut store);
        assert_eq!(report, RestoreReport::default());
        assert!(store.is_empty());
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let (kills, skipped) = decode_kills(
            r#"[{"eventType":"Bounty","shipname":"Eagle","bountyAmount":5}, {"eventType":"Docked"}, 42]"#,
        );
        assert_eq!(kills.len(), 1);
        assert_eq!(skipped, 2);

        let (missions, skipped) = decode_missions(r#"{"1": {"ID": 1, "isMassacre": true}, "2": {"ID": 2}}"#);
        assert_eq!(missions.len(), 1);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_clear_removes_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = PersistenceBridge::new(Box::new(FileBlobStore::new(dir.path())));
        let mut store = sample_store();
        bridge.snapshot(&store).unwrap();

        bridge.clear(&mut store).unwrap();
        assert!(store.is_empty());
        assert_eq!(bridge.blobs().load(KILLS_KEY).unwrap(), None);
        assert_eq!(bridge.blobs().load(MISSIONS_KEY).unwrap(), None);

        // Clearing twice is fine
        bridge.clear(&mut store).unwrap();
    }

    #[test]
    fn test_sqlite_overwrite_and_remove() {
        let store = SqliteBlobStore::in_memory().unwrap();
        store.save("k", "one").unwrap();
        store.save("k", "two").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("two"));
        store.remove("k").unwrap();
        assert_eq!(store.load("k").unwrap(), None);
    }
}
