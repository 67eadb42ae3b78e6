use {
    crate::{
        error::TrackerResult,
        persistence::{BlobStore, FileBlobStore, SqliteBlobStore},
        view::DEFAULT_ROWS_PER_PAGE,
    },
    std::{env, path::PathBuf, time::Duration},
};

/// Where snapshots are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    File,
    Sqlite,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::File => "file",
            BackendType::Sqlite => "sqlite",
        }
    }
}

/// Configuration loaded from environment variables and command-line flags
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub events_path: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    /// Ship data file path or `http(s)://` URL
    pub ship_data: String,
    pub rows_per_page: usize,
    pub channel_buffer: usize,
    /// `None` disables autosave
    pub autosave_interval: Option<Duration>,
    pub backend: BackendType,
    /// Read the feed from the beginning instead of only new lines
    pub replay: bool,
    pub demo: bool,
}

impl TrackerConfig {
    /// Load configuration from the process environment and arguments
    pub fn from_env() -> Self {
        let args: Vec<String> = env::args().collect();
        Self::from_lookup(|key| env::var(key).ok(), &args)
    }

    /// Build a config from any variable lookup; unset or unparseable values fall back to defaults
    pub fn from_lookup<F>(lookup: F, args: &[String]) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let rows_per_page = parse_or("KILLTRACKER_ROWS_PER_PAGE", &var("KILLTRACKER_ROWS_PER_PAGE", ""), DEFAULT_ROWS_PER_PAGE)
            .max(1);
        let channel_buffer = parse_or("KILLTRACKER_CHANNEL_BUFFER", &var("KILLTRACKER_CHANNEL_BUFFER", ""), 1000).max(1);
        let autosave_secs: u64 = parse_or("KILLTRACKER_AUTOSAVE_SECS", &var("KILLTRACKER_AUTOSAVE_SECS", ""), 0);

        Self {
            events_path: PathBuf::from(var("KILLTRACKER_EVENTS_PATH", "streams/events.jsonl")),
            data_dir: PathBuf::from(var("KILLTRACKER_DATA_DIR", "data")),
            db_path: PathBuf::from(var("KILLTRACKER_DB_PATH", "data/killtracker.db")),
            ship_data: var("KILLTRACKER_SHIP_DATA", "static/ship_data.json"),
            rows_per_page,
            channel_buffer,
            autosave_interval: (autosave_secs > 0).then(|| Duration::from_secs(autosave_secs)),
            backend: parse_backend_from_args(args),
            replay: args.iter().any(|a| a == "--replay"),
            demo: args.iter().any(|a| a == "--demo"),
        }
    }

    /// Open the configured snapshot backend
    pub fn open_blob_store(&self) -> TrackerResult<Box<dyn BlobStore>> {
        match self.backend {
            BackendType::File => Ok(Box::new(FileBlobStore::new(&self.data_dir))),
            BackendType::Sqlite => Ok(Box::new(SqliteBlobStore::open(&self.db_path)?)),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: &str, default: T) -> T {
    if raw.trim().is_empty() {
        return default;
    }
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            log::warn!("Invalid {} '{}', using default", key, raw);
            default
        }
    }
}

pub fn parse_backend_from_args(args: &[String]) -> BackendType {
    if let Some(idx) = args.iter().position(|x| x == "--backend") {
        match args.get(idx + 1).map(|s| s.as_str()) {
            Some("sqlite") => return BackendType::Sqlite,
            Some("file") => return BackendType::File,
            other => log::warn!("Unknown backend {:?}, using file", other),
        }
    }

    BackendType::File // Default to JSON files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::from_lookup(|_| None, &args(&["killtracker"]));
        assert_eq!(config.events_path, PathBuf::from("streams/events.jsonl"));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.ship_data, "static/ship_data.json");
        assert_eq!(config.rows_per_page, 10);
        assert_eq!(config.channel_buffer, 1000);
        assert_eq!(config.autosave_interval, None);
        assert_eq!(config.backend, BackendType::File);
        assert!(!config.replay);
        assert!(!config.demo);
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<&str, &str> = [
            ("KILLTRACKER_ROWS_PER_PAGE", "25"),
            ("KILLTRACKER_AUTOSAVE_SECS", "30"),
            ("KILLTRACKER_SHIP_DATA", "https://example.com/ships.json"),
            ("KILLTRACKER_CHANNEL_BUFFER", "lots"),
        ]
        .into_iter()
        .collect();

        let config = TrackerConfig::from_lookup(
            |key| vars.get(key).map(|v| v.to_string()),
            &args(&["killtracker", "--replay", "--demo"]),
        );
        assert_eq!(config.rows_per_page, 25);
        assert_eq!(config.autosave_interval, Some(Duration::from_secs(30)));
        assert_eq!(config.ship_data, "https://example.com/ships.json");
        assert_eq!(config.channel_buffer, 1000);
        assert!(config.replay);
        assert!(config.demo);
    }

    #[test]
    fn test_backend_flag() {
        assert_eq!(parse_backend_from_args(&args(&["x", "--backend", "sqlite"])), BackendType::Sqlite);
        assert_eq!(parse_backend_from_args(&args(&["x", "--backend", "file"])), BackendType::File);
        assert_eq!(parse_backend_from_args(&args(&["x", "--backend"])), BackendType::File);
        assert_eq!(parse_backend_from_args(&args(&["x"])), BackendType::File);
    }
}
