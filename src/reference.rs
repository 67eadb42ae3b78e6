//! Ship reference data
//!
//! Maps numeric ship ids (as carried by test events) to display names and image
//! files. The catalog is loaded once, asynchronously, from a local JSON file or an
//! HTTP URL. Lookups made before the load completes return an `Unknown: <id>`
//! placeholder instead of waiting.
//!
//! Also hosts the display-name → image-file table used by the ship card grid.

use crate::error::{TrackerError, TrackerResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Directory the dashboard serves ship images from
pub const IMAGE_DIR: &str = "static/images";

/// One entry of the ship data file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShipRecord {
    pub id: u64,
    pub name: String,
    pub image_filename: String,
}

/// Shared, load-once ship catalog. Clones share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct ShipCatalog {
    ships: Arc<OnceCell<HashMap<u64, ShipRecord>>>,
}

impl ShipCatalog {
    /// Create an empty catalog (all lookups return the `Unknown` placeholder)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog that is already loaded
    pub fn from_records(records: Vec<ShipRecord>) -> Self {
        let catalog = Self::new();
        catalog.install(records);
        catalog
    }

    pub fn is_loaded(&self) -> bool {
        self.ships.initialized()
    }

    /// Install the reference data. Only the first install takes effect.
    pub fn install(&self, records: Vec<ShipRecord>) -> bool {
        let ships = records.into_iter().map(|r| (r.id, r)).collect();
        self.ships.set(ships).is_ok()
    }

    /// Display name for a ship id
    pub fn ship_name(&self, id: u64) -> String {
        match self.ships.get() {
            None => format!("Unknown: {}", id),
            Some(ships) => ships
                .get(&id)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| format!("Not Found: {}", id)),
        }
    }

    /// Fetch and install the catalog from a path or `http(s)://` URL
    pub async fn load(&self, source: &str) -> TrackerResult<usize> {
        let json = fetch_ship_data(source).await?;
        let records = parse_ship_data(&json)?;
        let count = records.len();

        if !self.install(records) {
            log::warn!("Ship catalog already loaded, ignoring {}", source);
        } else {
            log::info!("Loaded {} ships from {}", count, source);
        }
        Ok(count)
    }
}

/// Read the raw ship data document
pub async fn fetch_ship_data(source: &str) -> TrackerResult<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let response = client.get(source).send().await?;
        if !response.status().is_success() {
            return Err(TrackerError::Http(format!(
                "ship data request failed: {}",
                response.status()
            )));
        }
        Ok(response.text().await?)
    } else {
        Ok(tokio::fs::read_to_string(source).await?)
    }
}

/// Parse ship data: an object (or array) whose values are ship records.
/// Entries that do not look like ship records are skipped.
pub fn parse_ship_data(json: &str) -> TrackerResult<Vec<ShipRecord>> {
    let document: serde_json::Value = serde_json::from_str(json)?;

    let entries: Vec<serde_json::Value> = match document {
        serde_json::Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        serde_json::Value::Array(items) => items,
        _ => Vec::new(),
    };

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<ShipRecord>(entry) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("Skipping malformed ship record: {}", e),
        }
    }
    Ok(records)
}

/// Ship display names with a hand-made image file
const SHIP_IMAGE_FILES: &[(&str, &str)] = &[
    ("Anaconda", "anaconda"),
    ("Federal Corvette", "federal-corvette"),
    ("Imperial Cutter", "imperial-cutter"),
    ("Python", "python"),
    ("Fer-de-Lance", "fer-de-lance"),
    ("Krait MkII", "krait-mkii"),
    ("Krait Phantom", "krait-phantom"),
    ("Type-9 Heavy", "type-9-heavy"),
    ("Type-10 Defender", "type-10-defender"),
    ("Alliance Chieftain", "alliance-chieftain"),
    ("Cobra MkIII", "cobra-mkiii"),
    ("Asp Explorer", "asp-explorer"),
    ("Vulture", "vulture"),
    ("Eagle", "eagle"),
    ("Viper MkIII", "viper-mkiii"),
    ("Viper MkIv", "viper-mkiv"),
    ("Sidewinder", "sidewinder"),
    ("Imperial Eagle", "imperial-eagle"),
    ("Federal Gunship", "federal-gunship"),
    ("Federal Assault Ship", "federal-assault-ship"),
    ("Federal Dropship", "federal-dropship"),
    ("Diamondback Explorer", "diamondback-explorer"),
    ("Diamondback Scout", "diamondback-scout"),
    ("Mamba", "mamba"),
    ("Mandalay", "mandalay"),
    ("Type-8 Transporter", "type-8-transporter"),
    ("Python MkII", "python-mkii"),
    ("Adder", "adder"),
    ("Orca", "orca"),
    ("Beluga Liner", "beluga-liner"),
    ("Commando", "commando"),
];

/// Image file stem for a ship display name
pub fn ship_image_file(ship_name: &str) -> String {
    let name = ship_name.trim();

    if let Some((_, file)) = SHIP_IMAGE_FILES.iter().find(|(n, _)| *n == name) {
        return file.to_string();
    }

    name.to_lowercase()
        .replace([' ', '_'], "-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect()
}

/// Full image path for a ship display name
pub fn ship_image_path(ship_name: &str) -> String {
    format!("{}/{}.png", IMAGE_DIR, ship_image_file(ship_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<ShipRecord> {
        vec![
            ShipRecord { id: 128049309, name: "Vulture".to_string(), image_filename: "vulture.png".to_string() },
            ShipRecord { id: 128049363, name: "Anaconda".to_string(), image_filename: "anaconda.png".to_string() },
        ]
    }

    #[test]
    fn test_lookup_before_load_is_unknown() {
        let catalog = ShipCatalog::new();
        assert!(!catalog.is_loaded());
        assert_eq!(catalog.ship_name(7), "Unknown: 7");
    }

    #[test]
    fn test_lookup_after_load() {
        let catalog = ShipCatalog::from_records(sample_records());
        assert_eq!(catalog.ship_name(128049309), "Vulture");
        assert_eq!(catalog.ship_name(1), "Not Found: 1");
        assert_eq!(catalog.ship_name(128049363), "Anaconda");
    }

    #[test]
    fn test_clones_share_loaded_state() {
        let catalog = ShipCatalog::new();
        let handle = catalog.clone();
        assert!(catalog.install(sample_records()));
        assert!(!catalog.install(Vec::new()));
        assert_eq!(handle.ship_name(128049309), "Vulture");
    }

    #[test]
    fn test_parse_ship_data_object() {
        let json = r#"{
            "vulture": {"id": 128049309, "name": "Vulture", "image_filename": "vulture.png"},
            "broken": {"name": "No id"}
        }"#;
        let records = parse_ship_data(json).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Vulture");
    }

    #[test]
    fn test_parse_ship_data_rejects_bad_json() {
        assert!(parse_ship_data("{not json").is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ship_data.json");
        std::fs::write(
            &path,
            r#"{"eagle": {"id": 128049255, "name": "Eagle", "image_filename": "eagle.png"}}"#,
        )
        .unwrap();

        let catalog = ShipCatalog::new();
        let count = catalog.load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(catalog.ship_name(128049255), "Eagle");
    }

    #[test]
    fn test_image_file_mapping_and_fallback() {
        assert_eq!(ship_image_file("Krait MkII"), "krait-mkii");
        assert_eq!(ship_image_file(" Vulture "), "vulture");
        assert_eq!(ship_image_file("Cobra Mk_V (Test)"), "cobra-mk-v-test");
        assert_eq!(ship_image_path("Python"), "static/images/python.png");
    }
}
