//! Error type shared by the I/O seams of the tracker (feed, blob stores, ship catalog, UI)

#[derive(Debug)]
pub enum TrackerError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Database(String),
    Http(String),
    /// A render target the dashboard expects is not available
    MissingTarget(&'static str),
}

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        TrackerError::Io(err)
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Serialization(err)
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        TrackerError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        TrackerError::Http(err.to_string())
    }
}

impl std::fmt::Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerError::Io(e) => write!(f, "IO error: {}", e),
            TrackerError::Serialization(e) => write!(f, "Serialization error: {}", e),
            TrackerError::Database(e) => write!(f, "Database error: {}", e),
            TrackerError::Http(e) => write!(f, "HTTP error: {}", e),
            TrackerError::MissingTarget(target) => write!(f, "Render target not found: {}", target),
        }
    }
}

impl std::error::Error for TrackerError {}

pub type TrackerResult<T> = Result<T, TrackerError>;
