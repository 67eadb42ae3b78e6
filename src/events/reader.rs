//! Asynchronous JSONL event feed with file rotation detection

use super::types::InboundEvent;
use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::sleep;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

/// A source of named transport events
#[async_trait]
pub trait EventSource: Send {
    /// Next event, or `None` when the source is exhausted
    async fn next_event(&mut self) -> std::io::Result<Option<InboundEvent>>;

    /// Source description for logging
    fn describe(&self) -> String;
}

/// Tails a JSONL file where every line is `{"event": "...", "data": {...}}`
pub struct JsonlFeed {
    path: PathBuf,
    file: Option<BufReader<File>>,
    inode: Option<u64>,
    poll_interval: Duration,
    from_start: bool,
    /// Bytes of a line whose newline has not been written yet
    pending: String,
}

impl JsonlFeed {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: None,
            inode: None,
            poll_interval: Duration::from_millis(100),
            from_start: false,
            pending: String::new(),
        }
    }

    /// Read lines already in the file instead of only new ones
    pub fn from_start(mut self) -> Self {
        self.from_start = true;
        self
    }

    /// Open the file. Seeks to the end unless `from_start` was requested.
    pub async fn start(&mut self) -> std::io::Result<()> {
        self.open(!self.from_start).await?;
        log::info!("📖 Started reading events: {}", self.path.display());
        Ok(())
    }

    async fn open(&mut self, seek_to_end: bool) -> std::io::Result<()> {
        let file = File::open(&self.path).await?;
        let metadata = file.metadata().await?;

        #[cfg(unix)]
        {
            self.inode = Some(metadata.ino());
        }
        #[cfg(not(unix))]
        let _ = metadata;

        let mut reader = BufReader::new(file);
        if seek_to_end {
            reader.seek(SeekFrom::End(0)).await?;
        }
        self.file = Some(reader);
        self.pending.clear();
        Ok(())
    }

    /// Read the next complete, non-empty line, waiting if necessary.
    ///
    /// A line is only returned once its newline is on disk; a writer caught
    /// mid-flush leaves the partial bytes buffered until the rest arrives.
    pub async fn read_line(&mut self) -> std::io::Result<String> {
        loop {
            if self.detect_rotation().await? {
                log::info!("🔄 Feed rotation detected, reopening: {}", self.path.display());
                // A rotated file is new content: read it from the top
                self.open(false).await?;
            }

            let Some(ref mut reader) = self.file else {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Feed not opened",
                ));
            };

            let read = reader.read_line(&mut self.pending).await?;
            if read == 0 || !self.pending.ends_with('\n') {
                sleep(self.poll_interval).await;
                continue;
            }

            let line = std::mem::take(&mut self.pending);
            if !line.trim().is_empty() {
                return Ok(line.trim().to_string());
            }
        }
    }

    /// True once a different file sits at the path. A missing path is a rotation
    /// still in progress, so the current handle is kept until the new file appears.
    async fn detect_rotation(&self) -> std::io::Result<bool> {
        #[cfg(unix)]
        {
            let metadata = match tokio::fs::metadata(&self.path).await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
                Err(e) => return Err(e),
            };
            Ok(self.inode.map_or(false, |old| old != metadata.ino()))
        }

        #[cfg(not(unix))]
        {
            Ok(false)
        }
    }
}

#[async_trait]
impl EventSource for JsonlFeed {
    async fn next_event(&mut self) -> std::io::Result<Option<InboundEvent>> {
        loop {
            let line = self.read_line().await?;
            match InboundEvent::from_jsonl(&line) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => log::warn!("Skipping malformed feed line: {}", e),
            }
        }
    }

    fn describe(&self) -> String {
        format!("jsonl:{}", self.path.display())
    }
}

/// Pump events from a source into the tracker channel until either side closes
pub async fn forward_events<S, F, M>(mut source: S, tx: mpsc::Sender<M>, wrap: F)
where
    S: EventSource,
    F: Fn(InboundEvent) -> M + Send,
    M: Send,
{
    log::info!("Forwarding events from {}", source.describe());

    loop {
        let next = tokio::select! {
            _ = tx.closed() => break, // Tracker stopped
            next = source.next_event() => next,
        };

        match next {
            Ok(Some(event)) => {
                if tx.send(wrap(event)).await.is_err() {
                    break; // Tracker stopped
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::error!("Event source {} failed: {}", source.describe(), e);
                break;
            }
        }
    }

    log::info!("Event forwarding from {} stopped", source.describe());
}
