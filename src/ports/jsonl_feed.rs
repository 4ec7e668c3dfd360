use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;

use crate::types::VenueEvent;

/// Parses one line of a recorded event stream. Blank lines yield `None`.
pub fn parse_event_line(line: &str, line_no: usize) -> Result<Option<VenueEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| anyhow!("line {}: failed to parse event '{}': {}", line_no, trimmed, e))
}

/// Streams venue events, one JSON object per line, into the engine queue.
pub struct JsonlEventFeed<R> {
    reader: R,
    source: String,
}

impl JsonlEventFeed<BufReader<File>> {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .await
            .with_context(|| format!("failed to open event file {}", path.display()))?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl<R: AsyncBufRead + Unpin> JsonlEventFeed<R> {
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader,
            source: source.into(),
        }
    }

    /// Forwards every parseable event in file order and returns how many were
    /// sent. Malformed lines are logged and skipped.
    pub async fn forward(self, tx: UnboundedSender<VenueEvent>) -> Result<u64> {
        let mut lines = self.reader.lines();
        let mut line_no = 0usize;
        let mut sent = 0u64;
        while let Some(line) = lines
            .next_line()
            .await
            .with_context(|| format!("failed to read {}", self.source))?
        {
            line_no += 1;
            match parse_event_line(&line, line_no) {
                Ok(Some(event)) => {
                    if tx.send(event).is_err() {
                        log::warn!("[FEED] engine queue closed at {}:{}", self.source, line_no);
                        break;
                    }
                    sent += 1;
                }
                Ok(None) => {}
                Err(e) => log::error!("[FEED] {}: {:?}", self.source, e),
            }
        }
        log::info!("[FEED] {} finished after {} events", self.source, sent);
        Ok(sent)
    }
}
