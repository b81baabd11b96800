//! NDJSON line feed - file replay and stdin

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tracing::{debug, info, warn};

use contracts::{FeedConfig, FeedSourceKind};

use crate::error::{FeedError, Result};
use crate::source::{FeedEvent, FeedSource};

/// Newline-delimited JSON over any buffered reader
///
/// Emits `Connected` first, then one `Payload` per non-blank line.
/// Lines that are not valid UTF-8 or not valid JSON are logged and skipped.
pub struct LineFeed<R> {
    label: String,
    reader: R,
    buf: Vec<u8>,
    interval: Option<Duration>,
    connected: bool,
    line_no: u64,
    emitted: u64,
}

impl<R: AsyncBufRead + Unpin + Send> LineFeed<R> {
    /// Wrap a reader; `label` names it in logs
    pub fn new(reader: R, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            reader,
            buf: Vec::new(),
            interval: None,
            connected: false,
            line_no: 0,
            emitted: 0,
        }
    }

    /// Wait `interval` between payloads (zero disables)
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Payloads emitted so far
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl LineFeed<BufReader<File>> {
    /// Replay an NDJSON file
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await.map_err(|source| FeedError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Replaying feed file");
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl LineFeed<BufReader<Stdin>> {
    /// Read NDJSON from standard input
    pub fn stdin() -> Self {
        info!("Reading feed from stdin");
        Self::new(BufReader::new(tokio::io::stdin()), "stdin")
    }
}

impl<R: AsyncBufRead + Unpin + Send> FeedSource for LineFeed<R> {
    async fn next_event(&mut self) -> Result<Option<FeedEvent>> {
        if !self.connected {
            self.connected = true;
            return Ok(Some(FeedEvent::Connected));
        }

        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
                break;
            }
            self.line_no += 1;
            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!(feed = %self.label, line = self.line_no, error = %e, "Skipping non UTF-8 line");
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            let payload: Value = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(e) => {
                    warn!(feed = %self.label, line = self.line_no, error = %e, "Skipping invalid JSON line");
                    continue;
                }
            };

            if self.emitted > 0 {
                if let Some(interval) = self.interval {
                    tokio::time::sleep(interval).await;
                }
            }
            self.emitted += 1;
            return Ok(Some(FeedEvent::Payload(payload)));
        }

        debug!(feed = %self.label, lines = self.line_no, "Feed exhausted");
        Ok(None)
    }
}

/// A line feed chosen by configuration
pub enum ConfiguredFeed {
    /// NDJSON file replay
    Replay(LineFeed<BufReader<File>>),
    /// NDJSON on stdin
    Stdin(LineFeed<BufReader<Stdin>>),
}

impl ConfiguredFeed {
    /// Open the source described by `config`
    pub async fn open(config: &FeedConfig) -> Result<Self> {
        let interval = Duration::from_millis(config.interval_ms);
        match (config.source, config.path.as_deref()) {
            (FeedSourceKind::Replay, Some(path)) => Ok(Self::Replay(
                LineFeed::open(path).await?.with_interval(interval),
            )),
            (FeedSourceKind::Replay, None) => Err(FeedError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "replay source requires a path",
            ))),
            (FeedSourceKind::Stdin, _) => Ok(Self::Stdin(LineFeed::stdin().with_interval(interval))),
        }
    }
}

impl FeedSource for ConfiguredFeed {
    async fn next_event(&mut self) -> Result<Option<FeedEvent>> {
        match self {
            Self::Replay(feed) => feed.next_event().await,
            Self::Stdin(feed) => feed.next_event().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    async fn drain<S: FeedSource>(source: &mut S) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        while let Some(event) = source.next_event().await.unwrap() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_lines_become_payloads() {
        let data: &[u8] = b"{\"id\": 1}\n\n   \nnot json\n{\"id\": 2}\n";
        let mut feed = LineFeed::new(data, "test");

        let events = drain(&mut feed).await;
        assert_eq!(
            events,
            vec![
                FeedEvent::Connected,
                FeedEvent::Payload(json!({"id": 1})),
                FeedEvent::Payload(json!({"id": 2})),
            ]
        );
        assert_eq!(feed.emitted(), 2);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let data: &[u8] = b"{\"id\": 1}\n\xff\xfe garbage\n{\"id\": 2}";
        let mut feed = LineFeed::new(data, "test");

        let events = drain(&mut feed).await;
        assert_eq!(
            events,
            vec![
                FeedEvent::Connected,
                FeedEvent::Payload(json!({"id": 1})),
                FeedEvent::Payload(json!({"id": 2})),
            ]
        );
        assert_eq!(feed.line_no, 3);
    }

    #[tokio::test]
    async fn test_replay_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"id\": 10, \"text\": \"a\"}}").unwrap();
        writeln!(file, "{{\"limit\": {{\"track\": 3}}}}").unwrap();

        let config = FeedConfig {
            source: FeedSourceKind::Replay,
            path: Some(file.path().to_path_buf()),
            interval_ms: 1,
        };
        let mut feed = ConfiguredFeed::open(&config).await.unwrap();
        let events = drain(&mut feed).await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[2], FeedEvent::Payload(json!({"limit": {"track": 3}})));
    }

    #[tokio::test]
    async fn test_missing_file_is_open_error() {
        let err = LineFeed::open(Path::new("/definitely/not/here.ndjson"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, FeedError::Open { .. }));
    }
}
