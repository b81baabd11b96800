//! WriterProcessor - persists statuses as JSON files

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use contracts::{Status, TextEncoding, WorkerConfig, WorkerKind};

use crate::encoding::{decode_text, encode_text, to_ascii_json};
use crate::error::DispatcherError;
use crate::filters::is_retweet;
use crate::format::format_filename;
use crate::processor::{ProcessContext, StatusProcessor};

/// Default file name template: one file per status id
pub const DEFAULT_STATUS_FORMAT: &str = "status_{id}.json";

/// Writes each admitted status to `dirname/<format>`
#[derive(Debug, Clone)]
pub struct WriterProcessor {
    dirname: PathBuf,
    format: String,
    encoding: TextEncoding,
}

impl WriterProcessor {
    /// Create a writer with the default template and encoding
    pub fn new(dirname: impl Into<PathBuf>) -> Self {
        Self {
            dirname: dirname.into(),
            format: DEFAULT_STATUS_FORMAT.to_string(),
            encoding: TextEncoding::default(),
        }
    }

    /// Create from a pool configuration
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            dirname: config.dirname.clone(),
            format: config.format_or_default().to_string(),
            encoding: config.encoding,
        }
    }

    /// Set the file name template
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Set the output encoding
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Output directory
    pub fn dirname(&self) -> &Path {
        &self.dirname
    }

    /// Write the status field mapping to `path`, creating its directory if needed
    pub fn write_status(
        status: &Status,
        path: &Path,
        encoding: TextEncoding,
    ) -> Result<PathBuf, DispatcherError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = to_ascii_json(&status.as_dict())?;
        fs::write(path, encode_text(&json, encoding))?;
        debug!(path = %path.display(), "Wrote status file");
        Ok(path.to_path_buf())
    }
}

/// Read a file produced by [`WriterProcessor::write_status`] back into a field mapping
pub fn read_status_file(
    path: &Path,
    encoding: TextEncoding,
) -> Result<Map<String, Value>, DispatcherError> {
    let text = decode_text(&fs::read(path)?, encoding)?;
    Ok(serde_json::from_str(&text)?)
}

impl StatusProcessor for WriterProcessor {
    type Output = Option<PathBuf>;

    fn kind(&self) -> WorkerKind {
        WorkerKind::Writer
    }

    /// Retweets of other statuses are not persisted
    fn default_filter(status: &Status) -> bool {
        !is_retweet(status)
    }

    #[instrument(
        name = "writer_process",
        skip(self, status, ctx),
        fields(worker = ctx.worker, status_id = status.id)
    )]
    async fn process(
        &mut self,
        status: &Status,
        ctx: &ProcessContext<'_>,
    ) -> Result<Self::Output, DispatcherError> {
        if !ctx.validate(status) {
            info!(status_id = status.id, "Status failed writer filter criteria");
            return Ok(None);
        }

        let path = format_filename(status, &self.format, Some(&self.dirname))?;
        if ctx.dry_run {
            info!(status_id = status.id, path = %path.display(), "[DRY RUN] Wrote status");
            return Ok(None);
        }

        let path = Self::write_status(status, &path, self.encoding)?;
        info!(status_id = status.id, path = %path.display(), "Wrote status");
        Ok(Some(path))
    }
}
