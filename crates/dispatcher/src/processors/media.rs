//! MediaDownloadProcessor - stores attached media on disk

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use contracts::{MediaFetcher, Status, WorkerConfig, WorkerKind};

use crate::error::DispatcherError;
use crate::format::{format_filename, url_to_file};
use crate::processor::{ProcessContext, StatusProcessor};
use crate::processors::WriterProcessor;

/// Default per-status subdirectory template
pub const DEFAULT_MEDIA_FORMAT: &str = "media_{id}";

/// Fetch every attached media item of `status` into `dirname`.
///
/// Returns the written paths in attachment order. A status without media
/// returns an empty list and leaves the filesystem untouched. Fetch errors
/// are returned as is, without retry.
pub async fn download_media<F>(
    fetcher: &F,
    status: &Status,
    dirname: &Path,
) -> Result<Vec<PathBuf>, DispatcherError>
where
    F: MediaFetcher + Sync,
{
    if status.media.is_empty() {
        debug!(status_id = status.id, "Status had no media, skipping download");
        return Ok(Vec::new());
    }

    if !dirname.as_os_str().is_empty() {
        tokio::fs::create_dir_all(dirname).await?;
    }

    let mut written = Vec::with_capacity(status.media.len());
    for (idx, media) in status.media.iter().enumerate() {
        let url = media.media_url_https.as_str();
        debug!(item = idx + 1, url, "Downloading media item");
        let body = fetcher.get(url).await?;

        let path = url_to_file(url, dirname);
        tokio::fs::write(&path, &body).await?;
        debug!(path = %path.display(), bytes = body.len(), "Wrote media file");
        written.push(path);
    }
    Ok(written)
}

/// Downloads the media of each admitted status into its own subdirectory
pub struct MediaDownloadProcessor<F> {
    fetcher: Arc<F>,
    dirname: PathBuf,
    format: String,
}

impl<F> MediaDownloadProcessor<F> {
    /// Create a downloader with the default subdirectory template
    pub fn new(fetcher: Arc<F>, dirname: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            dirname: dirname.into(),
            format: DEFAULT_MEDIA_FORMAT.to_string(),
        }
    }

    /// Create from a pool configuration
    pub fn from_config(fetcher: Arc<F>, config: &WorkerConfig) -> Self {
        Self {
            fetcher,
            dirname: config.dirname.clone(),
            format: config.format_or_default().to_string(),
        }
    }

    /// Set the subdirectory template
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

impl<F> Clone for MediaDownloadProcessor<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            dirname: self.dirname.clone(),
            format: self.format.clone(),
        }
    }
}

impl<F> StatusProcessor for MediaDownloadProcessor<F>
where
    F: MediaFetcher + Sync + 'static,
{
    type Output = Vec<PathBuf>;

    fn kind(&self) -> WorkerKind {
        WorkerKind::MediaDownloader
    }

    /// Same policy as the writer
    fn default_filter(status: &Status) -> bool {
        WriterProcessor::default_filter(status)
    }

    #[instrument(
        name = "media_process",
        skip(self, status, ctx),
        fields(worker = ctx.worker, status_id = status.id)
    )]
    async fn process(
        &mut self,
        status: &Status,
        ctx: &ProcessContext<'_>,
    ) -> Result<Self::Output, DispatcherError> {
        if !ctx.validate(status) {
            info!(status_id = status.id, "Status failed media filter criteria");
            return Ok(Vec::new());
        }

        let status_dir = format_filename(status, &self.format, Some(&self.dirname))?;
        let urls = status.media_urls();

        if ctx.dry_run {
            let files: Vec<PathBuf> = urls.iter().map(|url| url_to_file(url, &status_dir)).collect();
            info!(?urls, ?files, "[DRY RUN] Downloading media");
            return Ok(files);
        }

        info!(?urls, "Downloading media");
        let files = download_media(self.fetcher.as_ref(), status, &status_dir).await?;
        info!(?files, "Downloaded media");
        Ok(files)
    }
}
