//! MirrorProcessor - re-posts statuses through the remote API

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument};

use contracts::{MediaFetcher, Status, StatusApi, WorkerConfig, WorkerKind};

use crate::error::DispatcherError;
use crate::filters::{has_mentions, is_reply};
use crate::format::remove_urls;
use crate::processor::{ProcessContext, StatusProcessor};
use crate::processors::download_media;

/// Post a copy of `status`: its display text without short links, plus its
/// media staged under `temp_dir`.
///
/// Remote errors (rate limit, rejection) are returned to the caller; nothing
/// is retried here.
pub async fn mirror<A, F>(
    api: &A,
    status: &Status,
    temp_dir: &Path,
    fetcher: &F,
) -> Result<Status, DispatcherError>
where
    A: StatusApi + Sync,
    F: MediaFetcher + Sync,
{
    let text = remove_urls(status.display_text());
    let media = download_media(fetcher, status, temp_dir).await?;
    Ok(api.post(&text, &media).await?)
}

/// Mirrors each admitted status to the account behind `api`
pub struct MirrorProcessor<A, F> {
    api: Arc<A>,
    fetcher: Arc<F>,
    temp_dir: PathBuf,
}

impl<A, F> MirrorProcessor<A, F> {
    /// Create a mirror staging media in `temp_dir`
    pub fn new(api: Arc<A>, fetcher: Arc<F>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            fetcher,
            temp_dir: temp_dir.into(),
        }
    }

    /// Create from a pool configuration
    pub fn from_config(api: Arc<A>, fetcher: Arc<F>, config: &WorkerConfig) -> Self {
        Self::new(api, fetcher, config.temp_dir_or_default())
    }
}

impl<A, F> Clone for MirrorProcessor<A, F> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            fetcher: Arc::clone(&self.fetcher),
            temp_dir: self.temp_dir.clone(),
        }
    }
}

impl<A, F> StatusProcessor for MirrorProcessor<A, F>
where
    A: StatusApi + Sync + 'static,
    F: MediaFetcher + Sync + 'static,
{
    type Output = Option<Status>;

    fn kind(&self) -> WorkerKind {
        WorkerKind::Mirror
    }

    /// Only original, standalone statuses are mirrored
    fn default_filter(status: &Status) -> bool {
        !(is_reply(status) || has_mentions(status) || status.is_reshare())
    }

    #[instrument(
        name = "mirror_process",
        skip(self, status, ctx),
        fields(worker = ctx.worker, status_id = status.id)
    )]
    async fn process(
        &mut self,
        status: &Status,
        ctx: &ProcessContext<'_>,
    ) -> Result<Self::Output, DispatcherError> {
        if !ctx.validate(status) {
            info!(status_id = status.id, "Status failed mirror filter criteria");
            return Ok(None);
        }

        if ctx.dry_run {
            info!(status_id = status.id, "[DRY RUN] Mirroring status");
            return Ok(None);
        }

        info!(status_id = status.id, "Mirroring status");
        let posted = mirror(
            self.api.as_ref(),
            status,
            &self.temp_dir,
            self.fetcher.as_ref(),
        )
        .await?;
        info!(status_id = status.id, mirrored_id = posted.id, "Mirrored status");
        Ok(Some(posted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::default_filter_of;
    use bytes::Bytes;
    use contracts::{ContractError, Media, UserMention, RATE_LIMIT_CODE};
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingApi {
        posts: Mutex<Vec<(String, Vec<PathBuf>)>>,
        reject_with: Option<u16>,
    }

    impl StatusApi for RecordingApi {
        async fn post(&self, text: &str, media: &[PathBuf]) -> Result<Status, ContractError> {
            if let Some(code) = self.reject_with {
                return Err(ContractError::remote_api(code, "rejected"));
            }
            let mut posts = self.posts.lock().unwrap();
            posts.push((text.to_string(), media.to_vec()));
            Ok(Status {
                id: 1000 + posts.len() as u64,
                text: Some(text.to_string()),
                ..Default::default()
            })
        }
    }

    struct StaticFetcher;

    impl MediaFetcher for StaticFetcher {
        async fn get(&self, _url: &str) -> Result<Bytes, ContractError> {
            Ok(Bytes::from_static(b"\x89PNG"))
        }
    }

    fn original(text: &str) -> Status {
        Status {
            id: 5,
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    type TestMirror = MirrorProcessor<RecordingApi, StaticFetcher>;

    #[tokio::test]
    async fn test_mirror_cleans_text() {
        let dir = tempdir().unwrap();
        let api = RecordingApi::default();
        let status = original("tweet text https://t.co/Ax0SeF.jpg #hashtag");

        let posted = mirror(&api, &status, dir.path(), &StaticFetcher).await.unwrap();
        assert_eq!(posted.text.as_deref(), Some("tweet text #hashtag"));
        let posts = api.posts.lock().unwrap();
        assert_eq!(posts[0], ("tweet text #hashtag".to_string(), vec![]));
    }

    #[tokio::test]
    async fn test_mirror_prefers_long_body_and_stages_media() {
        let dir = tempdir().unwrap();
        let api = RecordingApi::default();
        let mut status = original("short https://t.co/x");
        status.full_text = Some("the long body https://t.co/abc".into());
        status.media.push(Media {
            media_url_https: "https://host.com/pic.png".into(),
            ..Default::default()
        });

        mirror(&api, &status, dir.path(), &StaticFetcher).await.unwrap();
        let posts = api.posts.lock().unwrap();
        assert_eq!(posts[0].0, "the long body ");
        assert_eq!(posts[0].1, vec![dir.path().join("pic.png")]);
        assert!(dir.path().join("pic.png").exists());
    }

    #[tokio::test]
    async fn test_rate_limit_propagates() {
        let dir = tempdir().unwrap();
        let api = RecordingApi {
            reject_with: Some(RATE_LIMIT_CODE),
            ..Default::default()
        };
        let err = mirror(&api, &original("hi"), dir.path(), &StaticFetcher)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatcherError::Contract(ContractError::RateLimited { .. })
        ));
    }

    #[test]
    fn test_default_filter() {
        let plain = original("hello");
        assert!(TestMirror::default_filter(&plain));

        let mut mentioned = original("hi @someone");
        mentioned.user_mentions.push(UserMention::default());
        assert!(!TestMirror::default_filter(&mentioned));

        let mut reply = original("hello");
        reply.in_reply_to_user_id = Some(3);
        assert!(!TestMirror::default_filter(&reply));

        let mut reshare = original("RT hello");
        reshare.retweeted = true;
        assert!(!TestMirror::default_filter(&reshare));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_post() {
        let dir = tempdir().unwrap();
        let api = Arc::new(RecordingApi::default());
        let mut processor = MirrorProcessor::new(Arc::clone(&api), Arc::new(StaticFetcher), dir.path());
        let filters = vec![default_filter_of::<TestMirror>()];
        let ctx = ProcessContext {
            worker: "MT-0",
            dry_run: true,
            filters: &filters,
        };

        assert!(processor.process(&original("hello"), &ctx).await.unwrap().is_none());
        assert!(api.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_process_posts_valid_status() {
        let dir = tempdir().unwrap();
        let api = Arc::new(RecordingApi::default());
        let mut processor = MirrorProcessor::new(Arc::clone(&api), Arc::new(StaticFetcher), dir.path());
        let filters = vec![default_filter_of::<TestMirror>()];
        let ctx = ProcessContext {
            worker: "MT-0",
            dry_run: false,
            filters: &filters,
        };

        let posted = processor.process(&original("hello"), &ctx).await.unwrap();
        assert_eq!(posted.map(|s| s.id), Some(1001));
    }
}
