//! Upload finalization and duration enrichment.
//!
//! Finalization is advisory: the completion marker and the duration backfill
//! both fail soft. The provider analyzes media asynchronously, so the
//! enrichment attempt waits a fixed delay before asking for the duration;
//! if it is still absent the field stays unset until the next publish.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::database::repositories::VideoRepository;
use crate::provider::MediaInfoClient;

/// Delay before the post-upload enrichment attempt.
pub const ENRICHMENT_DELAY: Duration = Duration::from_secs(5);

/// Finalizes completed uploads.
pub struct UploadFinalizer {
    video_repo: Arc<dyn VideoRepository>,
    media_info: Arc<dyn MediaInfoClient>,
    enrichment_delay: Duration,
    cancellation_token: CancellationToken,
}

impl UploadFinalizer {
    pub fn new(
        video_repo: Arc<dyn VideoRepository>,
        media_info: Arc<dyn MediaInfoClient>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self::with_delay(video_repo, media_info, ENRICHMENT_DELAY, cancellation_token)
    }

    pub fn with_delay(
        video_repo: Arc<dyn VideoRepository>,
        media_info: Arc<dyn MediaInfoClient>,
        enrichment_delay: Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            video_repo,
            media_info,
            enrichment_delay,
            cancellation_token,
        }
    }

    /// Record completion and schedule the delayed enrichment attempt.
    /// Neither step can fail the upload: the bytes are already with the
    /// provider.
    pub async fn finalize(self: &Arc<Self>, video_id: &str, media_id: &str) -> JoinHandle<()> {
        if let Err(e) = self.video_repo.mark_upload_complete(video_id).await {
            warn!(video_id, "upload-complete marker failed: {}", e);
        }

        let finalizer = Arc::clone(self);
        let video_id = video_id.to_string();
        let media_id = media_id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = finalizer.cancellation_token.cancelled() => return,
                _ = tokio::time::sleep(finalizer.enrichment_delay) => {}
            }

            match finalizer.enrich(&video_id, &media_id).await {
                Ok(Some(duration)) => {
                    info!(video_id, duration, "duration backfilled");
                }
                Ok(None) => {
                    debug!(video_id, "duration not yet available");
                }
                Err(e) => {
                    warn!(video_id, "enrichment attempt failed: {}", e);
                }
            }
        })
    }

    /// Synchronous enrichment attempt, used at publish time when the stored
    /// duration is missing or invalid. Returns the backfilled duration.
    pub async fn enrich_now(&self, video_id: &str, media_id: &str) -> Result<Option<f64>> {
        self.enrich(video_id, media_id).await
    }

    async fn enrich(&self, video_id: &str, media_id: &str) -> Result<Option<f64>> {
        let info = self.media_info.get_media_info(media_id).await?;
        match info.duration_secs {
            Some(duration) if duration.is_finite() && duration > 0.0 => {
                self.video_repo.set_duration(video_id, duration).await?;
                Ok(Some(duration))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::Error;
    use crate::database::models::VideoDbModel;
    use crate::provider::MediaInfo;

    #[derive(Default)]
    struct SpyVideoRepo {
        fail_marker: bool,
        completed: Mutex<Vec<String>>,
        durations: Mutex<Vec<(String, f64)>>,
    }

    #[async_trait]
    impl VideoRepository for SpyVideoRepo {
        async fn get(&self, id: &str) -> Result<VideoDbModel> {
            Err(Error::not_found("Video", id))
        }

        async fn create(&self, _video: &VideoDbModel) -> Result<()> {
            Ok(())
        }

        async fn list_recent(&self, _limit: u32) -> Result<Vec<VideoDbModel>> {
            Ok(vec![])
        }

        async fn set_published(&self, _id: &str, _published: bool) -> Result<()> {
            Ok(())
        }

        async fn set_media_id(&self, _id: &str, _media_id: &str) -> Result<()> {
            Ok(())
        }

        async fn set_duration(&self, id: &str, duration_secs: f64) -> Result<()> {
            self.durations.lock().push((id.to_string(), duration_secs));
            Ok(())
        }

        async fn mark_upload_complete(&self, id: &str) -> Result<()> {
            if self.fail_marker {
                return Err(Error::Database("disk full".to_string()));
            }
            self.completed.lock().push(id.to_string());
            Ok(())
        }
    }

    struct StubMediaInfo {
        duration: Option<f64>,
        fail: bool,
    }

    #[async_trait]
    impl MediaInfoClient for StubMediaInfo {
        async fn get_media_info(&self, _media_id: &str) -> Result<MediaInfo> {
            if self.fail {
                return Err(Error::transport("info endpoint down"));
            }
            Ok(MediaInfo {
                duration_secs: self.duration,
            })
        }
    }

    fn finalizer(
        repo: Arc<SpyVideoRepo>,
        info: StubMediaInfo,
    ) -> Arc<UploadFinalizer> {
        Arc::new(UploadFinalizer::with_delay(
            repo,
            Arc::new(info),
            Duration::from_millis(1),
            CancellationToken::new(),
        ))
    }

    #[tokio::test]
    async fn test_finalize_backfills_duration_after_delay() {
        let repo = Arc::new(SpyVideoRepo::default());
        let f = finalizer(
            repo.clone(),
            StubMediaInfo {
                duration: Some(42.5),
                fail: false,
            },
        );

        let handle = f.finalize("v-1", "med-1").await;
        handle.await.unwrap();

        assert_eq!(*repo.completed.lock(), vec!["v-1"]);
        assert_eq!(*repo.durations.lock(), vec![("v-1".to_string(), 42.5)]);
    }

    #[tokio::test]
    async fn test_marker_failure_is_swallowed() {
        let repo = Arc::new(SpyVideoRepo {
            fail_marker: true,
            ..Default::default()
        });
        let f = finalizer(
            repo.clone(),
            StubMediaInfo {
                duration: Some(10.0),
                fail: false,
            },
        );

        // Must not panic or propagate the marker failure
        let handle = f.finalize("v-1", "med-1").await;
        handle.await.unwrap();
        assert_eq!(*repo.durations.lock(), vec![("v-1".to_string(), 10.0)]);
    }

    #[tokio::test]
    async fn test_absent_duration_leaves_field_unset() {
        let repo = Arc::new(SpyVideoRepo::default());
        let f = finalizer(
            repo.clone(),
            StubMediaInfo {
                duration: None,
                fail: false,
            },
        );

        let handle = f.finalize("v-1", "med-1").await;
        handle.await.unwrap();
        assert!(repo.durations.lock().is_empty());
    }

    #[tokio::test]
    async fn test_info_endpoint_failure_is_swallowed() {
        let repo = Arc::new(SpyVideoRepo::default());
        let f = finalizer(
            repo.clone(),
            StubMediaInfo {
                duration: None,
                fail: true,
            },
        );

        let handle = f.finalize("v-1", "med-1").await;
        handle.await.unwrap();
        assert!(repo.durations.lock().is_empty());
    }

    #[tokio::test]
    async fn test_enrich_now_returns_duration() {
        let repo = Arc::new(SpyVideoRepo::default());
        let f = finalizer(
            repo.clone(),
            StubMediaInfo {
                duration: Some(300.0),
                fail: false,
            },
        );

        let duration = f.enrich_now("v-1", "med-1").await.unwrap();
        assert_eq!(duration, Some(300.0));
        assert_eq!(*repo.durations.lock(), vec![("v-1".to_string(), 300.0)]);
    }

    #[tokio::test]
    async fn test_enrich_now_rejects_invalid_duration() {
        let repo = Arc::new(SpyVideoRepo::default());
        let f = finalizer(
            repo.clone(),
            StubMediaInfo {
                duration: Some(0.0),
                fail: false,
            },
        );

        let duration = f.enrich_now("v-1", "med-1").await.unwrap();
        assert_eq!(duration, None);
        assert!(repo.durations.lock().is_empty());
    }
}
