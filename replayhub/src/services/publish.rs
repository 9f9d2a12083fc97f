//! Admin publish service.

use std::sync::Arc;

use tracing::{info, warn};

use crate::Result;
use crate::database::repositories::VideoRepository;
use crate::feed::{ChangeFeedHub, RowEvent};
use crate::upload::UploadFinalizer;

/// Applies publish decisions and emits the corresponding change events.
pub struct PublishService {
    video_repo: Arc<dyn VideoRepository>,
    finalizer: Arc<UploadFinalizer>,
    hub: ChangeFeedHub,
}

impl PublishService {
    pub fn new(
        video_repo: Arc<dyn VideoRepository>,
        finalizer: Arc<UploadFinalizer>,
        hub: ChangeFeedHub,
    ) -> Self {
        Self {
            video_repo,
            finalizer,
            hub,
        }
    }

    /// Publish a video. When the stored duration is missing or invalid and a
    /// media id exists, one synchronous enrichment attempt runs first so the
    /// announcement can carry the duration; its failure never blocks the
    /// publish.
    pub async fn publish(&self, video_id: &str) -> Result<()> {
        let video = self.video_repo.get(video_id).await?;

        if !video.has_valid_duration()
            && let Some(media_id) = &video.media_id
        {
            match self.finalizer.enrich_now(video_id, media_id).await {
                Ok(Some(duration)) => info!(video_id, duration, "duration enriched at publish"),
                Ok(None) => info!(video_id, "duration still unavailable at publish"),
                Err(e) => warn!(video_id, "publish-time enrichment failed: {}", e),
            }
        }

        self.video_repo.set_published(video_id, true).await?;

        let updated = self.video_repo.get(video_id).await?;
        self.hub.publish_video(RowEvent::update(updated));
        Ok(())
    }

    /// Withdraw a video from public visibility.
    pub async fn unpublish(&self, video_id: &str) -> Result<()> {
        self.video_repo.set_published(video_id, false).await?;

        let updated = self.video_repo.get(video_id).await?;
        self.hub.publish_video(RowEvent::update(updated));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::database::models::VideoDbModel;
    use crate::provider::{MediaInfo, MediaInfoClient};
    use crate::{Error, Result};

    struct MemoryVideoRepo {
        videos: Mutex<Vec<VideoDbModel>>,
    }

    #[async_trait]
    impl VideoRepository for MemoryVideoRepo {
        async fn get(&self, id: &str) -> Result<VideoDbModel> {
            self.videos
                .lock()
                .iter()
                .find(|v| v.id == id)
                .cloned()
                .ok_or_else(|| Error::not_found("Video", id))
        }

        async fn create(&self, video: &VideoDbModel) -> Result<()> {
            self.videos.lock().push(video.clone());
            Ok(())
        }

        async fn list_recent(&self, _limit: u32) -> Result<Vec<VideoDbModel>> {
            Ok(self.videos.lock().clone())
        }

        async fn set_published(&self, id: &str, published: bool) -> Result<()> {
            for v in self.videos.lock().iter_mut() {
                if v.id == id {
                    v.published = published;
                }
            }
            Ok(())
        }

        async fn set_media_id(&self, id: &str, media_id: &str) -> Result<()> {
            for v in self.videos.lock().iter_mut() {
                if v.id == id {
                    v.media_id = Some(media_id.to_string());
                }
            }
            Ok(())
        }

        async fn set_duration(&self, id: &str, duration_secs: f64) -> Result<()> {
            for v in self.videos.lock().iter_mut() {
                if v.id == id {
                    v.duration_secs = Some(duration_secs);
                }
            }
            Ok(())
        }

        async fn mark_upload_complete(&self, _id: &str) -> Result<()> {
            Ok(())
        }
    }

    struct StubMediaInfo {
        duration: Option<f64>,
    }

    #[async_trait]
    impl MediaInfoClient for StubMediaInfo {
        async fn get_media_info(&self, _media_id: &str) -> Result<MediaInfo> {
            Ok(MediaInfo {
                duration_secs: self.duration,
            })
        }
    }

    fn service(video: VideoDbModel, duration: Option<f64>) -> (PublishService, ChangeFeedHub) {
        let repo = Arc::new(MemoryVideoRepo {
            videos: Mutex::new(vec![video]),
        });
        let finalizer = Arc::new(UploadFinalizer::new(
            repo.clone(),
            Arc::new(StubMediaInfo { duration }),
            CancellationToken::new(),
        ));
        let hub = ChangeFeedHub::new();
        (
            PublishService::new(repo, finalizer, hub.clone()),
            hub,
        )
    }

    #[tokio::test]
    async fn test_publish_enriches_missing_duration() {
        let mut video = VideoDbModel::new("Final", "m-1", "Kael");
        video.id = "v-1".to_string();
        video.media_id = Some("med-1".to_string());

        let (service, hub) = service(video, Some(187.0));
        let mut rx = hub.subscribe_videos();

        service.publish("v-1").await.unwrap();

        let event = rx.recv().await.unwrap();
        assert!(event.row.published);
        assert_eq!(event.row.duration_secs, Some(187.0));
    }

    #[tokio::test]
    async fn test_publish_proceeds_without_duration() {
        let mut video = VideoDbModel::new("Final", "m-1", "Kael");
        video.id = "v-1".to_string();
        video.media_id = Some("med-1".to_string());

        let (service, hub) = service(video, None);
        let mut rx = hub.subscribe_videos();

        service.publish("v-1").await.unwrap();

        let event = rx.recv().await.unwrap();
        assert!(event.row.published);
        assert!(event.row.duration_secs.is_none());
    }

    #[tokio::test]
    async fn test_publish_skips_enrichment_when_duration_valid() {
        let mut video = VideoDbModel::new("Final", "m-1", "Kael");
        video.id = "v-1".to_string();
        video.media_id = Some("med-1".to_string());
        video.duration_secs = Some(60.0);

        // Enrichment would overwrite with 999 if it ran
        let (service, hub) = service(video, Some(999.0));
        let mut rx = hub.subscribe_videos();

        service.publish("v-1").await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.row.duration_secs, Some(60.0));
    }

    #[tokio::test]
    async fn test_unpublish_emits_update() {
        let mut video = VideoDbModel::new("Final", "m-1", "Kael");
        video.id = "v-1".to_string();
        video.published = true;

        let (service, hub) = service(video, None);
        let mut rx = hub.subscribe_videos();

        service.unpublish("v-1").await.unwrap();
        let event = rx.recv().await.unwrap();
        assert!(!event.row.published);
    }
}
