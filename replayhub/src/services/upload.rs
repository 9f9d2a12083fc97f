//! Member upload flow.

use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::info;

use crate::Result;
use crate::database::models::VideoDbModel;
use crate::database::repositories::VideoRepository;
use crate::feed::{ChangeFeedHub, RowEvent};
use crate::upload::{TransferProgress, UploadFinalizer, UploadOrchestrator};

/// Drives a member upload end to end: provisional record, ticket, chunked
/// transfer, finalization.
pub struct UploadService {
    video_repo: Arc<dyn VideoRepository>,
    orchestrator: Arc<UploadOrchestrator>,
    finalizer: Arc<UploadFinalizer>,
    hub: ChangeFeedHub,
}

impl UploadService {
    pub fn new(
        video_repo: Arc<dyn VideoRepository>,
        orchestrator: Arc<UploadOrchestrator>,
        finalizer: Arc<UploadFinalizer>,
        hub: ChangeFeedHub,
    ) -> Self {
        Self {
            video_repo,
            orchestrator,
            finalizer,
            hub,
        }
    }

    /// Upload a recording. The provisional (unpublished) video row is
    /// created before the ticket is negotiated, so a transfer failure still
    /// leaves a traceable record instead of an orphaned provider object.
    /// Returns the new video id.
    pub async fn upload<R, F>(
        &self,
        title: &str,
        owner_id: &str,
        owner_name: &str,
        reader: R,
        total_bytes: u64,
        filename: &str,
        on_progress: F,
    ) -> Result<String>
    where
        R: AsyncRead + Unpin + Send,
        F: FnMut(TransferProgress) + Send,
    {
        let video = VideoDbModel::new(title, owner_id, owner_name);
        self.video_repo.create(&video).await?;
        self.hub.publish_video(RowEvent::insert(video.clone()));
        info!(video_id = %video.id, title, "provisional video record created");

        let ticket = self
            .orchestrator
            .transfer(reader, total_bytes, filename, on_progress)
            .await?;

        self.video_repo
            .set_media_id(&video.id, &ticket.media_id)
            .await?;
        // Enrichment runs detached; the upload result does not wait on it
        let _ = self.finalizer.finalize(&video.id, &ticket.media_id).await;

        Ok(video.id)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::provider::{
        ChunkSink, MediaInfo, MediaInfoClient, TicketClient, TransferTicket,
    };
    use crate::upload::UploadConfig;
    use crate::{Error, Result};

    struct MemoryVideoRepo {
        videos: Mutex<Vec<VideoDbModel>>,
    }

    impl MemoryVideoRepo {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                videos: Mutex::new(Vec::new()),
            })
        }
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

        async fn mark_upload_complete(&self, id: &str) -> Result<()> {
            for v in self.videos.lock().iter_mut() {
                if v.id == id {
                    v.upload_completed_at = Some("2026-01-01T00:00:00Z".to_string());
                }
            }
            Ok(())
        }
    }

    struct StubTickets {
        fail: bool,
    }

    #[async_trait]
    impl TicketClient for StubTickets {
        async fn create_ticket(&self, _size_bytes: u64, _filename: &str) -> Result<TransferTicket> {
            if self.fail {
                return Err(Error::transfer("ticket endpoint down"));
            }
            Ok(TransferTicket {
                upload_url: "https://media.example/u/abc".to_string(),
                media_id: "med-1".to_string(),
            })
        }
    }

    struct NullSink;

    #[async_trait]
    impl ChunkSink for NullSink {
        async fn send_chunk(
            &self,
            _upload_url: &str,
            _offset: u64,
            _total_bytes: u64,
            _data: &[u8],
        ) -> Result<()> {
            Ok(())
        }
    }

    struct StubMediaInfo;

    #[async_trait]
    impl MediaInfoClient for StubMediaInfo {
        async fn get_media_info(&self, _media_id: &str) -> Result<MediaInfo> {
            Ok(MediaInfo {
                duration_secs: Some(77.0),
            })
        }
    }

    fn service(repo: Arc<MemoryVideoRepo>, ticket_fail: bool) -> (UploadService, ChangeFeedHub) {
        let token = CancellationToken::new();
        let orchestrator = Arc::new(UploadOrchestrator::new(
            UploadConfig { chunk_size: 4 },
            Arc::new(StubTickets { fail: ticket_fail }),
            Arc::new(NullSink),
            token.clone(),
        ));
        let finalizer = Arc::new(UploadFinalizer::with_delay(
            repo.clone(),
            Arc::new(StubMediaInfo),
            std::time::Duration::from_millis(1),
            token,
        ));
        let hub = ChangeFeedHub::new();
        (
            UploadService::new(repo, orchestrator, finalizer, hub.clone()),
            hub,
        )
    }

    #[tokio::test]
    async fn test_upload_creates_record_then_transfers() {
        let repo = MemoryVideoRepo::new();
        let (service, hub) = service(repo.clone(), false);
        let mut rx = hub.subscribe_videos();

        let id = service
            .upload("Ace clutch", "m-1", "Kael", &b"data"[..], 4, "run.mp4", |_| {})
            .await
            .unwrap();

        let video = repo.get(&id).await.unwrap();
        assert!(!video.published);
        assert_eq!(video.media_id.as_deref(), Some("med-1"));

        // The insert event reached the feed before the transfer began
        let event = rx.recv().await.unwrap();
        assert_eq!(event.row.id, id);
        assert!(event.row.media_id.is_none());
    }

    #[tokio::test]
    async fn test_failed_transfer_leaves_traceable_record() {
        let repo = MemoryVideoRepo::new();
        let (service, _hub) = service(repo.clone(), true);

        let result = service
            .upload("Ace clutch", "m-1", "Kael", &b"data"[..], 4, "run.mp4", |_| {})
            .await;
        assert!(result.is_err());

        let videos = repo.videos.lock().clone();
        assert_eq!(videos.len(), 1);
        assert!(!videos[0].published);
        assert!(videos[0].media_id.is_none());
    }
}
