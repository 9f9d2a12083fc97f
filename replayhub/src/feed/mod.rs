//! Change feed hub.
//!
//! In-process seam over the platform's change-feed subscription: three
//! independent broadcast streams of row snapshots. Delivery is at-least-once
//! and events carry the current row only, no prior image.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::database::models::{AlertDbModel, VideoDbModel, WatchSessionDbModel};

/// Default broadcast channel capacity per stream.
const DEFAULT_FEED_CAPACITY: usize = 256;

/// Kind of row change carried by a feed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedEventKind {
    Insert,
    Update,
}

/// A row snapshot from one of the change streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowEvent<T> {
    pub kind: FeedEventKind,
    pub row: T,
}

impl<T> RowEvent<T> {
    pub fn insert(row: T) -> Self {
        Self {
            kind: FeedEventKind::Insert,
            row,
        }
    }

    pub fn update(row: T) -> Self {
        Self {
            kind: FeedEventKind::Update,
            row,
        }
    }
}

/// Hub over the three change streams: video updates, new watch sessions, new
/// alerts. Publishing with no live subscribers is a no-op.
#[derive(Clone)]
pub struct ChangeFeedHub {
    videos: broadcast::Sender<RowEvent<VideoDbModel>>,
    sessions: broadcast::Sender<RowEvent<WatchSessionDbModel>>,
    alerts: broadcast::Sender<RowEvent<AlertDbModel>>,
}

impl ChangeFeedHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (videos, _) = broadcast::channel(capacity);
        let (sessions, _) = broadcast::channel(capacity);
        let (alerts, _) = broadcast::channel(capacity);
        Self {
            videos,
            sessions,
            alerts,
        }
    }

    pub fn subscribe_videos(&self) -> broadcast::Receiver<RowEvent<VideoDbModel>> {
        self.videos.subscribe()
    }

    pub fn subscribe_sessions(&self) -> broadcast::Receiver<RowEvent<WatchSessionDbModel>> {
        self.sessions.subscribe()
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<RowEvent<AlertDbModel>> {
        self.alerts.subscribe()
    }

    pub fn publish_video(&self, event: RowEvent<VideoDbModel>) {
        let _ = self.videos.send(event);
    }

    pub fn publish_session(&self, event: RowEvent<WatchSessionDbModel>) {
        let _ = self.sessions.send(event);
    }

    pub fn publish_alert(&self, event: RowEvent<AlertDbModel>) {
        let _ = self.alerts.send(event);
    }

    pub fn video_subscriber_count(&self) -> usize {
        self.videos.receiver_count()
    }
}

impl Default for ChangeFeedHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_video_stream_delivers_snapshot() {
        let hub = ChangeFeedHub::new();
        let mut rx = hub.subscribe_videos();

        let video = VideoDbModel::new("Clutch round", "m-1", "Kael");
        hub.publish_video(RowEvent::insert(video.clone()));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, FeedEventKind::Insert);
        assert_eq!(event.row.id, video.id);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let hub = ChangeFeedHub::new();
        // Must not panic or error
        hub.publish_video(RowEvent::update(VideoDbModel::new("t", "o", "n")));
        assert_eq!(hub.video_subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_streams_are_independent() {
        let hub = ChangeFeedHub::new();
        let mut sessions = hub.subscribe_sessions();

        hub.publish_video(RowEvent::insert(VideoDbModel::new("t", "o", "n")));
        hub.publish_session(RowEvent::insert(WatchSessionDbModel {
            id: "s-1".to_string(),
            video_id: "v-1".to_string(),
            viewer_id: "m-2".to_string(),
            country: Some("DE".to_string()),
            started_at: "2026-01-01T00:00:00Z".to_string(),
        }));

        let event = sessions.recv().await.unwrap();
        assert_eq!(event.row.id, "s-1");
    }
}
