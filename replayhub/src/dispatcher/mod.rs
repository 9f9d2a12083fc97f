//! Change event dispatcher.
//!
//! Subscribes to the three change streams and routes each event to a handler.
//! The publish-flip detection works against the entity state cache: an update
//! for an unknown id primes the cache without notifying, so a missed insert
//! can never surface a stale "published" announcement. Handler errors are
//! logged and swallowed; the subscription loops only stop on shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::cache::{FlagTransition, PublishStateCache};
use crate::database::models::{AlertDbModel, VideoDbModel, WatchSessionDbModel};
use crate::database::repositories::{MemberRepository, VideoRepository};
use crate::feed::{ChangeFeedHub, FeedEventKind, RowEvent};
use crate::notification::{DeliveryService, NotificationEvent};
use crate::settings::SettingsCache;

/// Display-name fallback when a lookup misses or errors.
const UNKNOWN_NAME: &str = "Unknown";

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of most recent videos loaded into the cache at startup.
    /// A flip on an older record is suppressed once, then tracked.
    pub prime_window: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { prime_window: 200 }
    }
}

/// Dispatcher counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct DispatcherStats {
    pub video_events: u64,
    pub session_events: u64,
    pub alert_events: u64,
    pub handler_errors: u64,
}

#[derive(Default)]
struct Counters {
    video_events: AtomicU64,
    session_events: AtomicU64,
    alert_events: AtomicU64,
    handler_errors: AtomicU64,
}

/// Change event dispatcher.
pub struct ChangeEventDispatcher {
    config: DispatcherConfig,
    cache: Arc<PublishStateCache>,
    video_repo: Arc<dyn VideoRepository>,
    member_repo: Arc<dyn MemberRepository>,
    settings: Arc<SettingsCache>,
    delivery: Arc<DeliveryService>,
    cancellation_token: CancellationToken,
    counters: Counters,
}

impl ChangeEventDispatcher {
    pub fn new(
        config: DispatcherConfig,
        cache: Arc<PublishStateCache>,
        video_repo: Arc<dyn VideoRepository>,
        member_repo: Arc<dyn MemberRepository>,
        settings: Arc<SettingsCache>,
        delivery: Arc<DeliveryService>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            cache,
            video_repo,
            member_repo,
            settings,
            delivery,
            cancellation_token,
            counters: Counters::default(),
        }
    }

    /// Seed the cache with the most recent videos before subscribing.
    pub async fn prime(&self) -> Result<()> {
        let recent = self.video_repo.list_recent(self.config.prime_window).await?;
        let count = recent.len();
        self.cache
            .prime(recent.into_iter().map(|v| (v.id, v.published)));
        info!("Primed publish state cache with {} videos", count);
        Ok(())
    }

    /// Subscribe to all three streams and spawn their listener loops.
    pub fn start(self: &Arc<Self>, hub: &ChangeFeedHub) -> Vec<JoinHandle<()>> {
        vec![
            self.spawn_video_listener(hub.subscribe_videos()),
            self.spawn_session_listener(hub.subscribe_sessions()),
            self.spawn_alert_listener(hub.subscribe_alerts()),
        ]
    }

    fn spawn_video_listener(
        self: &Arc<Self>,
        mut rx: broadcast::Receiver<RowEvent<VideoDbModel>>,
    ) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        let cancellation_token = dispatcher.cancellation_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancellation_token.cancelled() => {
                        debug!("Video event listener shutting down");
                        break;
                    }
                    result = rx.recv() => {
                        match result {
                            Ok(event) => {
                                dispatcher.counters.video_events.fetch_add(1, Ordering::Relaxed);
                                dispatcher.handle_video_event(event).await;
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!("Video event listener lagged by {} events", n);
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                debug!("Video event stream closed");
                                break;
                            }
                        }
                    }
                }
            }
        })
    }

    fn spawn_session_listener(
        self: &Arc<Self>,
        mut rx: broadcast::Receiver<RowEvent<WatchSessionDbModel>>,
    ) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        let cancellation_token = dispatcher.cancellation_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancellation_token.cancelled() => {
                        debug!("Session event listener shutting down");
                        break;
                    }
                    result = rx.recv() => {
                        match result {
                            Ok(event) => {
                                dispatcher.counters.session_events.fetch_add(1, Ordering::Relaxed);
                                dispatcher.handle_session_event(event).await;
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!("Session event listener lagged by {} events", n);
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                debug!("Session event stream closed");
                                break;
                            }
                        }
                    }
                }
            }
        })
    }

    fn spawn_alert_listener(
        self: &Arc<Self>,
        mut rx: broadcast::Receiver<RowEvent<AlertDbModel>>,
    ) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        let cancellation_token = dispatcher.cancellation_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancellation_token.cancelled() => {
                        debug!("Alert event listener shutting down");
                        break;
                    }
                    result = rx.recv() => {
                        match result {
                            Ok(event) => {
                                dispatcher.counters.alert_events.fetch_add(1, Ordering::Relaxed);
                                dispatcher.handle_alert_event(event).await;
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!("Alert event listener lagged by {} events", n);
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                debug!("Alert event stream closed");
                                break;
                            }
                        }
                    }
                }
            }
        })
    }

    /// Publish-flip state machine. The cache read-modify-write for one id is
    /// non-interleaved, so a redelivered update classifies as unchanged.
    pub async fn handle_video_event(&self, event: RowEvent<VideoDbModel>) {
        let video = event.row;
        let transition = self.cache.apply(video.id.clone(), video.published);

        let notification = match (event.kind, transition) {
            (FeedEventKind::Insert, FlagTransition::FirstSeen) => {
                Some(NotificationEvent::NewUpload {
                    video_id: video.id.clone(),
                    title: video.title.clone(),
                    owner_name: video.owner_name.clone(),
                    timestamp: Utc::now(),
                })
            }
            // Update for an unknown id: prime only. The flag just recorded
            // may reflect a change we never saw the predecessor of.
            (FeedEventKind::Update, FlagTransition::FirstSeen) => {
                debug!(video_id = %video.id, "primed unknown video from update");
                None
            }
            // Unrelated field change, or a redelivered event
            (_, FlagTransition::Unchanged) => None,
            (_, FlagTransition::Flipped { .. }) if video.published => {
                Some(NotificationEvent::Published {
                    video_id: video.id.clone(),
                    title: video.title.clone(),
                    owner_name: video.owner_name.clone(),
                    duration_secs: video.duration_secs,
                    timestamp: Utc::now(),
                })
            }
            (_, FlagTransition::Flipped { .. }) => Some(NotificationEvent::Unpublished {
                video_id: video.id.clone(),
                title: video.title.clone(),
                owner_name: video.owner_name.clone(),
                timestamp: Utc::now(),
            }),
        };

        if let Some(notification) = notification {
            self.deliver(&notification).await;
        }
    }

    /// Enrich a new watch session with display names, falling back to
    /// "Unknown" on any miss or lookup error.
    pub async fn handle_session_event(&self, event: RowEvent<WatchSessionDbModel>) {
        if event.kind != FeedEventKind::Insert {
            return;
        }
        let session = event.row;

        let viewer_name = match self.member_repo.display_name(&session.viewer_id).await {
            Ok(Some(name)) => name,
            Ok(None) => UNKNOWN_NAME.to_string(),
            Err(e) => {
                warn!(viewer_id = %session.viewer_id, "viewer lookup failed: {}", e);
                UNKNOWN_NAME.to_string()
            }
        };

        let video_title = match self.video_repo.get(&session.video_id).await {
            Ok(video) => video.title,
            Err(e) => {
                warn!(video_id = %session.video_id, "video lookup failed: {}", e);
                UNKNOWN_NAME.to_string()
            }
        };

        let notification = NotificationEvent::SessionStarted {
            session_id: session.id,
            viewer_name,
            video_title,
            country: session.country,
            timestamp: Utc::now(),
        };
        self.deliver(&notification).await;
    }

    /// Render an alert row into a notification. Unrecognized producer types
    /// are dropped; per-type gating happens in the delivery service.
    pub async fn handle_alert_event(&self, event: RowEvent<AlertDbModel>) {
        if event.kind != FeedEventKind::Insert {
            return;
        }
        let alert = event.row;

        let Some(alert_type) = alert.kind() else {
            warn!(alert_id = %alert.id, alert_type = %alert.alert_type, "unrecognized alert type, dropping");
            return;
        };

        let notification = NotificationEvent::AlertRaised {
            alert_id: alert.id,
            alert_type,
            severity: alert.severity,
            subject_id: alert.subject_id,
            details: alert.details,
            timestamp: Utc::now(),
        };
        self.deliver(&notification).await;
    }

    /// Deliver against the current settings snapshot. A settings read failure
    /// drops this notification but never the subscription.
    async fn deliver(&self, notification: &NotificationEvent) {
        match self.settings.snapshot().await {
            Ok(settings) => self.delivery.deliver(notification, &settings).await,
            Err(e) => {
                warn!("settings snapshot unavailable, notification dropped: {}", e);
                self.counters.handler_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            video_events: self.counters.video_events.load(Ordering::Relaxed),
            session_events: self.counters.session_events.load(Ordering::Relaxed),
            alert_events: self.counters.alert_events.load(Ordering::Relaxed),
            handler_errors: self.counters.handler_errors.load(Ordering::Relaxed),
        }
    }
}
