//! Service container for dependency injection.
//!
//! The ServiceContainer holds references to all application services
//! and manages their lifecycle.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::Result;
use crate::cache::PublishStateCache;
use crate::database::repositories::{
    SqlxMemberRepository, SqlxSettingsRepository, SqlxVideoRepository,
};
use crate::dispatcher::{ChangeEventDispatcher, DispatcherConfig, DispatcherStats};
use crate::feed::ChangeFeedHub;
use crate::notification::{BotApiTransport, DeliveryService, DeliveryStats, HttpWebhookTransport};
use crate::provider::{ProviderClient, ProviderConfig};
use crate::services::{PublishService, UploadService};
use crate::settings::SettingsCache;
use crate::upload::{UploadConfig, UploadFinalizer, UploadOrchestrator};

/// Container configuration.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Chat platform API base for bot channel posts
    pub chat_api_base: String,
    /// Portal base URL for action links in announcements
    pub portal_base_url: Option<String>,
    pub provider: ProviderConfig,
    pub dispatcher: DispatcherConfig,
    pub upload: UploadConfig,
}

/// Aggregated service counters.
#[derive(Debug, Clone, Copy)]
pub struct ContainerStats {
    pub cached_videos: usize,
    pub dispatcher: DispatcherStats,
    pub delivery: DeliveryStats,
}

/// Service container holding all application services.
pub struct ServiceContainer {
    /// Database connection pool.
    pub pool: SqlitePool,
    /// Change feed hub (shared between producers and the dispatcher).
    pub feed_hub: ChangeFeedHub,
    /// Publish state cache.
    pub cache: Arc<PublishStateCache>,
    /// Settings snapshot cache.
    pub settings: Arc<SettingsCache>,
    /// Notification delivery service.
    pub delivery: Arc<DeliveryService>,
    /// Change event dispatcher.
    pub dispatcher: Arc<ChangeEventDispatcher>,
    /// Upload transfer orchestrator.
    pub uploader: Arc<UploadOrchestrator>,
    /// Upload finalizer.
    pub finalizer: Arc<UploadFinalizer>,
    /// Member upload flow.
    pub upload_service: Arc<UploadService>,
    /// Admin publish service.
    pub publish_service: Arc<PublishService>,
    /// Cancellation token for graceful shutdown.
    cancellation_token: CancellationToken,
    listener_handles: Vec<JoinHandle<()>>,
}

impl ServiceContainer {
    /// Create a new service container with the given database pool.
    pub async fn new(pool: SqlitePool, config: ContainerConfig) -> Result<Self> {
        info!("Initializing service container");

        // Create repositories
        let video_repo = Arc::new(SqlxVideoRepository::new(pool.clone()));
        let member_repo = Arc::new(SqlxMemberRepository::new(pool.clone()));
        let settings_repo = Arc::new(SqlxSettingsRepository::new(pool.clone()));

        let settings = Arc::new(SettingsCache::new(settings_repo));
        let feed_hub = ChangeFeedHub::new();
        let cache = Arc::new(PublishStateCache::new());
        let cancellation_token = CancellationToken::new();

        // Create delivery service over the bot and webhook transports
        let delivery = Arc::new(DeliveryService::new(
            Arc::new(BotApiTransport::new(config.chat_api_base.clone())),
            Arc::new(HttpWebhookTransport::new()),
            config.portal_base_url.clone(),
        ));

        let dispatcher = Arc::new(ChangeEventDispatcher::new(
            config.dispatcher.clone(),
            cache.clone(),
            video_repo.clone(),
            member_repo,
            settings.clone(),
            delivery.clone(),
            cancellation_token.clone(),
        ));

        // Create provider-facing upload services
        let provider = Arc::new(ProviderClient::new(config.provider.clone()));
        let uploader = Arc::new(UploadOrchestrator::new(
            config.upload.clone(),
            provider.clone(),
            provider.clone(),
            cancellation_token.clone(),
        ));
        let finalizer = Arc::new(UploadFinalizer::new(
            video_repo.clone(),
            provider,
            cancellation_token.clone(),
        ));

        let upload_service = Arc::new(UploadService::new(
            video_repo.clone(),
            uploader.clone(),
            finalizer.clone(),
            feed_hub.clone(),
        ));

        let publish_service = Arc::new(PublishService::new(
            video_repo,
            finalizer.clone(),
            feed_hub.clone(),
        ));

        info!("Service container initialized");

        Ok(Self {
            pool,
            feed_hub,
            cache,
            settings,
            delivery,
            dispatcher,
            uploader,
            finalizer,
            upload_service,
            publish_service,
            cancellation_token,
            listener_handles: Vec::new(),
        })
    }

    /// Prime the cache and start the subscription loops.
    pub async fn start(&mut self) -> Result<()> {
        self.dispatcher.prime().await?;
        self.listener_handles = self.dispatcher.start(&self.feed_hub);
        info!("Change event listeners started");
        Ok(())
    }

    /// Graceful shutdown: stop the listeners, then close the pool.
    pub async fn shutdown(mut self) {
        info!("Shutting down service container");
        self.cancellation_token.cancel();

        for handle in self.listener_handles.drain(..) {
            if let Err(e) = handle.await {
                warn!("Listener task failed during shutdown: {}", e);
            }
        }

        self.pool.close().await;
        info!("Service container shut down");
    }

    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            cached_videos: self.cache.len(),
            dispatcher: self.dispatcher.stats(),
            delivery: self.delivery.stats(),
        }
    }
}
