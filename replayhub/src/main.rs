use anyhow::Context;
use tracing::info;

use replayhub::database;
use replayhub::dispatcher::DispatcherConfig;
use replayhub::provider::ProviderConfig;
use replayhub::services::{ContainerConfig, ServiceContainer};
use replayhub::upload::UploadConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    replayhub::logging::init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://replayhub.db".to_string());
    let pool = database::init_pool(&database_url)
        .await
        .context("failed to initialize database pool")?;
    database::run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;

    let mut dispatcher_config = DispatcherConfig::default();
    if let Ok(window) = std::env::var("PRIME_WINDOW")
        && let Ok(window) = window.parse()
    {
        dispatcher_config.prime_window = window;
    }

    let config = ContainerConfig {
        chat_api_base: std::env::var("CHAT_API_BASE")
            .unwrap_or_else(|_| "https://chat.example/api/v1".to_string()),
        portal_base_url: std::env::var("PORTAL_BASE_URL").ok(),
        provider: ProviderConfig {
            base_url: std::env::var("MEDIA_PROVIDER_URL")
                .unwrap_or_else(|_| "https://media.example/api".to_string()),
            api_key: std::env::var("MEDIA_PROVIDER_API_KEY").ok(),
        },
        dispatcher: dispatcher_config,
        upload: UploadConfig::default(),
    };

    let mut container = ServiceContainer::new(pool, config)
        .await
        .context("failed to initialize services")?;
    container.start().await.context("failed to start services")?;

    info!("replayhub is running, press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    container.shutdown().await;
    Ok(())
}
