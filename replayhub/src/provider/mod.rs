//! Media provider client.
//!
//! The external hosting provider owns the bytes: uploads negotiate a ticket,
//! stream chunks to the ticket's URL, and query media info after processing.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Transfer ticket issued by the provider before any bytes move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferTicket {
    /// One-time upload endpoint for this transfer
    pub upload_url: String,
    /// Provider-side media id, stored on the video row
    pub media_id: String,
}

/// Media info returned after provider-side processing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Absent until the provider has analyzed the media
    pub duration_secs: Option<f64>,
}

/// Ticket negotiation endpoint.
#[async_trait]
pub trait TicketClient: Send + Sync {
    async fn create_ticket(&self, size_bytes: u64, filename: &str) -> Result<TransferTicket>;
}

/// Sequential chunk upload endpoint.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    /// Send one byte range. `offset` is the absolute position of the first
    /// byte; ranges must arrive in order with no gaps.
    async fn send_chunk(
        &self,
        upload_url: &str,
        offset: u64,
        total_bytes: u64,
        data: &[u8],
    ) -> Result<()>;
}

/// Media info endpoint.
#[async_trait]
pub trait MediaInfoClient: Send + Sync {
    async fn get_media_info(&self, media_id: &str) -> Result<MediaInfo>;
}

/// Provider client configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API base, e.g. `https://media.example/api`
    pub base_url: String,
    pub api_key: Option<String>,
}

/// HTTP implementation of the provider endpoints.
pub struct ProviderClient {
    config: ProviderConfig,
    client: Client,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> Self {
        crate::utils::http_client::install_rustls_provider();
        Self {
            config,
            client: Client::new(),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl TicketClient for ProviderClient {
    async fn create_ticket(&self, size_bytes: u64, filename: &str) -> Result<TransferTicket> {
        let url = format!("{}/uploads", self.config.base_url.trim_end_matches('/'));
        let response = self
            .request(self.client.post(&url))
            .json(&serde_json::json!({
                "size_bytes": size_bytes,
                "filename": filename,
            }))
            .send()
            .await
            .map_err(|e| Error::transport(format!("ticket request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Ticket negotiation failed: {} - {}", status, text);
            return Err(Error::transfer(format!(
                "ticket negotiation failed: {}",
                status
            )));
        }

        let ticket: TransferTicket = response
            .json()
            .await
            .map_err(|e| Error::transfer(format!("invalid ticket response: {}", e)))?;
        debug!(media_id = %ticket.media_id, "transfer ticket issued");
        Ok(ticket)
    }
}

#[async_trait]
impl ChunkSink for ProviderClient {
    async fn send_chunk(
        &self,
        upload_url: &str,
        offset: u64,
        total_bytes: u64,
        data: &[u8],
    ) -> Result<()> {
        let end = offset + data.len() as u64 - 1;
        let response = self
            .request(self.client.put(upload_url))
            .header(
                "Content-Range",
                format!("bytes {}-{}/{}", offset, end, total_bytes),
            )
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| Error::transport(format!("chunk send failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::transfer(format!(
                "chunk rejected: {} - {}",
                status, text
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaInfoClient for ProviderClient {
    async fn get_media_info(&self, media_id: &str) -> Result<MediaInfo> {
        let url = format!(
            "{}/media/{}/info",
            self.config.base_url.trim_end_matches('/'),
            media_id
        );
        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|e| Error::transport(format!("media info request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transfer(format!("media info failed: {}", status)));
        }

        let info: MediaInfo = response
            .json()
            .await
            .map_err(|e| Error::transfer(format!("invalid media info response: {}", e)))?;
        Ok(info)
    }
}
