//! Resumable chunked upload transfer.

pub mod finalize;
pub mod progress;

pub use finalize::UploadFinalizer;
pub use progress::{ProgressTracker, TransferProgress, format_eta};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::provider::{ChunkSink, TicketClient, TransferTicket};
use crate::{Error, Result};

/// Default chunk size: 32 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024 * 1024;

/// Per-chunk retry delays, applied in order before each re-attempt.
/// Exhausting the schedule fails the transfer.
pub const RETRY_DELAYS: [Duration; 4] = [
    Duration::ZERO,
    Duration::from_secs(1),
    Duration::from_secs(5),
    Duration::from_secs(15),
];

/// Upload configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub chunk_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Transfer lifecycle states. `Failed` is terminal for the attempt; a
/// restart negotiates a fresh ticket from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Negotiating,
    Transferring,
    Completed,
    Failed,
}

/// Drives a single upload: ticket negotiation, then sequential fixed-size
/// chunks with bounded per-chunk retries.
pub struct UploadOrchestrator {
    config: UploadConfig,
    tickets: Arc<dyn TicketClient>,
    sink: Arc<dyn ChunkSink>,
    state: RwLock<TransferState>,
    cancellation_token: CancellationToken,
}

impl UploadOrchestrator {
    pub fn new(
        config: UploadConfig,
        tickets: Arc<dyn TicketClient>,
        sink: Arc<dyn ChunkSink>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            tickets,
            sink,
            state: RwLock::new(TransferState::Idle),
            cancellation_token,
        }
    }

    pub fn state(&self) -> TransferState {
        *self.state.read()
    }

    /// Whether a transfer is in flight. Host UIs guard navigation on this.
    pub fn is_transferring(&self) -> bool {
        matches!(
            self.state(),
            TransferState::Negotiating | TransferState::Transferring
        )
    }

    /// Run the transfer. `on_progress` fires after every chunk ack with the
    /// cumulative byte count; the ticket is returned so the caller can store
    /// the media id and finalize.
    pub async fn transfer<R, F>(
        &self,
        mut reader: R,
        total_bytes: u64,
        filename: &str,
        mut on_progress: F,
    ) -> Result<TransferTicket>
    where
        R: AsyncRead + Unpin + Send,
        F: FnMut(TransferProgress) + Send,
    {
        *self.state.write() = TransferState::Negotiating;

        let ticket = match self.tickets.create_ticket(total_bytes, filename).await {
            Ok(ticket) => ticket,
            Err(e) => {
                *self.state.write() = TransferState::Failed;
                return Err(e);
            }
        };
        info!(media_id = %ticket.media_id, total_bytes, "transfer ticket issued");

        *self.state.write() = TransferState::Transferring;
        match self
            .send_chunks(&mut reader, total_bytes, &ticket.upload_url, &mut on_progress)
            .await
        {
            Ok(()) => {
                *self.state.write() = TransferState::Completed;
                info!(media_id = %ticket.media_id, "transfer completed");
                Ok(ticket)
            }
            Err(e) => {
                *self.state.write() = TransferState::Failed;
                Err(e)
            }
        }
    }

    async fn send_chunks<R, F>(
        &self,
        reader: &mut R,
        total_bytes: u64,
        upload_url: &str,
        on_progress: &mut F,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        F: FnMut(TransferProgress) + Send,
    {
        let mut tracker = ProgressTracker::new(total_bytes);
        let mut buffer = vec![0u8; self.config.chunk_size];
        let mut offset: u64 = 0;

        loop {
            let len = read_chunk(reader, &mut buffer).await?;
            if len == 0 {
                break;
            }

            self.send_chunk_with_retry(upload_url, offset, total_bytes, &buffer[..len])
                .await?;

            offset += len as u64;
            on_progress(tracker.record(offset));
        }

        if offset != total_bytes {
            return Err(Error::transfer(format!(
                "source ended at {} of {} declared bytes",
                offset, total_bytes
            )));
        }
        Ok(())
    }

    /// One chunk, retried over the escalating delay schedule.
    async fn send_chunk_with_retry(
        &self,
        upload_url: &str,
        offset: u64,
        total_bytes: u64,
        data: &[u8],
    ) -> Result<()> {
        let mut last_error = None;

        for (attempt, delay) in std::iter::once(None)
            .chain(RETRY_DELAYS.iter().copied().map(Some))
            .enumerate()
        {
            if let Some(delay) = delay
                && !delay.is_zero()
            {
                tokio::select! {
                    _ = self.cancellation_token.cancelled() => {
                        return Err(Error::transfer("transfer cancelled"));
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if self.cancellation_token.is_cancelled() {
                return Err(Error::transfer("transfer cancelled"));
            }

            match self.sink.send_chunk(upload_url, offset, total_bytes, data).await {
                Ok(()) => {
                    if attempt > 0 {
                        debug!(offset, "chunk accepted after {} retries", attempt);
                    }
                    return Ok(());
                }
                Err(e) => {
                    warn!(offset, attempt, "chunk send failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(Error::transfer(format!(
            "chunk at offset {} failed after {} retries: {}",
            offset,
            RETRY_DELAYS.len(),
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

/// Fill `buffer` from the reader, tolerating short reads. Returns the number
/// of bytes read; 0 means end of source.
async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut R, buffer: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let n = reader.read(&mut buffer[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
