//! Transfer progress tracking.
//!
//! Throughput is derived only from samples spaced at least half a second
//! apart; back-to-back chunk acks inside that window reuse the previous
//! figure instead of producing a jittery spike.

use std::time::{Duration, Instant};

/// Minimum spacing between throughput samples.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Progress snapshot handed to the host's callback per chunk ack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
    /// Smoothed over the last accepted sample window; `None` until the first
    /// window closes
    pub throughput_bps: Option<f64>,
    pub eta: Option<Duration>,
}

impl TransferProgress {
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.bytes_sent as f64 / self.total_bytes as f64) * 100.0
    }
}

/// Tracks cumulative bytes and derives throughput/ETA.
pub struct ProgressTracker {
    total_bytes: u64,
    bytes_sent: u64,
    last_sample_at: Instant,
    last_sample_bytes: u64,
    throughput_bps: Option<f64>,
}

impl ProgressTracker {
    pub fn new(total_bytes: u64) -> Self {
        Self::starting_at(total_bytes, Instant::now())
    }

    fn starting_at(total_bytes: u64, now: Instant) -> Self {
        Self {
            total_bytes,
            bytes_sent: 0,
            last_sample_at: now,
            last_sample_bytes: 0,
            throughput_bps: None,
        }
    }

    /// Record the cumulative byte count after a chunk ack.
    pub fn record(&mut self, bytes_sent: u64) -> TransferProgress {
        self.record_at(bytes_sent, Instant::now())
    }

    fn record_at(&mut self, bytes_sent: u64, now: Instant) -> TransferProgress {
        self.bytes_sent = bytes_sent;

        let elapsed = now.duration_since(self.last_sample_at);
        if elapsed >= MIN_SAMPLE_INTERVAL {
            let delta_bytes = bytes_sent.saturating_sub(self.last_sample_bytes);
            self.throughput_bps = Some(delta_bytes as f64 / elapsed.as_secs_f64());
            self.last_sample_at = now;
            self.last_sample_bytes = bytes_sent;
        }

        self.snapshot()
    }

    pub fn snapshot(&self) -> TransferProgress {
        TransferProgress {
            bytes_sent: self.bytes_sent,
            total_bytes: self.total_bytes,
            throughput_bps: self.throughput_bps,
            eta: self.eta(),
        }
    }

    /// Remaining bytes over current throughput.
    fn eta(&self) -> Option<Duration> {
        let bps = self.throughput_bps?;
        if bps <= 0.0 {
            return None;
        }
        let remaining = self.total_bytes.saturating_sub(self.bytes_sent);
        Some(Duration::from_secs_f64(remaining as f64 / bps))
    }
}

/// Format an ETA at seconds/minutes/hours precision.
pub fn format_eta(eta: Duration) -> String {
    let total_secs = eta.as_secs();
    if total_secs < 60 {
        format!("{}s", total_secs)
    } else if total_secs < 3600 {
        format!("{}m {}s", total_secs / 60, total_secs % 60)
    } else {
        format!("{}h {}m", total_secs / 3600, (total_secs % 3600) / 60)
    }
}
