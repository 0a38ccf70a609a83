//! Common types and utilities for sources
//!
//! Shared functionality across all source types.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics shared by parse-oriented sources.
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Request bodies handed to the parser.
    pub requests_total: AtomicU64,

    /// Requests aborted with a hard parse error.
    pub request_errors_total: AtomicU64,

    /// Rows emitted to the processor.
    pub rows_emitted_total: AtomicU64,

    /// Input bytes received.
    pub bytes_total: AtomicU64,
}

impl SourceMetrics {
    /// Create a new metrics instance.
    pub const fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            request_errors_total: AtomicU64::new(0),
            rows_emitted_total: AtomicU64::new(0),
            bytes_total: AtomicU64::new(0),
        }
    }

    /// Record a request handed to the parser.
    #[inline]
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request aborted with a hard error.
    #[inline]
    pub fn record_error(&self) {
        self.request_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record rows emitted to the processor.
    #[inline]
    pub fn record_rows(&self, n: u64) {
        self.rows_emitted_total.fetch_add(n, Ordering::Relaxed);
    }

    /// Record input bytes received.
    #[inline]
    pub fn record_bytes(&self, n: u64) {
        self.bytes_total.fetch_add(n, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot.
    pub fn snapshot(&self) -> SourceMetricsSnapshot {
        SourceMetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            request_errors_total: self.request_errors_total.load(Ordering::Relaxed),
            rows_emitted_total: self.rows_emitted_total.load(Ordering::Relaxed),
            bytes_total: self.bytes_total.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of source metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceMetricsSnapshot {
    pub requests_total: u64,
    pub request_errors_total: u64,
    pub rows_emitted_total: u64,
    pub bytes_total: u64,
}
