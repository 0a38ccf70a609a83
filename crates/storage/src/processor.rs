//! The sink contract between wire-format parsers and the ingestion batch.

use crate::field::Field;
use crate::log_rows::{LogRows, LogRowsSettings};
use crate::stream_id::TenantID;

/// Narrow sink interface that decouples producers (parsers) from the batch
/// and the downstream block writer.
pub trait LogMessageProcessor {
    /// Append one log entry with the given timestamp in nanoseconds.
    ///
    /// `stream_fields_override`, when present, replaces the configured
    /// stream fields for this entry's stream identity.
    fn add_row(
        &mut self,
        timestamp: i64,
        fields: &[Field<'_>],
        stream_fields_override: Option<&[Field<'_>]>,
    );

    /// Flush anything buffered and release held resources.
    ///
    /// Must be called exactly once, after the last `add_row`.
    fn must_close(&mut self);
}

/// Destination for sorted, flush-ready batches - the block-writer seam.
///
/// Implementations are expected to copy out everything they keep: the rows
/// handed over become invalid at the batch's next reset.
pub trait RowsSink {
    /// Consume all rows currently held by `lr`.
    fn must_write_rows(&mut self, lr: &mut LogRows);
}

/// [`LogMessageProcessor`] backed by a pooled [`LogRows`] batch.
///
/// Rows accumulate until the batch signals
/// [`need_flush`](LogRows::need_flush) or the processor is closed; each
/// flush sorts the batch and hands it to the sink. Dropping the processor
/// without closing it discards buffered rows and returns the batch to the
/// pool - the cancellation path.
pub struct BatchProcessor<S: RowsSink> {
    lr: Option<LogRows>,
    tenant_id: TenantID,
    sink: S,
}

impl<S: RowsSink> BatchProcessor<S> {
    /// Create a processor for one request.
    pub fn new(settings: &LogRowsSettings, tenant_id: TenantID, sink: S) -> Self {
        Self {
            lr: Some(LogRows::get(settings)),
            tenant_id,
            sink,
        }
    }

    /// Access the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn flush(&mut self) {
        let Some(lr) = self.lr.as_mut() else { return };
        if lr.is_empty() {
            return;
        }
        lr.sort_rows();
        lr.sort_fields_in_rows();
        self.sink.must_write_rows(lr);
        lr.reset_keep_settings();
    }
}

impl<S: RowsSink> LogMessageProcessor for BatchProcessor<S> {
    fn add_row(
        &mut self,
        timestamp: i64,
        fields: &[Field<'_>],
        stream_fields_override: Option<&[Field<'_>]>,
    ) {
        let Some(lr) = self.lr.as_mut() else { return };
        lr.must_add(self.tenant_id, timestamp, fields, stream_fields_override);
        if lr.need_flush() {
            self.flush();
        }
    }

    fn must_close(&mut self) {
        self.flush();
        if let Some(lr) = self.lr.take() {
            LogRows::put(lr);
        }
    }
}

impl<S: RowsSink> Drop for BatchProcessor<S> {
    fn drop(&mut self) {
        // Cancellation path: unflushed rows are discarded and the batch
        // goes back to the pool.
        if let Some(lr) = self.lr.take() {
            LogRows::put(lr);
        }
    }
}
