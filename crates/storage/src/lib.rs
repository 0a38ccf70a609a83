//! Sawmill Storage - The log-row ingestion batch
//!
//! This crate provides the in-memory front-end of the Sawmill columnar log
//! store: the types that accept batches of structured log entries, derive a
//! stream identity from a configurable field subset, validate and intern row
//! content into compact arena-backed storage, and hand a sort-ready batch to
//! the downstream block writer.
//!
//! - `LogRows` - the central batch: validation, field interning, stream
//!   hashing, and the `(stream_id, timestamp)` sort order
//! - `StreamTags` / `StreamID` - stream identity and its canonical encoding
//! - `Arena` - append-only byte storage reclaimed in one reset
//! - `FieldsFilter` - literal + prefix-wildcard field-name filter
//! - `LogMessageProcessor` - the narrow sink contract between wire-format
//!   parsers and the batch
//!
//! # Design Principles
//!
//! - **No allocations in the steady state**: batches, stream tags, and
//!   scratch buffers come from lock-free pools; adjacent-row interning makes
//!   repeated rows free
//! - **Index-based views**: rows hold arena handles, not borrows, so a batch
//!   can keep growing while earlier rows stay addressable
//! - **Bounded loss**: a row that violates the per-row caps is dropped with
//!   a warning; the rest of the request keeps ingesting

mod arena;
mod field;
mod fields_filter;
mod log_rows;
mod pool;
mod processor;
mod stream_id;
mod stream_tags;

pub use arena::{Arena, ArenaRef};
pub use field::{estimated_json_row_len, marshal_fields_to_json, Field, OwnedField};
pub use fields_filter::FieldsFilter;
pub use log_rows::{LogRows, LogRowsSettings};
pub use pool::{get_stream_tags, put_stream_tags};
pub use processor::{BatchProcessor, LogMessageProcessor, RowsSink};
pub use stream_id::{hash128, StreamID, TenantID, TenantIDParseError};
pub use stream_tags::StreamTags;

/// Field name that denotes the log message.
///
/// Stored internally under the empty name; rendered back as `_msg` on
/// output.
pub const MSG_FIELD_NAME: &str = "_msg";

/// Maximum number of fields a single log entry may carry.
///
/// Fixed by wire compatibility with the block format; entries above the
/// limit are dropped at ingestion.
pub const MAX_COLUMNS_PER_BLOCK: usize = 2_000;

/// Maximum length of a field name in bytes.
pub const MAX_FIELD_NAME_SIZE: usize = 128;

/// Soft cap on the uncompressed size of a storage block, in bytes.
///
/// Drives both per-row admission (an entry whose estimated JSON size
/// exceeds the cap is dropped) and the [`LogRows::need_flush`] backpressure
/// signal.
pub const MAX_UNCOMPRESSED_BLOCK_SIZE: usize = 2 * 1024 * 1024;

#[cfg(test)]
mod log_rows_test;
