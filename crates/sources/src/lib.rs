//! Sawmill Sources - wire-format producers for the ingestion batch
//!
//! Each source decodes an external wire format into per-record `add_row`
//! calls on a [`sawmill_storage::LogMessageProcessor`], buffering nothing
//! beyond the current record. Request bodies arrive already uncompressed;
//! decompression and transport are external collaborators.
//!
//! The journald export source is the most intricate producer: a mixed
//! textual and length-prefixed binary wire format with name validation
//! and per-record timestamp resolution.

pub mod common;
pub mod journald;

pub use common::{SourceMetrics, SourceMetricsSnapshot};
