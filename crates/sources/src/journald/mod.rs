//! Journald Export Source
//!
//! Parses the systemd Journal Export Format into rows for the ingestion
//! batch.
//!
//! # Framing
//!
//! A record is a sequence of fields separated by single newlines; a blank
//! line terminates the record. Two field encodings exist:
//!
//! ```text
//! NAME=VALUE\n                          textual field
//! NAME\n<size: u64 le><size bytes>\n    binary field
//! ```
//!
//! Binary values may contain arbitrary bytes, including newlines and NULs.
//!
//! # Record resolution
//!
//! - The configured time field (default `__REALTIME_TIMESTAMP`, decimal
//!   microseconds since epoch) becomes the row timestamp and is not
//!   forwarded as a field. Records without one use the wall-clock time
//!   captured once at parse start.
//! - Names in the configured message list (default `MESSAGE`) are renamed
//!   to `_msg` before forwarding.
//! - Journald's own `__`-prefixed entry metadata is dropped unless
//!   `include_entry_metadata` is set.
//! - A record with no remaining fields is not emitted.
//!
//! # Errors
//!
//! Framing and validation failures are hard errors: the remainder of the
//! request is aborted, while rows already emitted on earlier record
//! boundaries stand.

mod config;
mod error;

#[cfg(test)]
#[path = "journald_test.rs"]
mod tests;

use std::time::{SystemTime, UNIX_EPOCH};

use sawmill_storage::{Field, LogMessageProcessor, MSG_FIELD_NAME};

use crate::common::SourceMetrics;

pub use config::JournaldSourceConfig;
pub use error::JournaldError;

/// Maximum journald field-name length, fixed by the journal file format.
pub const MAX_ENTRY_NAME_LEN: usize = 64;

/// Default field holding the record timestamp.
pub const DEFAULT_TIME_FIELD: &str = "__REALTIME_TIMESTAMP";

/// Default field names forwarded as the log message.
pub const DEFAULT_MSG_FIELDS: &[&str] = &["MESSAGE"];

/// Resolved per-request parse parameters.
///
/// Usually built from the source configuration with
/// [`JournaldSourceConfig::params`]; request-supplied values override the
/// configured defaults there.
#[derive(Debug, Clone)]
pub struct JournaldParams {
    /// Field holding the record timestamp, decimal microseconds since
    /// epoch.
    pub time_field: String,

    /// Names rewritten to `_msg` before forwarding.
    pub msg_fields: Vec<String>,

    /// Forward `__`-prefixed entry metadata instead of dropping it.
    pub include_entry_metadata: bool,
}

impl Default for JournaldParams {
    fn default() -> Self {
        Self {
            time_field: DEFAULT_TIME_FIELD.to_string(),
            msg_fields: DEFAULT_MSG_FIELDS.iter().map(|s| s.to_string()).collect(),
            include_entry_metadata: false,
        }
    }
}

/// Journald export source: the per-request parse entry point plus metrics.
#[derive(Debug, Default)]
pub struct JournaldSource {
    config: JournaldSourceConfig,
    metrics: SourceMetrics,
}

impl JournaldSource {
    /// Create a source from its configuration.
    pub fn new(config: JournaldSourceConfig) -> Self {
        Self {
            config,
            metrics: SourceMetrics::new(),
        }
    }

    /// Source configuration.
    pub fn config(&self) -> &JournaldSourceConfig {
        &self.config
    }

    /// Source metrics.
    pub fn metrics(&self) -> &SourceMetrics {
        &self.metrics
    }

    /// Parse one uncompressed request body into `lmp`.
    ///
    /// Returns the number of rows emitted.
    pub fn process(
        &self,
        data: &[u8],
        params: &JournaldParams,
        lmp: &mut dyn LogMessageProcessor,
    ) -> Result<usize, JournaldError> {
        self.metrics.record_request();
        self.metrics.record_bytes(data.len() as u64);

        if data.len() > self.config.max_request_size {
            self.metrics.record_error();
            return Err(JournaldError::RequestTooLarge {
                size: data.len(),
                max: self.config.max_request_size,
            });
        }

        match parse_journald_export(data, params, lmp) {
            Ok(rows) => {
                self.metrics.record_rows(rows as u64);
                Ok(rows)
            }
            Err(e) => {
                self.metrics.record_error();
                tracing::warn!(error = %e, "aborting journald request");
                Err(e)
            }
        }
    }
}

/// Parse a Journal Export Format buffer, feeding one `add_row` per record
/// to `lmp`.
///
/// Returns the number of rows emitted. Hard errors abort the remainder of
/// the request without retracting rows already emitted.
pub fn parse_journald_export(
    mut data: &[u8],
    params: &JournaldParams,
    lmp: &mut dyn LogMessageProcessor,
) -> Result<usize, JournaldError> {
    // Fallback for records carrying no time field, captured once so every
    // such record in the request gets the same timestamp.
    let fallback_ts = now_ns();

    let mut fields: Vec<Field<'_>> = Vec::new();
    let mut ts: Option<i64> = None;
    let mut rows = 0;

    while !data.is_empty() {
        let Some(nl) = data.iter().position(|&b| b == b'\n') else {
            return Err(JournaldError::MissingLineSeparator { unread: data.len() });
        };
        if nl == 0 {
            // Blank line: the record boundary.
            data = &data[1..];
            if !fields.is_empty() {
                lmp.add_row(ts.unwrap_or(fallback_ts), &fields, None);
                rows += 1;
                fields.clear();
            }
            ts = None;
            continue;
        }

        let line = &data[..nl];
        data = &data[nl + 1..];

        let (name_bytes, value) = match line.iter().position(|&b| b == b'=') {
            Some(eq) if eq > 0 => (&line[..eq], &line[eq + 1..]),
            _ => {
                // A bare name introduces a length-prefixed binary value.
                let (value, rest) = read_binary_value(line, data)?;
                data = rest;
                (line, value)
            }
        };

        if name_bytes.len() > MAX_ENTRY_NAME_LEN {
            return Err(JournaldError::name_too_long(name_bytes));
        }
        let name = validate_name(name_bytes)?;

        if name == params.time_field {
            ts = Some(parse_timestamp(value)?);
            continue;
        }

        let name = if params.msg_fields.iter().any(|m| m == name) {
            MSG_FIELD_NAME
        } else {
            name
        };

        if params.include_entry_metadata || !name.starts_with("__") {
            fields.push(Field::new(name, value));
        }
    }

    // End of input terminates the final record as if by blank line.
    if !fields.is_empty() {
        lmp.add_row(ts.unwrap_or(fallback_ts), &fields, None);
        rows += 1;
    }
    Ok(rows)
}

/// Read one length-prefixed binary value: a little-endian `u64` size, the
/// value bytes, and a single trailing newline.
fn read_binary_value<'a>(
    name: &[u8],
    data: &'a [u8],
) -> Result<(&'a [u8], &'a [u8]), JournaldError> {
    if data.is_empty() {
        return Err(JournaldError::missing_binary_size(name));
    }
    if data.len() < 8 {
        return Err(JournaldError::truncated_binary_size(name, data.len()));
    }
    let (size_bytes, rest) = data.split_at(8);
    let mut size_buf = [0u8; 8];
    size_buf.copy_from_slice(size_bytes);
    let size = u64::from_le_bytes(size_buf);

    if size == 0 {
        return Err(JournaldError::zero_binary_size(name));
    }
    if size > rest.len() as u64 {
        return Err(JournaldError::BinarySizeTooLarge {
            size,
            available: rest.len(),
        });
    }

    let (value, rest) = rest.split_at(size as usize);
    match rest.split_first() {
        Some((&b'\n', rest)) => Ok((value, rest)),
        Some((&got, _)) => Err(JournaldError::unexpected_binary_terminator(name, got)),
        None => Err(JournaldError::missing_binary_terminator(name)),
    }
}

/// Validate a journald field name against `[A-Z_][A-Z0-9_]*`.
///
/// The pattern is unanchored at the end and `[A-Z0-9_]*` matches zero
/// characters, so only the first byte is actually constrained; anything
/// after it passes through as-is.
fn validate_name(bytes: &[u8]) -> Result<&str, JournaldError> {
    let valid = match bytes.first() {
        Some(&first) => first.is_ascii_uppercase() || first == b'_',
        None => false,
    };
    if !valid {
        return Err(JournaldError::invalid_name(bytes));
    }
    std::str::from_utf8(bytes).map_err(|_| JournaldError::invalid_name(bytes))
}

/// Parse a time-field value: decimal microseconds since epoch, scaled to
/// nanoseconds.
fn parse_timestamp(value: &[u8]) -> Result<i64, JournaldError> {
    let micros: i64 = std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| JournaldError::invalid_timestamp(value))?;
    Ok(micros.wrapping_mul(1_000))
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}
