//! Journald source error types.

use thiserror::Error;

use super::MAX_ENTRY_NAME_LEN;

/// Hard failures while parsing a Journal Export Format request.
///
/// Any of these aborts the remainder of the request; rows already emitted
/// on earlier record boundaries are not retracted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JournaldError {
    /// Request body exceeds the configured size limit.
    #[error("request size {size} exceeds limit {max}")]
    RequestTooLarge { size: usize, max: usize },

    /// Non-empty trailing data with no newline separator.
    #[error("missing line separator, {unread} bytes of unread data left")]
    MissingLineSeparator { unread: usize },

    /// The buffer ended right after a bare field name.
    #[error("missing size prefix for binary value of field {name:?}")]
    MissingBinarySize { name: String },

    /// Fewer than 8 bytes left for the binary size prefix.
    #[error("truncated size prefix for binary value of field {name:?}: expected 8 bytes, got {available}")]
    TruncatedBinarySize { name: String, available: usize },

    /// The binary size prefix decoded to zero.
    #[error("zero-length binary value for field {name:?}")]
    ZeroBinarySize { name: String },

    /// The binary size prefix exceeds the remaining buffer.
    #[error("binary value size {size} exceeds the {available} bytes left in the buffer")]
    BinarySizeTooLarge { size: u64, available: usize },

    /// The buffer ended right after a binary value.
    #[error("missing newline terminator after binary value of field {name:?}")]
    MissingBinaryTerminator { name: String },

    /// A binary value was followed by something other than a newline.
    #[error("expected newline terminator after binary value of field {name:?}, got byte {got:#04x}")]
    UnexpectedBinaryTerminator { name: String, got: u8 },

    /// Field name longer than the journal format allows.
    #[error("field name is longer than {limit} bytes: {name:?}")]
    NameTooLong { name: String, limit: usize },

    /// Field name does not match `[A-Z_][A-Z0-9_]*`.
    #[error("field name {name:?} must match [A-Z_][A-Z0-9_]*")]
    InvalidName { name: String },

    /// Time-field value is not decimal microseconds.
    #[error("invalid value {value:?} for the timestamp field: expected decimal microseconds")]
    InvalidTimestamp { value: String },
}

impl JournaldError {
    pub(crate) fn missing_binary_size(name: &[u8]) -> Self {
        Self::MissingBinarySize {
            name: lossy(name),
        }
    }

    pub(crate) fn truncated_binary_size(name: &[u8], available: usize) -> Self {
        Self::TruncatedBinarySize {
            name: lossy(name),
            available,
        }
    }

    pub(crate) fn zero_binary_size(name: &[u8]) -> Self {
        Self::ZeroBinarySize {
            name: lossy(name),
        }
    }

    pub(crate) fn missing_binary_terminator(name: &[u8]) -> Self {
        Self::MissingBinaryTerminator {
            name: lossy(name),
        }
    }

    pub(crate) fn unexpected_binary_terminator(name: &[u8], got: u8) -> Self {
        Self::UnexpectedBinaryTerminator {
            name: lossy(name),
            got,
        }
    }

    pub(crate) fn name_too_long(name: &[u8]) -> Self {
        Self::NameTooLong {
            name: lossy(name),
            limit: MAX_ENTRY_NAME_LEN,
        }
    }

    pub(crate) fn invalid_name(name: &[u8]) -> Self {
        Self::InvalidName {
            name: lossy(name),
        }
    }

    pub(crate) fn invalid_timestamp(value: &[u8]) -> Self {
        Self::InvalidTimestamp {
            value: lossy(value),
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
