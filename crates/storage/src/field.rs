//! Log field types and row-size accounting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::MSG_FIELD_NAME;

/// A single log field: a name and a value.
///
/// Names are UTF-8 strings; values are arbitrary bytes (binary journald
/// values may contain NUL and newline bytes). The special name `_msg`
/// denotes the log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    /// Field name.
    pub name: &'a str,
    /// Field value.
    pub value: &'a [u8],
}

impl<'a> Field<'a> {
    /// Create a field from a name and a raw value.
    #[inline]
    pub const fn new(name: &'a str, value: &'a [u8]) -> Self {
        Self { name, value }
    }
}

/// An owned field, used for configuration-supplied extra fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: String,
}

impl OwnedField {
    /// Create an owned field.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Borrow as a [`Field`].
    #[inline]
    pub fn as_field(&self) -> Field<'_> {
        Field::new(&self.name, self.value.as_bytes())
    }
}

/// Length of an RFC 3339 timestamp with nanosecond precision and a numeric
/// zone offset, e.g. `2006-01-02T15:04:05.999999999+07:00`.
const RFC3339_NANO_LEN: usize = 35;

/// Approximate length of a log entry with the given fields if represented
/// as a JSON line.
///
/// Used for admission accounting against
/// [`MAX_UNCOMPRESSED_BLOCK_SIZE`](crate::MAX_UNCOMPRESSED_BLOCK_SIZE);
/// the estimate includes the `_time` field added at query time.
pub fn estimated_json_row_len(fields: &[Field<'_>]) -> usize {
    let mut n = "{}\n".len() + r#""_time":"""#.len() + 2 + RFC3339_NANO_LEN;
    for f in fields {
        // An empty name renders as `_msg`, so short names cost at least
        // that much.
        n += r#","":"""#.len() + f.name.len().max(MSG_FIELD_NAME.len()) + f.value.len();
    }
    n
}

/// Render `fields` as a JSON object string.
///
/// The empty name renders as `_msg`; non-UTF-8 value bytes are replaced.
/// Used for drop warnings and debugging output, not for the wire.
pub fn marshal_fields_to_json(fields: &[Field<'_>]) -> String {
    let mut obj = Map::new();
    for f in fields {
        let name = if f.name.is_empty() { MSG_FIELD_NAME } else { f.name };
        obj.insert(
            name.to_string(),
            Value::String(String::from_utf8_lossy(f.value).into_owned()),
        );
    }
    Value::Object(obj).to_string()
}
