//! Stream tags and their canonical wire encoding.
//!
//! A log stream is identified by the 128-bit hash of the canonical
//! marshalling of its tags. The canonical form is the hash pre-image, so
//! its byte layout must stay stable across versions; any change is a
//! breaking stream-identity change.

use bytes::{BufMut, BytesMut};

/// Ordered multiset of `(name, value)` pairs defining a log stream.
///
/// Tags are kept in insertion order and the canonical form is
/// order-sensitive: callers must add stream fields in a stable order for
/// equal logical streams to hash identically. The batch adds tags in the
/// order the fields appear in the input row and never sorts them, so
/// stream identity depends on producer-side field order.
///
/// Obtain instances from the pool with
/// [`get_stream_tags`](crate::get_stream_tags) and return them with
/// [`put_stream_tags`](crate::put_stream_tags).
#[derive(Debug, Default)]
pub struct StreamTags {
    tags: Vec<StreamTag>,
}

#[derive(Debug, Default)]
struct StreamTag {
    name: String,
    value: Vec<u8>,
}

impl StreamTags {
    /// Create an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `(name, value)` pair.
    pub fn add(&mut self, name: &str, value: &[u8]) {
        self.tags.push(StreamTag {
            name: name.to_string(),
            value: value.to_vec(),
        });
    }

    /// Number of pairs added.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Check whether no pairs were added.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Append the canonical form to `dst`.
    ///
    /// Layout: `uvarint(count)`, then for each pair in insertion order
    /// `uvarint(len(name)) name uvarint(len(value)) value`. Byte-for-byte
    /// deterministic for a given insertion sequence.
    pub fn marshal_canonical(&self, dst: &mut BytesMut) {
        put_uvarint(dst, self.tags.len() as u64);
        for tag in &self.tags {
            put_uvarint(dst, tag.name.len() as u64);
            dst.put_slice(tag.name.as_bytes());
            put_uvarint(dst, tag.value.len() as u64);
            dst.put_slice(&tag.value);
        }
    }

    /// Drop all pairs.
    pub fn reset(&mut self) {
        self.tags.clear();
    }
}

/// Append `v` to `dst` as an LEB128 unsigned varint.
pub(crate) fn put_uvarint(dst: &mut BytesMut, mut v: u64) {
    while v >= 0x80 {
        dst.put_u8(v as u8 | 0x80);
        v >>= 7;
    }
    dst.put_u8(v as u8);
}

/// Read an LEB128 unsigned varint from the front of `data`.
///
/// Returns the value and the remaining bytes, or `None` if `data` is
/// truncated or the varint is longer than 10 bytes.
pub(crate) fn read_uvarint(data: &[u8]) -> Option<(u64, &[u8])> {
    let mut v: u64 = 0;
    for (i, &b) in data.iter().enumerate().take(10) {
        v |= u64::from(b & 0x7f) << (7 * i);
        if b < 0x80 {
            return Some((v, &data[i + 1..]));
        }
    }
    None
}

/// Render canonical stream-tag bytes as `{name="value",...}`.
///
/// Used for debugging output; returns `"{}"` shaped output on a best-effort
/// basis and stops at the first malformed pair.
pub(crate) fn canonical_tags_string(canonical: &[u8]) -> String {
    let mut out = String::from("{");
    let mut first = true;
    if let Some((count, mut rest)) = read_uvarint(canonical) {
        for _ in 0..count {
            let Some((name, value, tail)) = read_tag(rest) else {
                break;
            };
            rest = tail;
            if !first {
                out.push(',');
            }
            first = false;
            out.push_str(&String::from_utf8_lossy(name));
            out.push_str("=\"");
            out.push_str(&String::from_utf8_lossy(value));
            out.push('"');
        }
    }
    out.push('}');
    out
}

fn read_tag(data: &[u8]) -> Option<(&[u8], &[u8], &[u8])> {
    let (name_len, rest) = read_uvarint(data)?;
    let name = rest.get(..name_len as usize)?;
    let rest = &rest[name_len as usize..];
    let (value_len, rest) = read_uvarint(rest)?;
    let value = rest.get(..value_len as usize)?;
    Some((name, value, &rest[value_len as usize..]))
}
