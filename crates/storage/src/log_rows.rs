//! The ingestion batch: validated, interned rows awaiting block flush.

use std::collections::HashSet;

use chrono::SecondsFormat;
use serde_json::{Map, Value};

use crate::arena::{Arena, ArenaRef};
use crate::field::{estimated_json_row_len, marshal_fields_to_json, Field, OwnedField};
use crate::fields_filter::FieldsFilter;
use crate::pool;
use crate::stream_id::{StreamID, TenantID};
use crate::stream_tags::canonical_tags_string;
use crate::{
    MAX_COLUMNS_PER_BLOCK, MAX_FIELD_NAME_SIZE, MAX_UNCOMPRESSED_BLOCK_SIZE, MSG_FIELD_NAME,
};

/// A field stored inside a batch, as handles into the batch arena.
#[derive(Debug, Clone, Copy, Default)]
struct StoredField {
    name: ArenaRef,
    value: ArenaRef,
}

/// Bounds of one row's fields inside the shared field buffer.
#[derive(Debug, Clone, Copy, Default)]
struct RowSpan {
    start: u32,
    end: u32,
}

impl RowSpan {
    #[inline]
    fn range(self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }

    #[inline]
    fn len(self) -> usize {
        (self.end - self.start) as usize
    }
}

/// Settings fixed for the lifetime of a pooled batch.
///
/// Applied once at [`LogRows::get`] and kept across
/// [`LogRows::reset_keep_settings`].
#[derive(Debug, Clone, Default)]
pub struct LogRowsSettings {
    /// Field names that participate in stream identity by default.
    pub stream_fields: Vec<String>,

    /// Field names dropped at ingestion; entries may end in `*` to match a
    /// prefix. Matching fields are also excluded from stream derivation.
    pub ignore_fields: Vec<String>,

    /// Fields appended to every row. Their names are forced into the
    /// ignore filter so clients cannot override them.
    pub extra_fields: Vec<OwnedField>,

    /// Value substituted for `_msg` when a row ends up without one.
    /// Empty disables the substitution.
    pub default_msg_value: String,
}

/// In-memory accumulator of log rows awaiting flush to the block writer.
///
/// A batch is single-owner between [`LogRows::get`] and [`LogRows::put`];
/// no synchronization happens on per-batch state. All row bytes live in
/// the batch arena: rows hold handles, and external consumers must copy
/// out before the next reset.
#[derive(Debug, Default)]
pub struct LogRows {
    /// Backing storage for every string referenced by the batch.
    arena: Arena,

    /// All rows' fields, flat; rows record spans into this buffer.
    fields_buf: Vec<StoredField>,

    /// Per-row stream ids.
    stream_ids: Vec<StreamID>,

    /// Per-row canonical stream tags. Consecutive rows of one stream share
    /// a single stored copy.
    stream_tags_canonicals: Vec<ArenaRef>,

    /// Per-row timestamps, nanoseconds since epoch.
    timestamps: Vec<i64>,

    /// Per-row spans into `fields_buf`.
    rows: Vec<RowSpan>,

    // Settings, fixed between get() and put().
    stream_fields: HashSet<String>,
    ignore_fields: FieldsFilter,
    extra_fields: Vec<OwnedField>,
    extra_stream_fields: Vec<OwnedField>,
    default_msg_value: String,
}

impl LogRows {
    /// Acquire a batch from the process-wide pool, configured with
    /// `settings`.
    ///
    /// Return it with [`LogRows::put`] when no longer needed.
    pub fn get(settings: &LogRowsSettings) -> LogRows {
        let mut lr = pool::log_rows_pool().get();
        lr.apply_settings(settings);
        lr
    }

    /// Fully reset `lr` and return it to the process-wide pool.
    pub fn put(lr: LogRows) {
        pool::log_rows_pool().put(lr);
    }

    fn apply_settings(&mut self, settings: &LogRowsSettings) {
        self.ignore_fields.add_multi(&settings.ignore_fields);
        // Extra fields override client-supplied fields of the same name,
        // so their names join the ignore filter.
        for f in &settings.extra_fields {
            self.ignore_fields.add(&f.name);
        }

        for name in &settings.stream_fields {
            if !self.ignore_fields.matches(name) {
                self.stream_fields.insert(name.clone());
            }
        }

        // Extra fields that are configured stream fields participate in
        // stream derivation on their own and leave the default set, so
        // they are not counted twice.
        for f in &settings.extra_fields {
            if settings.stream_fields.iter().any(|n| n == &f.name) {
                self.stream_fields.remove(&f.name);
                self.extra_stream_fields.push(f.clone());
            }
        }

        self.extra_fields = settings.extra_fields.clone();
        self.default_msg_value = settings.default_msg_value.clone();
    }

    /// Append one log entry.
    ///
    /// When `stream_fields_override` is `Some`, those pairs replace the
    /// configured stream fields for this entry's stream identity.
    ///
    /// All argument bytes are copied; callers may reuse their buffers
    /// after the call returns. Never fails: an entry that exceeds the
    /// per-row caps is dropped with a warning so the rest of the request
    /// keeps ingesting.
    pub fn must_add(
        &mut self,
        tenant_id: TenantID,
        timestamp: i64,
        fields: &[Field<'_>],
        stream_fields_override: Option<&[Field<'_>]>,
    ) {
        if fields.len() > MAX_COLUMNS_PER_BLOCK {
            tracing::warn!(
                field_count = fields.len(),
                limit = MAX_COLUMNS_PER_BLOCK,
                row = %marshal_fields_to_json(fields),
                "ignoring log entry with too many fields; see docs/limits.md#fields-per-entry"
            );
            return;
        }
        for f in fields {
            if f.name.len() > MAX_FIELD_NAME_SIZE {
                tracing::warn!(
                    field_name = f.name,
                    name_len = f.name.len(),
                    limit = MAX_FIELD_NAME_SIZE,
                    row = %marshal_fields_to_json(fields),
                    "ignoring log entry with too long field name; see docs/limits.md#field-name-length"
                );
                return;
            }
        }
        let row_len = estimated_json_row_len(fields);
        if row_len > MAX_UNCOMPRESSED_BLOCK_SIZE {
            tracing::warn!(
                row_len,
                limit = MAX_UNCOMPRESSED_BLOCK_SIZE,
                row = %marshal_fields_to_json(fields),
                "ignoring too long log entry; see docs/limits.md#entry-length"
            );
            return;
        }

        // Assemble the stream tags for this entry.
        let mut st = pool::get_stream_tags();
        match stream_fields_override {
            Some(stream_fields) => {
                for f in stream_fields {
                    if !self.ignore_fields.matches(f.name) {
                        st.add(f.name, f.value);
                    }
                }
            }
            None => {
                for f in fields {
                    if self.stream_fields.contains(f.name) {
                        st.add(f.name, f.value);
                    }
                }
                for f in &self.extra_stream_fields {
                    st.add(&f.name, f.value.as_bytes());
                }
            }
        }

        let mut canonical = pool::get_scratch_buf();
        st.marshal_canonical(&mut canonical);
        pool::put_stream_tags(st);

        let sid = StreamID::new(tenant_id, &canonical);
        self.add_internal(sid, timestamp, fields, &canonical);
        pool::put_scratch_buf(canonical);
    }

    fn add_internal(
        &mut self,
        sid: StreamID,
        timestamp: i64,
        fields: &[Field<'_>],
        canonical: &[u8],
    ) {
        // Run-length intern of the canonical stream tags: consecutive rows
        // of one stream share a single stored copy.
        let canonical_ref = match self.stream_tags_canonicals.last().copied() {
            Some(prev) if self.arena.bytes(prev) == canonical => prev,
            _ => self.arena.copy_bytes(canonical),
        };
        self.stream_tags_canonicals.push(canonical_ref);

        self.stream_ids.push(sid);
        self.timestamps.push(timestamp);

        let (prev_start, prev_len) = match self.rows.last() {
            Some(span) => (span.start as usize, span.len()),
            None => (0, 0),
        };
        let row_start = self.fields_buf.len();

        {
            let Self {
                ref mut arena,
                ref mut fields_buf,
                ref ignore_fields,
                ref extra_fields,
                ref default_msg_value,
                ..
            } = *self;

            let mut appender = RowAppender {
                arena,
                fields_buf,
                prev_start,
                prev_len,
                pos: 0,
                prev_valid: true,
            };

            let mut has_msg = false;
            for f in fields {
                if ignore_fields.matches(f.name) {
                    continue;
                }
                if f.value.is_empty() {
                    // Skip fields without values.
                    continue;
                }
                let name = if f.name == MSG_FIELD_NAME {
                    has_msg = true;
                    ""
                } else {
                    f.name
                };
                appender.append(name, f.value);
            }

            for f in extra_fields {
                if f.value.is_empty() {
                    continue;
                }
                let name = if f.name == MSG_FIELD_NAME {
                    has_msg = true;
                    ""
                } else {
                    f.name.as_str()
                };
                appender.append(name, f.value.as_bytes());
            }

            // Optional default _msg field.
            if !has_msg && !default_msg_value.is_empty() {
                appender.append("", default_msg_value.as_bytes());
            }
        }

        self.rows.push(RowSpan {
            start: row_start as u32,
            end: self.fields_buf.len() as u32,
        });
    }

    /// Number of rows accepted into the batch.
    pub fn len(&self) -> usize {
        self.stream_ids.len()
    }

    /// Check whether the batch holds no rows.
    pub fn is_empty(&self) -> bool {
        self.stream_ids.is_empty()
    }

    /// True once the batch holds too much data and should be flushed.
    ///
    /// Trips when arena usage crosses 7/8 of the uncompressed block cap
    /// and stays true until the next reset. This is the sole backpressure
    /// signal; acting on it is the caller's decision.
    pub fn need_flush(&self) -> bool {
        self.arena.len() > (MAX_UNCOMPRESSED_BLOCK_SIZE / 8) * 7
    }

    /// Current arena usage in bytes.
    pub(crate) fn arena_len(&self) -> usize {
        self.arena.len()
    }

    /// Per-row timestamps, nanoseconds since epoch.
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Per-row stream ids.
    pub fn stream_ids(&self) -> &[StreamID] {
        &self.stream_ids
    }

    /// Canonical stream-tag bytes of row `idx`.
    pub fn stream_tags_canonical(&self, idx: usize) -> &[u8] {
        self.arena.bytes(self.stream_tags_canonicals[idx])
    }

    /// Fields of row `idx`, in stored order.
    pub fn row_fields(&self, idx: usize) -> impl Iterator<Item = Field<'_>> {
        self.fields_buf[self.rows[idx].range()]
            .iter()
            .map(|sf| Field::new(self.arena.str(sf.name), self.arena.bytes(sf.value)))
    }

    /// Render row `idx` as a JSON object string, with the timestamp under
    /// `_time` and the stream tags under `_stream`.
    pub fn row_json(&self, idx: usize) -> String {
        let mut obj = Map::new();
        for f in self.row_fields(idx) {
            let name = if f.name.is_empty() { MSG_FIELD_NAME } else { f.name };
            obj.insert(
                name.to_string(),
                Value::String(String::from_utf8_lossy(f.value).into_owned()),
            );
        }
        let time = chrono::DateTime::from_timestamp_nanos(self.timestamps[idx])
            .to_rfc3339_opts(SecondsFormat::Nanos, true);
        obj.insert("_time".to_string(), Value::String(time));
        obj.insert(
            "_stream".to_string(),
            Value::String(canonical_tags_string(self.stream_tags_canonical(idx))),
        );
        Value::Object(obj).to_string()
    }

    /// Sort rows by `(stream_id, timestamp)`.
    ///
    /// Permutes the row-parallel vectors in lockstep; fields within each
    /// row keep their stored order (see [`LogRows::sort_fields_in_rows`]).
    pub fn sort_rows(&mut self) {
        let mut order: Vec<u32> = (0..self.len() as u32).collect();
        order.sort_by_key(|&i| (self.stream_ids[i as usize], self.timestamps[i as usize]));

        let stream_ids = order.iter().map(|&i| self.stream_ids[i as usize]).collect();
        let timestamps = order.iter().map(|&i| self.timestamps[i as usize]).collect();
        let canonicals = order
            .iter()
            .map(|&i| self.stream_tags_canonicals[i as usize])
            .collect();
        let rows = order.iter().map(|&i| self.rows[i as usize]).collect();

        self.stream_ids = stream_ids;
        self.timestamps = timestamps;
        self.stream_tags_canonicals = canonicals;
        self.rows = rows;
    }

    /// Sort each row's fields by name, ascending and stable.
    ///
    /// Runs once per batch, right before the flush to the block writer.
    pub fn sort_fields_in_rows(&mut self) {
        let Self {
            ref arena,
            ref mut fields_buf,
            ref rows,
            ..
        } = *self;
        for span in rows {
            let row = &mut fields_buf[span.range()];
            row.sort_by(|a, b| arena.bytes(a.name).cmp(arena.bytes(b.name)));
        }
    }

    /// Drop all rows while keeping the settings passed to
    /// [`LogRows::get`]. Capacities are retained for reuse.
    pub fn reset_keep_settings(&mut self) {
        self.arena.reset();
        self.fields_buf.clear();
        self.stream_ids.clear();
        self.stream_tags_canonicals.clear();
        self.timestamps.clear();
        self.rows.clear();
    }

    /// Drop all rows and settings.
    pub fn reset(&mut self) {
        self.reset_keep_settings();
        self.stream_fields.clear();
        self.ignore_fields.reset();
        self.extra_fields.clear();
        self.extra_stream_fields.clear();
        self.default_msg_value.clear();
    }
}

/// Appends one row's fields with positional adjacent-row interning.
///
/// Each accepted field is compared against the field at the same position
/// in the previous row; byte-equal names and values reuse the previous
/// row's arena handles instead of copying. The first positional name
/// mismatch disables reuse for the rest of the row. A missed reuse is a
/// correctness no-op.
struct RowAppender<'a> {
    arena: &'a mut Arena,
    fields_buf: &'a mut Vec<StoredField>,
    prev_start: usize,
    prev_len: usize,
    /// Index into the accepted-field stream of the current row.
    pos: usize,
    prev_valid: bool,
}

impl RowAppender<'_> {
    fn append(&mut self, name: &str, value: &[u8]) {
        let prev = if self.prev_valid && self.pos < self.prev_len {
            Some(self.fields_buf[self.prev_start + self.pos])
        } else {
            None
        };

        let name_ref = match prev {
            Some(p) if self.arena.bytes(p.name) == name.as_bytes() => p.name,
            _ => {
                self.prev_valid = false;
                self.arena.copy_str(name)
            }
        };
        let value_ref = match prev {
            Some(p) if self.arena.bytes(p.value) == value => p.value,
            _ => self.arena.copy_bytes(value),
        };

        self.fields_buf.push(StoredField {
            name: name_ref,
            value: value_ref,
        });
        self.pos += 1;
    }
}
