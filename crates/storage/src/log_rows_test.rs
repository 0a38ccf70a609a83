//! Tests for the ingestion batch.

use crate::{
    Field, LogRows, LogRowsSettings, OwnedField, TenantID, MAX_COLUMNS_PER_BLOCK,
    MAX_FIELD_NAME_SIZE, MAX_UNCOMPRESSED_BLOCK_SIZE,
};

fn settings(stream_fields: &[&str]) -> LogRowsSettings {
    LogRowsSettings {
        stream_fields: stream_fields.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

fn collect_row(lr: &LogRows, idx: usize) -> Vec<(String, Vec<u8>)> {
    lr.row_fields(idx)
        .map(|f| (f.name.to_string(), f.value.to_vec()))
        .collect()
}

// =============================================================================
// Basic ingestion tests
// =============================================================================

#[test]
fn test_basic_row() {
    let mut lr = LogRows::get(&settings(&["host"]));
    lr.must_add(
        TenantID::default(),
        1,
        &[Field::new("host", b"h1"), Field::new("_msg", b"hello")],
        None,
    );

    assert_eq!(lr.len(), 1);
    assert_eq!(lr.timestamps(), &[1]);
    // One ("host", "h1") pair in the canonical stream tags.
    assert_eq!(lr.stream_tags_canonical(0), b"\x01\x04host\x02h1");

    lr.sort_fields_in_rows();
    assert_eq!(
        collect_row(&lr, 0),
        vec![
            ("".to_string(), b"hello".to_vec()),
            ("host".to_string(), b"h1".to_vec()),
        ]
    );
    LogRows::put(lr);
}

#[test]
fn test_empty_value_dropped() {
    let mut lr = LogRows::get(&settings(&["host"]));
    lr.must_add(
        TenantID::default(),
        2,
        &[Field::new("host", b"h1"), Field::new("level", b"")],
        None,
    );

    assert_eq!(lr.len(), 1);
    let row = collect_row(&lr, 0);
    assert_eq!(row, vec![("host".to_string(), b"h1".to_vec())]);
    LogRows::put(lr);
}

#[test]
fn test_stream_identity_is_field_order_sensitive() {
    let mut lr = LogRows::get(&settings(&["a", "b"]));
    lr.must_add(
        TenantID::default(),
        1,
        &[Field::new("a", b"1"), Field::new("b", b"2")],
        None,
    );
    lr.must_add(
        TenantID::default(),
        2,
        &[Field::new("b", b"2"), Field::new("a", b"1")],
        None,
    );

    // Tags are added in input order, so the same logical pairs in a
    // different order name a different stream.
    assert_ne!(lr.stream_tags_canonical(0), lr.stream_tags_canonical(1));
    assert_ne!(lr.stream_ids()[0], lr.stream_ids()[1]);
    LogRows::put(lr);
}

// =============================================================================
// Adjacent-row interning tests
// =============================================================================

#[test]
fn test_adjacent_row_interning() {
    let mut lr = LogRows::get(&settings(&["host"]));
    let fields = [Field::new("host", b"h1"), Field::new("_msg", b"hello")];

    lr.must_add(TenantID::default(), 1, &fields, None);
    let after_first = lr.arena_len();
    lr.must_add(TenantID::default(), 2, &fields, None);

    assert_eq!(lr.len(), 2);
    // The second identical row reuses the first row's stored bytes.
    assert_eq!(lr.arena_len(), after_first);
    assert_eq!(lr.stream_tags_canonical(0), lr.stream_tags_canonical(1));
    assert_eq!(lr.stream_ids()[0], lr.stream_ids()[1]);
    assert_eq!(collect_row(&lr, 0), collect_row(&lr, 1));
    LogRows::put(lr);
}

#[test]
fn test_interning_survives_changed_values() {
    let mut lr = LogRows::get(&settings(&["host"]));
    lr.must_add(
        TenantID::default(),
        1,
        &[Field::new("host", b"h1"), Field::new("_msg", b"first")],
        None,
    );
    lr.must_add(
        TenantID::default(),
        2,
        &[Field::new("host", b"h1"), Field::new("_msg", b"second")],
        None,
    );

    assert_eq!(
        collect_row(&lr, 1),
        vec![
            ("host".to_string(), b"h1".to_vec()),
            ("".to_string(), b"second".to_vec()),
        ]
    );
    LogRows::put(lr);
}

// =============================================================================
// Per-row cap tests
// =============================================================================

#[test]
fn test_too_many_fields_dropped() {
    let names: Vec<String> = (0..=MAX_COLUMNS_PER_BLOCK).map(|i| format!("f{i}")).collect();
    let fields: Vec<Field<'_>> = names.iter().map(|n| Field::new(n.as_str(), b"v")).collect();

    let mut lr = LogRows::get(&LogRowsSettings::default());
    lr.must_add(TenantID::default(), 1, &fields, None);
    assert_eq!(lr.len(), 0);
    assert_eq!(lr.arena_len(), 0);

    // Subsequent valid entries still ingest.
    lr.must_add(TenantID::default(), 2, &[Field::new("_msg", b"ok")], None);
    assert_eq!(lr.len(), 1);
    LogRows::put(lr);
}

#[test]
fn test_long_field_name_dropped() {
    let name = "n".repeat(MAX_FIELD_NAME_SIZE + 1);
    let mut lr = LogRows::get(&LogRowsSettings::default());
    lr.must_add(TenantID::default(), 1, &[Field::new(&name, b"v")], None);
    assert_eq!(lr.len(), 0);
    LogRows::put(lr);
}

#[test]
fn test_oversized_row_dropped() {
    let value = vec![b'x'; MAX_UNCOMPRESSED_BLOCK_SIZE];
    let mut lr = LogRows::get(&LogRowsSettings::default());
    lr.must_add(TenantID::default(), 1, &[Field::new("payload", &value)], None);
    assert_eq!(lr.len(), 0);

    lr.must_add(TenantID::default(), 2, &[Field::new("_msg", b"ok")], None);
    assert_eq!(lr.len(), 1);
    LogRows::put(lr);
}

// =============================================================================
// Extra fields and default _msg tests
// =============================================================================

#[test]
fn test_extra_fields_override_client_fields() {
    let s = LogRowsSettings {
        stream_fields: vec!["env".to_string()],
        extra_fields: vec![
            OwnedField::new("env", "prod"),
            OwnedField::new("dc", "eu-1"),
        ],
        default_msg_value: "missing message".to_string(),
        ..Default::default()
    };
    let mut lr = LogRows::get(&s);
    lr.must_add(
        TenantID::default(),
        1,
        &[Field::new("env", b"staging"), Field::new("level", b"info")],
        None,
    );

    assert_eq!(lr.len(), 1);
    let row = collect_row(&lr, 0);
    assert!(row.contains(&("env".to_string(), b"prod".to_vec())));
    assert!(row.contains(&("dc".to_string(), b"eu-1".to_vec())));
    assert!(row.contains(&("".to_string(), b"missing message".to_vec())));
    assert!(row.contains(&("level".to_string(), b"info".to_vec())));
    assert!(!row.contains(&("env".to_string(), b"staging".to_vec())));

    // env reaches the stream identity through the extra field, not the
    // client-supplied value.
    assert_eq!(lr.stream_tags_canonical(0), b"\x01\x03env\x04prod");
    LogRows::put(lr);
}

#[test]
fn test_extra_msg_field_suppresses_default() {
    let s = LogRowsSettings {
        extra_fields: vec![OwnedField::new("_msg", "from-extra")],
        default_msg_value: "unused default".to_string(),
        ..Default::default()
    };
    let mut lr = LogRows::get(&s);
    lr.must_add(TenantID::default(), 1, &[Field::new("a", b"1")], None);

    let row = collect_row(&lr, 0);
    assert_eq!(
        row,
        vec![
            ("a".to_string(), b"1".to_vec()),
            ("".to_string(), b"from-extra".to_vec()),
        ]
    );
    LogRows::put(lr);
}

#[test]
fn test_ignored_msg_gets_default() {
    let s = LogRowsSettings {
        ignore_fields: vec!["_msg".to_string()],
        default_msg_value: "none".to_string(),
        ..Default::default()
    };
    let mut lr = LogRows::get(&s);
    lr.must_add(
        TenantID::default(),
        1,
        &[Field::new("_msg", b"dropped"), Field::new("k", b"v")],
        None,
    );

    let row = collect_row(&lr, 0);
    assert_eq!(
        row,
        vec![
            ("k".to_string(), b"v".to_vec()),
            ("".to_string(), b"none".to_vec()),
        ]
    );
    LogRows::put(lr);
}

#[test]
fn test_ignore_fields_wildcard() {
    let s = LogRowsSettings {
        ignore_fields: vec!["trace_*".to_string()],
        ..Default::default()
    };
    let mut lr = LogRows::get(&s);
    lr.must_add(
        TenantID::default(),
        1,
        &[
            Field::new("trace_id", b"abc"),
            Field::new("trace_span", b"def"),
            Field::new("_msg", b"m"),
        ],
        None,
    );

    assert_eq!(collect_row(&lr, 0), vec![("".to_string(), b"m".to_vec())]);
    LogRows::put(lr);
}

// =============================================================================
// Stream-fields override tests
// =============================================================================

#[test]
fn test_stream_fields_override() {
    let mut lr = LogRows::get(&settings(&["host"]));
    lr.must_add(
        TenantID::default(),
        1,
        &[Field::new("host", b"h1")],
        Some(&[Field::new("app", b"api")]),
    );

    assert_eq!(lr.stream_tags_canonical(0), b"\x01\x03app\x03api");
    LogRows::put(lr);
}

#[test]
fn test_stream_fields_override_respects_ignore_filter() {
    let s = LogRowsSettings {
        stream_fields: vec!["host".to_string()],
        ignore_fields: vec!["secret*".to_string()],
        ..Default::default()
    };
    let mut lr = LogRows::get(&s);
    lr.must_add(
        TenantID::default(),
        1,
        &[Field::new("_msg", b"m")],
        Some(&[Field::new("secret_key", b"v"), Field::new("app", b"api")]),
    );

    assert_eq!(lr.stream_tags_canonical(0), b"\x01\x03app\x03api");
    LogRows::put(lr);
}

// =============================================================================
// Sort tests
// =============================================================================

#[test]
fn test_sort_rows_orders_by_stream_then_time() {
    let mut lr = LogRows::get(&settings(&["host"]));
    for (host, ts) in [("b", 5), ("a", 9), ("a", 3), ("b", 1), ("a", 7)] {
        lr.must_add(
            TenantID::default(),
            ts,
            &[Field::new("host", host.as_bytes()), Field::new("_msg", b"m")],
            None,
        );
    }

    lr.sort_rows();

    let keys: Vec<_> = (0..lr.len())
        .map(|i| (lr.stream_ids()[i], lr.timestamps()[i]))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    // No row content was lost or duplicated; streams stay contiguous with
    // ascending timestamps.
    assert_eq!(lr.len(), 5);
    let seq: Vec<(Vec<u8>, i64)> = (0..lr.len())
        .map(|i| {
            let host = lr
                .row_fields(i)
                .find(|f| f.name == "host")
                .unwrap()
                .value
                .to_vec();
            (host, lr.timestamps()[i])
        })
        .collect();
    let host_a: Vec<i64> = seq
        .iter()
        .filter(|(h, _)| h == b"a")
        .map(|(_, t)| *t)
        .collect();
    let host_b: Vec<i64> = seq
        .iter()
        .filter(|(h, _)| h == b"b")
        .map(|(_, t)| *t)
        .collect();
    assert_eq!(host_a, vec![3, 7, 9]);
    assert_eq!(host_b, vec![1, 5]);
    LogRows::put(lr);
}

#[test]
fn test_sort_rows_tenant_dominates_hash() {
    let mut lr = LogRows::get(&settings(&["host"]));
    lr.must_add(TenantID::new(1, 0), 1, &[Field::new("host", b"z")], None);
    lr.must_add(TenantID::new(0, 0), 2, &[Field::new("host", b"a")], None);

    lr.sort_rows();
    assert_eq!(lr.stream_ids()[0].tenant_id, TenantID::new(0, 0));
    assert_eq!(lr.stream_ids()[1].tenant_id, TenantID::new(1, 0));
    LogRows::put(lr);
}

#[test]
fn test_sort_fields_in_rows_is_stable_by_name() {
    let mut lr = LogRows::get(&LogRowsSettings::default());
    lr.must_add(
        TenantID::default(),
        1,
        &[
            Field::new("zeta", b"1"),
            Field::new("_msg", b"m"),
            Field::new("alpha", b"2"),
        ],
        None,
    );

    lr.sort_fields_in_rows();
    let names: Vec<String> = lr.row_fields(0).map(|f| f.name.to_string()).collect();
    assert_eq!(names, vec!["", "alpha", "zeta"]);
    LogRows::put(lr);
}

// =============================================================================
// Reset and flush tests
// =============================================================================

#[test]
fn test_reset_keep_settings_behaves_like_fresh() {
    let s = settings(&["host"]);
    let row = [Field::new("host", b"h1"), Field::new("_msg", b"x")];

    let mut lr = LogRows::get(&s);
    lr.must_add(TenantID::default(), 1, &row, None);
    lr.reset_keep_settings();
    assert_eq!(lr.len(), 0);
    assert_eq!(lr.arena_len(), 0);

    lr.must_add(TenantID::default(), 1, &row, None);

    let mut fresh = LogRows::get(&s);
    fresh.must_add(TenantID::default(), 1, &row, None);

    assert_eq!(collect_row(&lr, 0), collect_row(&fresh, 0));
    assert_eq!(lr.stream_tags_canonical(0), fresh.stream_tags_canonical(0));
    assert_eq!(lr.stream_ids()[0], fresh.stream_ids()[0]);
    LogRows::put(fresh);
    LogRows::put(lr);
}

#[test]
fn test_full_reset_clears_settings() {
    let s = LogRowsSettings {
        stream_fields: vec!["host".to_string()],
        extra_fields: vec![OwnedField::new("dc", "eu-1")],
        default_msg_value: "dflt".to_string(),
        ..Default::default()
    };
    let mut lr = LogRows::get(&s);
    lr.reset();

    // After a full reset the batch behaves as if unconfigured.
    lr.must_add(TenantID::default(), 1, &[Field::new("host", b"h1")], None);
    assert_eq!(lr.stream_tags_canonical(0), b"\x00");
    assert_eq!(collect_row(&lr, 0), vec![("host".to_string(), b"h1".to_vec())]);
    LogRows::put(lr);
}

#[test]
fn test_need_flush_after_arena_threshold() {
    let mut lr = LogRows::get(&LogRowsSettings::default());
    assert!(!lr.need_flush());

    let mut i = 0u32;
    while !lr.need_flush() {
        assert!(i < 100, "need_flush never tripped");
        let value = vec![b'a' + (i % 26) as u8; 256 * 1024];
        lr.must_add(
            TenantID::default(),
            i64::from(i),
            &[Field::new("payload", &value)],
            None,
        );
        i += 1;
    }

    assert!(lr.arena_len() > (MAX_UNCOMPRESSED_BLOCK_SIZE / 8) * 7);
    assert!(lr.need_flush());
    lr.reset_keep_settings();
    assert!(!lr.need_flush());
    LogRows::put(lr);
}

// =============================================================================
// Rendering tests
// =============================================================================

#[test]
fn test_row_json_rendering() {
    let mut lr = LogRows::get(&settings(&["host"]));
    lr.must_add(
        TenantID::default(),
        1_700_000_000_000_000_000,
        &[Field::new("host", b"h1"), Field::new("_msg", b"hello")],
        None,
    );

    let json = lr.row_json(0);
    assert!(json.contains(r#""_msg":"hello""#));
    assert!(json.contains(r#""host":"h1""#));
    assert!(json.contains("2023-11-14T22:13:20"));
    assert!(json.contains(r#""_stream""#));
    assert!(json.contains("host="));
    LogRows::put(lr);
}
