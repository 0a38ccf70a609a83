//! Journald source configuration.

use serde::Deserialize;

use sawmill_storage::{LogRowsSettings, TenantID, TenantIDParseError};

use super::{JournaldParams, DEFAULT_MSG_FIELDS, DEFAULT_TIME_FIELD};

/// Default maximum request size (64 MiB).
const DEFAULT_MAX_REQUEST_SIZE: usize = 64 * 1024 * 1024;

/// Journald source configuration.
///
/// # Example
///
/// ```toml
/// [sources.journald]
/// stream_fields = ["_HOSTNAME", "_SYSTEMD_UNIT"]
/// ignore_fields = ["_BOOT_ID", "SYSLOG_*"]
/// tenant_id = "0:0"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JournaldSourceConfig {
    /// Fields used as the log stream identity by default.
    pub stream_fields: Vec<String>,

    /// Fields dropped at ingestion; entries may end in `*` to match a
    /// prefix.
    pub ignore_fields: Vec<String>,

    /// Field holding the record timestamp, decimal microseconds since
    /// epoch. A request-supplied time field overrides this default.
    /// Default: `__REALTIME_TIMESTAMP`.
    pub time_field: String,

    /// Tenant for ingested logs, as `"account:project"`.
    /// Default: `"0:0"`.
    pub tenant_id: String,

    /// Forward journald's own `__`-prefixed entry metadata fields.
    /// Default: false.
    pub include_entry_metadata: bool,

    /// Maximum size in bytes of a single uncompressed request.
    /// Default: 64 MiB.
    pub max_request_size: usize,
}

impl Default for JournaldSourceConfig {
    fn default() -> Self {
        Self {
            stream_fields: Vec::new(),
            ignore_fields: Vec::new(),
            time_field: DEFAULT_TIME_FIELD.to_string(),
            tenant_id: "0:0".to_string(),
            include_entry_metadata: false,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
        }
    }
}

impl JournaldSourceConfig {
    /// Parse the configured tenant.
    pub fn tenant_id(&self) -> Result<TenantID, TenantIDParseError> {
        self.tenant_id.parse()
    }

    /// Parse parameters for one request.
    ///
    /// The configured time field is a default; a request-supplied value
    /// takes precedence when present.
    pub fn params(&self, time_field_override: Option<&str>) -> JournaldParams {
        JournaldParams {
            time_field: time_field_override.unwrap_or(&self.time_field).to_string(),
            msg_fields: DEFAULT_MSG_FIELDS.iter().map(|s| s.to_string()).collect(),
            include_entry_metadata: self.include_entry_metadata,
        }
    }

    /// Batch settings for rows produced by this source.
    pub fn log_rows_settings(&self) -> LogRowsSettings {
        LogRowsSettings {
            stream_fields: self.stream_fields.clone(),
            ignore_fields: self.ignore_fields.clone(),
            extra_fields: Vec::new(),
            default_msg_value: String::new(),
        }
    }
}
