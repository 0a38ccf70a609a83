//! Tenant and stream identifiers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use xxhash_rust::xxh3::xxh3_128;

/// `(account, project)` pair identifying a tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TenantID {
    /// Account the tenant belongs to.
    pub account_id: u32,
    /// Project within the account.
    pub project_id: u32,
}

impl TenantID {
    /// Create a tenant id from its parts.
    pub const fn new(account_id: u32, project_id: u32) -> Self {
        Self {
            account_id,
            project_id,
        }
    }
}

/// Error parsing an `"account:project"` tenant string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TenantIDParseError {
    /// The account part is not an unsigned 32-bit decimal.
    #[error("invalid account id {value:?}: expected an unsigned 32-bit decimal")]
    InvalidAccountID { value: String },

    /// The project part is not an unsigned 32-bit decimal.
    #[error("invalid project id {value:?}: expected an unsigned 32-bit decimal")]
    InvalidProjectID { value: String },
}

impl FromStr for TenantID {
    type Err = TenantIDParseError;

    /// Parse `"account:project"`; a bare `"account"` means project 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (account, project) = match s.split_once(':') {
            Some((a, p)) => (a, Some(p)),
            None => (s, None),
        };
        let account_id = account
            .parse()
            .map_err(|_| TenantIDParseError::InvalidAccountID {
                value: account.to_string(),
            })?;
        let project_id = match project {
            Some(p) => p
                .parse()
                .map_err(|_| TenantIDParseError::InvalidProjectID {
                    value: p.to_string(),
                })?,
            None => 0,
        };
        Ok(Self {
            account_id,
            project_id,
        })
    }
}

impl fmt::Display for TenantID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.account_id, self.project_id)
    }
}

/// Identity of a log stream: the owning tenant plus the 128-bit content
/// hash of the stream's canonical tags.
///
/// The derived ordering - account, project, then the hash from its high
/// word down - is the storage sort order that groups rows of one stream
/// together before block flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamID {
    /// Owning tenant.
    pub tenant_id: TenantID,
    /// Content hash of the canonical stream tags.
    pub id: u128,
}

impl StreamID {
    /// Build a stream id by hashing the canonical stream-tag bytes.
    pub fn new(tenant_id: TenantID, canonical_tags: &[u8]) -> Self {
        Self {
            tenant_id,
            id: hash128(canonical_tags),
        }
    }
}

/// 128-bit content hash used for stream identity.
///
/// Fixed at XXH3-128. Stream ids are persisted by the downstream store, so
/// changing the hash function is a breaking on-disk compatibility change.
#[inline]
pub fn hash128(data: &[u8]) -> u128 {
    xxh3_128(data)
}
