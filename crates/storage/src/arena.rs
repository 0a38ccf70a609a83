//! Arena-backed byte storage for ingestion batches.
//!
//! All variable-length bytes referenced by a batch live in one append-only
//! buffer that is reclaimed in a single `reset`. Rows hold [`ArenaRef`]
//! handles (offset + length) instead of borrows, so the owning batch can
//! keep appending while earlier handles stay valid.

/// Handle to a byte range stored in an [`Arena`].
///
/// Valid until the next [`Arena::reset`]. The empty range never touches
/// arena storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaRef {
    offset: u32,
    len: u32,
}

impl ArenaRef {
    /// Handle for the empty byte string.
    pub const EMPTY: ArenaRef = ArenaRef { offset: 0, len: 0 };

    /// Length in bytes of the referenced range.
    #[inline]
    pub fn len(self) -> usize {
        self.len as usize
    }

    /// Check whether the referenced range is empty.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// Append-only byte buffer owned by a batch.
///
/// Single-owner: the batch that owns the arena is the only writer, so no
/// locking is needed. The only failure mode is allocator exhaustion, which
/// is fatal.
#[derive(Debug, Default)]
pub struct Arena {
    buf: Vec<u8>,
}

impl Arena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `bytes` into the arena and return a handle to the stored copy.
    pub fn copy_bytes(&mut self, bytes: &[u8]) -> ArenaRef {
        if bytes.is_empty() {
            return ArenaRef::EMPTY;
        }
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(bytes);
        ArenaRef {
            offset,
            len: bytes.len() as u32,
        }
    }

    /// Copy `s` into the arena and return a handle to the stored copy.
    #[inline]
    pub fn copy_str(&mut self, s: &str) -> ArenaRef {
        self.copy_bytes(s.as_bytes())
    }

    /// Resolve a handle to the stored bytes.
    #[inline]
    pub fn bytes(&self, r: ArenaRef) -> &[u8] {
        &self.buf[r.offset as usize..r.offset as usize + r.len as usize]
    }

    /// Resolve a handle created by [`Arena::copy_str`] to the stored string.
    ///
    /// Handles created from `&str` always resolve to valid UTF-8; anything
    /// else falls back to the empty string.
    #[inline]
    pub fn str(&self, r: ArenaRef) -> &str {
        std::str::from_utf8(self.bytes(r)).unwrap_or_default()
    }

    /// Current byte usage.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check whether the arena holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop all stored bytes, retaining capacity for reuse.
    ///
    /// Invalidates every outstanding [`ArenaRef`].
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}
