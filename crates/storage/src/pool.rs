//! Lock-free object pools for the ingestion hot path.
//!
//! Batches, stream tags, and scratch buffers are reused across requests so
//! the steady state allocates nothing. Pools are multi-producer /
//! multi-consumer; `put` fully resets the object before requeueing, so
//! everything handed out by `get` is observably fresh.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;

use crate::log_rows::LogRows;
use crate::stream_tags::StreamTags;

/// Capacity of each global pool, in objects.
const POOL_CAPACITY: usize = 256;

/// Types that can be cleared in place for pooled reuse.
pub(crate) trait PoolReset {
    fn pool_reset(&mut self);
}

impl PoolReset for BytesMut {
    fn pool_reset(&mut self) {
        self.clear();
    }
}

impl PoolReset for StreamTags {
    fn pool_reset(&mut self) {
        self.reset();
    }
}

impl PoolReset for LogRows {
    fn pool_reset(&mut self) {
        self.reset();
    }
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    /// Objects served from the pool.
    pub hits: u64,
    /// Objects allocated because the pool was empty.
    pub misses: u64,
}

/// Lock-free pool of reusable objects.
pub(crate) struct ObjectPool<T> {
    queue: ArrayQueue<T>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T: Default + PoolReset> ObjectPool<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Pop a pooled object, or allocate a fresh one when the pool is empty.
    pub(crate) fn get(&self) -> T {
        match self.queue.pop() {
            Some(v) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                v
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                T::default()
            }
        }
    }

    /// Reset `value` and return it to the pool.
    ///
    /// Dropped when the pool is full.
    pub(crate) fn put(&self, mut value: T) {
        value.pool_reset();
        let _ = self.queue.push(value);
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

static STREAM_TAGS_POOL: LazyLock<ObjectPool<StreamTags>> =
    LazyLock::new(|| ObjectPool::new(POOL_CAPACITY));

static SCRATCH_POOL: LazyLock<ObjectPool<BytesMut>> =
    LazyLock::new(|| ObjectPool::new(POOL_CAPACITY));

static LOG_ROWS_POOL: LazyLock<ObjectPool<LogRows>> =
    LazyLock::new(|| ObjectPool::new(POOL_CAPACITY));

/// Acquire a [`StreamTags`] from the process-wide pool.
pub fn get_stream_tags() -> StreamTags {
    STREAM_TAGS_POOL.get()
}

/// Reset `st` and return it to the process-wide pool.
pub fn put_stream_tags(st: StreamTags) {
    STREAM_TAGS_POOL.put(st);
}

/// Acquire a scratch byte buffer from the process-wide pool.
pub(crate) fn get_scratch_buf() -> BytesMut {
    SCRATCH_POOL.get()
}

/// Reset `buf` and return it to the process-wide pool.
pub(crate) fn put_scratch_buf(buf: BytesMut) {
    SCRATCH_POOL.put(buf);
}

pub(crate) fn log_rows_pool() -> &'static ObjectPool<LogRows> {
    &LOG_ROWS_POOL
}
