//! Shared byte-buffer pool
//!
//! Frame payloads hand their buffers back here on reset so the next write
//! into the same slot reuses memory instead of allocating.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use crossbeam::queue::SegQueue;
use once_cell::sync::Lazy;

/// Default capacity of a freshly allocated buffer (one RTP packet on a
/// typical MTU)
pub const DEFAULT_BUFFER_CAPACITY: usize = 1500;

/// Default number of idle buffers kept by a pool
pub const DEFAULT_MAX_POOLED: usize = 4096;

static SHARED: Lazy<BufferPool> = Lazy::new(BufferPool::new);

struct PoolInner {
    free: SegQueue<BytesMut>,
    max_pooled: usize,
    buffer_capacity: usize,
    allocated: AtomicU64,
    reused: AtomicU64,
}

/// Lock-free pool of `BytesMut` buffers
///
/// Cloning is cheap; clones share the same free list.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Create a pool with default limits
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_POOLED, DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a pool keeping at most `max_pooled` idle buffers
    pub fn with_limits(max_pooled: usize, buffer_capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free: SegQueue::new(),
                max_pooled,
                buffer_capacity,
                allocated: AtomicU64::new(0),
                reused: AtomicU64::new(0),
            }),
        }
    }

    /// Process-wide default pool
    pub fn shared() -> BufferPool {
        SHARED.clone()
    }

    /// Take an empty buffer
    pub fn acquire(&self) -> BytesMut {
        match self.inner.free.pop() {
            Some(buf) => {
                self.inner.reused.fetch_add(1, Ordering::Relaxed);
                buf
            }
            None => {
                self.inner.allocated.fetch_add(1, Ordering::Relaxed);
                BytesMut::with_capacity(self.inner.buffer_capacity)
            }
        }
    }

    /// Take a buffer holding a copy of `data`
    pub fn acquire_from(&self, data: &[u8]) -> BytesMut {
        let mut buf = self.acquire();
        buf.extend_from_slice(data);
        buf
    }

    /// Give a buffer back
    ///
    /// Dropped instead when the pool already holds `max_pooled` buffers.
    pub fn recycle(&self, mut buf: BytesMut) {
        if self.inner.free.len() >= self.inner.max_pooled {
            return;
        }
        buf.clear();
        self.inner.free.push(buf);
    }

    /// Number of idle buffers
    pub fn available(&self) -> usize {
        self.inner.free.len()
    }

    /// Buffers allocated because the pool was empty
    pub fn allocated(&self) -> u64 {
        self.inner.allocated.load(Ordering::Relaxed)
    }

    /// Buffers served from the free list
    pub fn reused(&self) -> u64 {
        self.inner.reused.load(Ordering::Relaxed)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("available", &self.available())
            .field("allocated", &self.allocated())
            .field("reused", &self.reused())
            .finish()
    }
}

/// Ordered list of buffers making up one logical byte sequence
#[derive(Debug, Default)]
pub struct BufferList {
    buffers: VecDeque<BytesMut>,
    byte_length: usize,
}

impl BufferList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a buffer
    pub fn push(&mut self, buf: BytesMut) {
        self.byte_length += buf.len();
        self.buffers.push_back(buf);
    }

    /// Append a pooled copy of `data`
    pub fn push_slice(&mut self, pool: &BufferPool, data: &[u8]) {
        self.push(pool.acquire_from(data));
    }

    /// Remove the first buffer
    pub fn shift(&mut self) -> Option<BytesMut> {
        let buf = self.buffers.pop_front()?;
        self.byte_length -= buf.len();
        Some(buf)
    }

    /// Move every buffer to the end of `other`
    pub fn transfer_to(&mut self, other: &mut BufferList) -> usize {
        let moved = self.byte_length;
        while let Some(buf) = self.shift() {
            other.push(buf);
        }
        moved
    }

    /// Append pooled copies of every buffer in `source`
    pub fn copy_from(&mut self, pool: &BufferPool, source: &BufferList) {
        for chunk in source.iter() {
            self.push_slice(pool, chunk);
        }
    }

    /// Hand every buffer back to `pool`
    pub fn recycle(&mut self, pool: &BufferPool) {
        for buf in self.buffers.drain(..) {
            pool.recycle(buf);
        }
        self.byte_length = 0;
    }

    /// Iterate over the chunks
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.buffers.iter().map(|buf| &buf[..])
    }

    /// Concatenate into one contiguous buffer
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.byte_length);
        for chunk in self.iter() {
            out.extend_from_slice(chunk);
        }
        out.freeze()
    }

    /// Total bytes
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// Number of buffers
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
