//! Pooled segment allocator.
//!
//! Pre-allocates fixed-size buffers and recycles them through a lock-free
//! free-list so the steady-state encode/decode path never touches the
//! allocator. Acquiring returns a [`Segment`] lease; dropping the lease
//! zeroes the buffer and returns it to the pool. Requests larger than the
//! pool's segment size are served as one-off allocations that are never
//! recycled.

use crate::error::PoolError;
use crossbeam::queue::SegQueue;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Default segment size (8 KiB).
pub const DEFAULT_SEGMENT_SIZE: usize = 8192;

/// Default number of pre-allocated segments.
pub const DEFAULT_POOL_SIZE: usize = 1000;

struct PoolInner {
    segment_size: usize,
    free: SegQueue<Box<[u8]>>,
    in_use: AtomicUsize,
    pooled: AtomicUsize,
    closed: AtomicBool,
}

/// Thread-safe pool of fixed-size byte segments.
///
/// Cloning is cheap and shares the same pool.
#[derive(Clone)]
pub struct SegmentPool {
    inner: Arc<PoolInner>,
}

impl SegmentPool {
    /// Creates a pool with the default segment size and capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SEGMENT_SIZE, DEFAULT_POOL_SIZE)
    }

    /// Creates a pool of `initial_pool_size` pre-allocated segments of
    /// `segment_size` bytes each.
    pub fn with_capacity(segment_size: usize, initial_pool_size: usize) -> Self {
        let inner = Arc::new(PoolInner {
            segment_size,
            free: SegQueue::new(),
            in_use: AtomicUsize::new(0),
            pooled: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        });

        for _ in 0..initial_pool_size {
            inner.free.push(vec![0u8; segment_size].into_boxed_slice());
            inner.pooled.fetch_add(1, Ordering::Relaxed);
        }

        Self { inner }
    }

    /// Acquires a pool-sized segment.
    ///
    /// Pops from the free-list when possible, otherwise allocates a fresh
    /// segment of the standard size.
    pub fn acquire(&self) -> Result<Segment, PoolError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(PoolError::Closed);
        }

        let buf = match self.inner.free.pop() {
            Some(buf) => {
                self.inner.pooled.fetch_sub(1, Ordering::Relaxed);
                buf
            }
            None => vec![0u8; self.inner.segment_size].into_boxed_slice(),
        };

        self.inner.in_use.fetch_add(1, Ordering::Relaxed);
        Ok(Segment {
            buf: Some(buf),
            pool: Arc::clone(&self.inner),
        })
    }

    /// Acquires a segment of at least `size` bytes.
    ///
    /// Sizes within the pool's segment size are served from the pool; larger
    /// requests get a one-off allocation of exactly `size` bytes that is not
    /// recycled on release.
    pub fn acquire_sized(&self, size: usize) -> Result<Segment, PoolError> {
        if size <= self.inner.segment_size {
            return self.acquire();
        }

        if self.inner.closed.load(Ordering::Acquire) {
            return Err(PoolError::Closed);
        }

        self.inner.in_use.fetch_add(1, Ordering::Relaxed);
        Ok(Segment {
            buf: Some(vec![0u8; size].into_boxed_slice()),
            pool: Arc::clone(&self.inner),
        })
    }

    /// Explicitly releases a segment back to the pool.
    ///
    /// Equivalent to dropping the lease; provided for call sites that want
    /// the release to be visible.
    pub fn release(&self, segment: Segment) {
        drop(segment);
    }

    /// Number of segments currently leased out.
    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Relaxed)
    }

    /// Number of segments currently available in the free-list.
    pub fn available(&self) -> usize {
        self.inner.pooled.load(Ordering::Relaxed)
    }

    /// The standard segment size for this pool.
    pub fn segment_size(&self) -> usize {
        self.inner.segment_size
    }

    /// Returns whether the pool has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Closes the pool and drains the free-list.
    ///
    /// Subsequent acquires fail with [`PoolError::Closed`]. Outstanding
    /// leases remain valid; their buffers are dropped instead of recycled
    /// when released.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        while self.inner.free.pop().is_some() {
            self.inner.pooled.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

impl Default for SegmentPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SegmentPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentPool")
            .field("segment_size", &self.segment_size())
            .field("available", &self.available())
            .field("in_use", &self.in_use())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// An exclusively-owned lease on a pooled byte region.
///
/// Dereferences to the underlying bytes. Dropping the lease returns
/// pool-sized buffers to the free-list (zeroed first) and discards
/// oversize ones.
pub struct Segment {
    buf: Option<Box<[u8]>>,
    pool: Arc<PoolInner>,
}

impl Segment {
    /// Size of the leased region in bytes.
    pub fn len(&self) -> usize {
        self.buf.as_ref().map_or(0, |b| b.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero-copy view of `len` bytes starting at `offset`.
    ///
    /// Returns `None` if the range falls outside the segment.
    pub fn slice(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.buf
            .as_ref()
            .and_then(|b| b.get(offset..offset.checked_add(len)?))
    }
}

impl Deref for Segment {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // buf is only None after Drop has taken it
        self.buf.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for Segment {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        self.pool.in_use.fetch_sub(1, Ordering::Relaxed);

        let Some(mut buf) = self.buf.take() else {
            return;
        };

        // Only standard-size segments are recycled, and never after close.
        if buf.len() == self.pool.segment_size && !self.pool.closed.load(Ordering::Acquire) {
            buf.fill(0);
            self.pool.free.push(buf);
            self.pool.pooled.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release_roundtrip() {
        let pool = SegmentPool::with_capacity(64, 4);
        assert_eq!(pool.available(), 4);
        assert_eq!(pool.in_use(), 0);

        let seg = pool.acquire().unwrap();
        assert_eq!(seg.len(), 64);
        assert_eq!(pool.available(), 3);
        assert_eq!(pool.in_use(), 1);

        drop(seg);
        assert_eq!(pool.available(), 4);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_grows_beyond_initial_capacity() {
        let pool = SegmentPool::with_capacity(32, 1);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.in_use(), 2);

        drop(a);
        drop(b);
        // Both standard-size segments are pooled on release.
        assert_eq!(pool.available(), 2);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_released_segment_is_zeroed() {
        let pool = SegmentPool::with_capacity(16, 1);

        let mut seg = pool.acquire().unwrap();
        seg[0] = 0xAB;
        seg[15] = 0xCD;
        drop(seg);

        let seg = pool.acquire().unwrap();
        assert!(seg.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_oversize_not_recycled() {
        let pool = SegmentPool::with_capacity(16, 1);

        let big = pool.acquire_sized(1024).unwrap();
        assert_eq!(big.len(), 1024);
        assert_eq!(pool.in_use(), 1);
        assert_eq!(pool.available(), 1);

        drop(big);
        assert_eq!(pool.in_use(), 0);
        // The free-list still holds only the original pooled segment.
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_small_sized_request_uses_pool() {
        let pool = SegmentPool::with_capacity(64, 2);

        let seg = pool.acquire_sized(10).unwrap();
        // Served from the pool at the standard size.
        assert_eq!(seg.len(), 64);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_close_rejects_acquire() {
        let pool = SegmentPool::with_capacity(16, 2);
        pool.close();

        assert!(matches!(pool.acquire(), Err(PoolError::Closed)));
        assert!(matches!(pool.acquire_sized(8), Err(PoolError::Closed)));
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_release_after_close_drops_buffer() {
        let pool = SegmentPool::with_capacity(16, 1);
        let seg = pool.acquire().unwrap();

        pool.close();
        drop(seg);

        assert_eq!(pool.available(), 0);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_slice_view() {
        let pool = SegmentPool::with_capacity(16, 1);
        let mut seg = pool.acquire().unwrap();
        seg[4] = 7;
        seg[5] = 8;

        let view = seg.slice(4, 2).unwrap();
        assert_eq!(view, &[7, 8]);

        assert!(seg.slice(10, 100).is_none());
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = SegmentPool::with_capacity(128, 8);
        let mut handles = Vec::new();

        for _ in 0..4 {
            let pool = pool.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    let mut seg = pool.acquire().unwrap();
                    seg[0] = 1;
                    drop(seg);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(pool.in_use(), 0);
        assert!(pool.available() >= 8);
    }
}
