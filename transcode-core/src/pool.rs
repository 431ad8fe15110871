//! Memory pool implementations for efficient buffer reuse.
//!
//! A [`BufferPool`] hands out [`SharedBuffer`]s of one size; when the last
//! reference to a pooled buffer drops, its storage goes back to the pool
//! instead of being freed. [`FramePool`] builds on it to serve whole frames and
//! is the usual [`FrameAllocator`] for steady-state decoding.

use crate::buffer::{try_alloc_zeroed, SharedBuffer};
use crate::error::Result;
use crate::frame::{Frame, FrameFormat};
use crate::packet::Packet;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

struct PoolInner {
    size: usize,
    max_cached: usize,
    free: Mutex<Vec<Box<[u8]>>>,
    total_allocated: AtomicUsize,
}

impl PoolInner {
    fn put_back(&self, data: Box<[u8]>) {
        if data.len() != self.size {
            return;
        }
        let mut free = self.free.lock();
        if free.len() < self.max_cached {
            free.push(data);
        }
    }
}

/// A pool of equally sized byte buffers.
///
/// Recycled buffers keep their previous contents.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Create a pool serving `size`-byte buffers and caching at most
    /// `max_cached` returned ones.
    pub fn new(size: usize, max_cached: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                size,
                max_cached,
                free: Mutex::new(Vec::with_capacity(max_cached)),
                total_allocated: AtomicUsize::new(0),
            }),
        }
    }

    /// Acquire a buffer, reusing a returned one when available.
    pub fn acquire(&self) -> Result<SharedBuffer> {
        let recycled = self.inner.free.lock().pop();
        let data = match recycled {
            Some(data) => data,
            None => {
                let data = try_alloc_zeroed(self.inner.size)?.into_boxed_slice();
                self.inner.total_allocated.fetch_add(1, Ordering::Relaxed);
                data
            }
        };
        let pool: Weak<PoolInner> = Arc::downgrade(&self.inner);
        Ok(SharedBuffer::with_release(data, move |data: Box<[u8]>| {
            if let Some(pool) = pool.upgrade() {
                pool.put_back(data);
            }
        }))
    }

    /// Size of the buffers this pool serves.
    pub fn buffer_size(&self) -> usize {
        self.inner.size
    }

    /// Get the number of available buffers.
    pub fn available(&self) -> usize {
        self.inner.free.lock().len()
    }

    /// Get the total number of allocated buffers.
    pub fn total_allocated(&self) -> usize {
        self.inner.total_allocated.load(Ordering::Relaxed)
    }

    /// Clear all pooled buffers.
    pub fn clear(&self) {
        self.inner.free.lock().clear();
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("size", &self.inner.size)
            .field("available", &self.available())
            .field("total_allocated", &self.total_allocated())
            .finish()
    }
}

/// Source of output buffers for coders.
///
/// Coders call this for every frame or packet they produce, so a caller can
/// plug in its own memory management.
pub trait FrameAllocator: Send + Sync {
    /// Attach planes to `frame`, whose format fields are already set.
    fn alloc_frame(&self, frame: &mut Frame<'static>, align: usize) -> Result<()>;

    /// Allocate a zeroed, padded packet of `size` bytes.
    fn alloc_packet(&self, size: usize) -> Result<Packet<'static>> {
        Packet::alloc(size)
    }
}

/// Allocates fresh zeroed buffers for every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAllocator;

impl FrameAllocator for DefaultAllocator {
    fn alloc_frame(&self, frame: &mut Frame<'static>, align: usize) -> Result<()> {
        frame.alloc_buffers(align)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameKey {
    format: FrameFormat,
    width: u32,
    height: u32,
    nb_samples: usize,
    channels: usize,
    align: usize,
}

impl FrameKey {
    fn of(frame: &Frame<'_>, align: usize) -> Self {
        Self {
            format: frame.format,
            width: frame.width,
            height: frame.height,
            nb_samples: frame.nb_samples,
            channels: frame.channels(),
            align,
        }
    }
}

/// A frame allocator that recycles plane buffers.
///
/// Keeps one [`BufferPool`] per plane for the most recent frame layout; a
/// request with a different layout replaces the pools.
pub struct FramePool {
    max_cached: usize,
    pools: Mutex<Option<(FrameKey, Vec<BufferPool>)>>,
}

impl FramePool {
    /// Create a new frame pool caching up to `max_cached` buffers per plane.
    pub fn new(max_cached: usize) -> Self {
        Self {
            max_cached,
            pools: Mutex::new(None),
        }
    }

    /// Get the number of available buffers across all planes.
    pub fn available(&self) -> usize {
        self.pools
            .lock()
            .as_ref()
            .map_or(0, |(_, pools)| pools.iter().map(BufferPool::available).sum())
    }

    /// Get the total number of allocated buffers for the current layout.
    pub fn total_allocated(&self) -> usize {
        self.pools
            .lock()
            .as_ref()
            .map_or(0, |(_, pools)| pools.iter().map(BufferPool::total_allocated).sum())
    }

    /// Clear all pooled buffers.
    pub fn clear(&self) {
        *self.pools.lock() = None;
    }

    fn pools_for(&self, frame: &Frame<'_>, align: usize) -> Result<Vec<BufferPool>> {
        let key = FrameKey::of(frame, align);
        let mut guard = self.pools.lock();
        if let Some((current, pools)) = guard.as_ref() {
            if *current == key {
                return Ok(pools.clone());
            }
        }
        let geometry = frame.plane_geometry()?;
        let pools: Vec<BufferPool> = geometry
            .iter()
            .map(|g| {
                let size = crate::frame::align_up(g.row_bytes, align) * g.rows;
                BufferPool::new(size, self.max_cached)
            })
            .collect();
        tracing::debug!(?key, planes = pools.len(), "frame pool reinitialized");
        *guard = Some((key, pools.clone()));
        Ok(pools)
    }
}

impl FrameAllocator for FramePool {
    fn alloc_frame(&self, frame: &mut Frame<'static>, align: usize) -> Result<()> {
        let pools = self.pools_for(frame, align)?;
        let mut plane = 0;
        frame.alloc_buffers_with(align, |size| {
            let pool = &pools[plane];
            plane += 1;
            debug_assert_eq!(pool.buffer_size(), size);
            pool.acquire()
        })
    }
}

impl fmt::Debug for FramePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePool")
            .field("max_cached", &self.max_cached)
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FRAME_ALIGN;
    use crate::pixel::PixelFormat;
    use crate::sample::{ChannelLayout, SampleFormat};

    #[test]
    fn test_buffer_pool_reuses_storage() {
        let pool = BufferPool::new(1024, 4);

        let buf1 = pool.acquire().unwrap();
        assert_eq!(pool.total_allocated(), 1);
        assert_eq!(pool.available(), 0);

        drop(buf1);
        assert_eq!(pool.available(), 1);

        let _buf2 = pool.acquire().unwrap();
        assert_eq!(pool.total_allocated(), 1); // Reused
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_buffer_pool_max_size() {
        let pool = BufferPool::new(64, 2);
        let bufs: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();
        drop(bufs);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_returns_only_after_last_reference() {
        let pool = BufferPool::new(16, 4);
        let buf = pool.acquire().unwrap();
        let clone = buf.clone();
        drop(buf);
        assert_eq!(pool.available(), 0);
        drop(clone);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_buffer_outlives_pool() {
        let pool = BufferPool::new(16, 4);
        let buf = pool.acquire().unwrap();
        drop(pool);
        assert_eq!(buf.len(), 16);
        drop(buf);
    }

    #[test]
    fn test_frame_pool_recycles_planes() {
        let pool = FramePool::new(4);
        let mut frame = Frame::video(64, 32, PixelFormat::Yuv420p);
        pool.alloc_frame(&mut frame, FRAME_ALIGN).unwrap();
        assert_eq!(frame.plane_count(), 3);
        assert_eq!(pool.total_allocated(), 3);
        frame.unref();
        assert_eq!(pool.available(), 3);

        let mut again = Frame::video(64, 32, PixelFormat::Yuv420p);
        pool.alloc_frame(&mut again, FRAME_ALIGN).unwrap();
        assert_eq!(pool.total_allocated(), 3);
    }

    #[test]
    fn test_frame_pool_layout_change() {
        let pool = FramePool::new(4);
        let mut video = Frame::video(16, 16, PixelFormat::Gray8);
        pool.alloc_frame(&mut video, FRAME_ALIGN).unwrap();
        let mut audio = Frame::audio(SampleFormat::S16p, ChannelLayout::Stereo, 48000, 32);
        pool.alloc_frame(&mut audio, FRAME_ALIGN).unwrap();
        assert_eq!(audio.plane_count(), 2);
        assert_eq!(pool.total_allocated(), 2);
    }

    #[test]
    fn test_default_allocator_packet_padding() {
        let packet = DefaultAllocator.alloc_packet(10).unwrap();
        assert_eq!(packet.len(), 10);
        assert!(packet.padding().unwrap().iter().all(|&b| b == 0));
    }
}
