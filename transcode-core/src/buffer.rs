//! Reference-counted byte buffers.
//!
//! [`SharedBuffer`] is the leaf primitive every media unit is built on. Cloning
//! a buffer only bumps an atomic reference count; the bytes are never copied.
//! A holder may write through its handle only while it is the sole owner, see
//! [`SharedBuffer::data_mut`] and [`SharedBuffer::make_writable`].

use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Zeroed bytes that follow every packet payload.
///
/// Word-wise bitstream readers may read up to this many bytes past the end of
/// a payload without leaving the allocation.
pub const INPUT_BUFFER_PADDING_SIZE: usize = 64;

/// Callback invoked exactly once when the last reference to a buffer drops.
///
/// The backing memory is handed over so allocators can recycle it.
pub trait BufferRelease: Send + Sync {
    /// Take back the memory of a buffer whose reference count reached zero.
    fn release(&self, data: Box<[u8]>);
}

impl<F> BufferRelease for F
where
    F: Fn(Box<[u8]>) + Send + Sync,
{
    fn release(&self, data: Box<[u8]>) {
        self(data)
    }
}

struct BufferInner {
    data: Box<[u8]>,
    read_only: bool,
    release: Option<Box<dyn BufferRelease>>,
}

impl Drop for BufferInner {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release.release(std::mem::take(&mut self.data));
        }
    }
}

/// An atomically reference-counted byte region.
#[derive(Clone)]
pub struct SharedBuffer {
    inner: Arc<BufferInner>,
}

/// Allocate `size` zeroed bytes, reporting failure instead of aborting.
pub(crate) fn try_alloc_zeroed(size: usize) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(size)
        .map_err(|_| Error::OutOfMemory { requested: size })?;
    data.resize(size, 0);
    Ok(data)
}

impl SharedBuffer {
    /// Allocate a zero-filled buffer of `size` bytes.
    pub fn alloc(size: usize) -> Result<Self> {
        Ok(Self::from_vec(try_alloc_zeroed(size)?))
    }

    /// Allocate a buffer holding a copy of `data`.
    pub fn copy_from_slice(data: &[u8]) -> Result<Self> {
        let mut vec = Vec::new();
        vec.try_reserve_exact(data.len())
            .map_err(|_| Error::OutOfMemory { requested: data.len() })?;
        vec.extend_from_slice(data);
        Ok(Self::from_vec(vec))
    }

    /// Take ownership of an existing vector.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self::build(data.into_boxed_slice(), false, None)
    }

    /// Wrap memory that must never be written through this handle.
    pub fn read_only(data: Vec<u8>) -> Self {
        Self::build(data.into_boxed_slice(), true, None)
    }

    /// Wrap memory whose lifetime is managed by a custom release callback.
    pub fn with_release<R>(data: Box<[u8]>, release: R) -> Self
    where
        R: BufferRelease + 'static,
    {
        Self::build(data, false, Some(Box::new(release)))
    }

    fn build(data: Box<[u8]>, read_only: bool, release: Option<Box<dyn BufferRelease>>) -> Self {
        Self {
            inner: Arc::new(BufferInner {
                data,
                read_only,
                release,
            }),
        }
    }

    /// Buffer contents.
    pub fn data(&self) -> &[u8] {
        &self.inner.data
    }

    /// Mutable contents, available only to an exclusive, writable owner.
    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) if !inner.read_only => Some(&mut inner.data),
            _ => None,
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    /// Check whether the buffer has no bytes.
    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }

    /// Number of live handles to this buffer.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// True when this handle is the only reference.
    pub fn is_exclusively_owned(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// True when the holder may write in place.
    pub fn is_writable(&self) -> bool {
        !self.inner.read_only && self.is_exclusively_owned()
    }

    /// Check whether the buffer was created read-only.
    pub fn is_read_only(&self) -> bool {
        self.inner.read_only
    }

    /// Check whether two handles refer to the same allocation.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Return a writable handle, copying the bytes if the buffer is shared.
    ///
    /// The shared data itself is never modified.
    pub fn make_writable(self) -> Result<Self> {
        if self.is_writable() {
            return Ok(self);
        }
        Self::copy_from_slice(self.data())
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("len", &self.len())
            .field("refs", &self.ref_count())
            .field("read_only", &self.inner.read_only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_alloc_is_zeroed() {
        let buf = SharedBuffer::alloc(128).unwrap();
        assert_eq!(buf.len(), 128);
        assert!(buf.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_clone_shares_bytes() {
        let a = SharedBuffer::copy_from_slice(&[1, 2, 3]).unwrap();
        let b = a.clone();
        assert_eq!(a.ref_count(), 2);
        assert!(SharedBuffer::ptr_eq(&a, &b));
        assert!(!a.is_writable());
        drop(b);
        assert!(a.is_writable());
    }

    #[test]
    fn test_data_mut_requires_exclusive() {
        let mut a = SharedBuffer::alloc(4).unwrap();
        let b = a.clone();
        assert!(a.data_mut().is_none());
        drop(b);
        a.data_mut().unwrap()[0] = 9;
        assert_eq!(a.data()[0], 9);
    }

    #[test]
    fn test_make_writable_copies_shared() {
        let a = SharedBuffer::copy_from_slice(&[7; 8]).unwrap();
        let mut b = a.clone().make_writable().unwrap();
        assert!(!SharedBuffer::ptr_eq(&a, &b));
        b.data_mut().unwrap().fill(0);
        assert_eq!(a.data(), &[7; 8]);
        assert_eq!(a.ref_count(), 1);
    }

    #[test]
    fn test_make_writable_keeps_exclusive() {
        let a = SharedBuffer::alloc(8).unwrap();
        let ptr = a.data().as_ptr();
        let a = a.make_writable().unwrap();
        assert_eq!(a.data().as_ptr(), ptr);
    }

    #[test]
    fn test_read_only_never_writable() {
        let mut a = SharedBuffer::read_only(vec![1, 2]);
        assert!(a.is_exclusively_owned());
        assert!(!a.is_writable());
        assert!(a.data_mut().is_none());
        let mut w = a.make_writable().unwrap();
        assert!(w.data_mut().is_some());
    }

    #[test]
    fn test_release_runs_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let release = move |data: Box<[u8]>| {
            assert_eq!(data.len(), 16);
            counter.fetch_add(1, Ordering::SeqCst);
        };
        let buf = SharedBuffer::with_release(vec![0u8; 16].into_boxed_slice(), release);
        let clones: Vec<_> = (0..4).map(|_| buf.clone()).collect();
        drop(buf);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(clones);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
