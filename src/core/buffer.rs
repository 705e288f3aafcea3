//! Pooled formatting buffers
//!
//! Every log call formats into a [`Buffer`] taken from a [`BufferPool`] and
//! hands it back afterwards, so steady-state logging does not allocate.
//! The free list is an unbounded `crossbeam-channel`, which lets any number
//! of threads acquire and release concurrently without a shared lock.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;
use std::io;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

/// Capacity of a freshly allocated buffer
pub const DEFAULT_CAPACITY: usize = 256;

/// Buffers that grew beyond this are not retained by the pool
pub const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// Growable byte buffer used to assemble one log line.
#[derive(Debug, Default)]
pub struct Buffer {
    bytes: Vec<u8>,
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn as_mut_vec(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Empty the buffer and drop oversized storage
    fn reset(&mut self) {
        if self.bytes.capacity() > MAX_RETAINED_CAPACITY {
            self.bytes = Vec::with_capacity(DEFAULT_CAPACITY);
        } else {
            self.bytes.clear();
        }
    }
}

impl Deref for Buffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl DerefMut for Buffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bytes
    }
}

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.bytes.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

/// Concurrent free list of [`Buffer`]s.
///
/// The pool never blocks and never fails: when the free list is empty a new
/// buffer is allocated. Membership is unbounded in count.
#[derive(Debug)]
pub struct BufferPool {
    free_tx: Sender<Buffer>,
    free_rx: Receiver<Buffer>,
    allocated: AtomicU64,
    reused: AtomicU64,
}

impl BufferPool {
    pub fn new() -> Self {
        let (free_tx, free_rx) = unbounded();
        Self {
            free_tx,
            free_rx,
            allocated: AtomicU64::new(0),
            reused: AtomicU64::new(0),
        }
    }

    /// Take an empty buffer, reusing a released one when available
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buffer = match self.free_rx.try_recv() {
            Ok(buffer) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                buffer
            }
            Err(_) => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                Buffer::new()
            }
        };
        PooledBuffer {
            buffer: Some(buffer),
            pool: self,
        }
    }

    /// Return a buffer to the free list
    ///
    /// Ownership moves into the pool; the buffer is emptied first.
    pub fn release(&self, mut buffer: Buffer) {
        buffer.reset();
        // Both channel ends live in `self`, so the send cannot fail.
        let _ = self.free_tx.send(buffer);
    }

    /// Number of buffers currently parked in the free list
    pub fn idle(&self) -> usize {
        self.free_rx.len()
    }

    /// Number of buffers ever allocated by this pool
    pub fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Number of acquisitions served from the free list
    pub fn reused(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive handle on a pooled buffer.
///
/// The buffer goes back to its pool when the handle is dropped, including
/// during unwinding.
pub struct PooledBuffer<'a> {
    buffer: Option<Buffer>,
    pool: &'a BufferPool,
}

impl PooledBuffer<'_> {
    /// Release explicitly; equivalent to dropping the handle
    pub fn release(self) {
        drop(self);
    }

    /// Detach the buffer from the pool. It will not be recycled.
    pub fn into_inner(mut self) -> Buffer {
        self.buffer.take().unwrap_or_default()
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        // Only `into_inner` and `drop` take the buffer, and both consume the handle.
        self.buffer.as_ref().expect("pooled buffer used after release")
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Buffer {
        self.buffer.as_mut().expect("pooled buffer used after release")
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.release(buffer);
        }
    }
}
