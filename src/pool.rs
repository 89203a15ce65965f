//! Reusable scratch buffers. A rented buffer goes back to its pool when the guard drops, so early
//! returns and `?` can't leak it.

use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use parking_lot::Mutex;

/// Buffers beyond this are dropped instead of pooled
const MAX_POOLED: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct BufferPool {
    free: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zeroed buffer of exactly `len` bytes
    pub fn rent(&self, len: usize) -> PooledBuffer {
        let mut buffer = self.free.lock().pop().unwrap_or_default();
        buffer.clear();
        buffer.resize(len, 0);

        PooledBuffer {
            buffer,
            pool: self.free.clone(),
        }
    }

    /// Buffers waiting to be rented
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }
}

pub struct PooledBuffer {
    buffer: Vec<u8>,
    pool: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let mut free = self.pool.lock();
        if free.len() < MAX_POOLED {
            free.push(std::mem::take(&mut self.buffer));
        }
    }
}
