use std::io::{self, Read, Seek};

use tokio::io::{AsyncRead, AsyncSeek};
use tokio_util::sync::CancellationToken;

use super::ChunkReader;
use crate::error::{Error, Result};

pub const DEFAULT_READ_AHEAD: usize = 2;

/// Forward-only byte stream over the decompressed contents of a [`ChunkReader`].
///
/// Decompresses `read_ahead` chunks at a time into an internal buffer.
pub struct ChunkStream<R> {
    reader: ChunkReader<R>,
    buffer: Vec<u8>,
    read_ahead: usize,
    /// Unread bytes are `buffer[start..end]`
    start: usize,
    end: usize,
    finished: bool,
    consumed: u64,
}

impl<R> ChunkStream<R> {
    /// A `read_ahead` of 0 is treated as 1
    pub fn new(reader: ChunkReader<R>, read_ahead: usize) -> Self {
        let read_ahead = read_ahead.max(1);

        Self {
            buffer: vec![0; reader.chunk_length() * read_ahead],
            reader,
            read_ahead,
            start: 0,
            end: 0,
            finished: false,
            consumed: 0,
        }
    }

    /// Bytes handed out so far
    pub fn position(&self) -> u64 {
        self.consumed
    }

    /// Decompressed but not yet read
    pub fn buffered(&self) -> usize {
        self.end - self.start
    }

    /// Throw away buffered bytes. Reading continues from the next undecoded chunk.
    pub fn flush_buffer(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    pub fn into_inner(self) -> ChunkReader<R> {
        self.reader
    }

    /// Copy buffered bytes out
    fn drain(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.end - self.start);
        buf[..n].copy_from_slice(&self.buffer[self.start..self.start + n]);
        self.start += n;
        self.consumed += n as u64;
        n
    }

    fn needs_fill(&self) -> bool {
        self.start == self.end && !self.finished
    }
}

impl<R: Read + Seek> ChunkStream<R> {
    /// Decode up to `read_ahead` chunks. False if nothing was left.
    fn fill(&mut self) -> Result<bool> {
        self.flush_buffer();
        let chunk = self.reader.chunk_length();

        for _ in 0..self.read_ahead {
            let slot = &mut self.buffer[self.end..self.end + chunk];
            let n = match self.reader.read_chunk(slot, true) {
                Ok(n) => n,
                // Serve what decoded, the failing chunk is read again next fill
                Err(_) if self.end > 0 => break,
                Err(e) => return Err(e),
            };
            if n == 0 {
                self.finished = true;
                break;
            }
            self.end += n;
        }

        Ok(self.end > 0)
    }
}

impl<R: Read + Seek> Read for ChunkStream<R> {
    /// A failure after some bytes were copied returns those bytes, and the next call fails
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut written = 0;

        while written < buf.len() {
            if self.start == self.end {
                if !self.needs_fill() {
                    break;
                }
                match self.fill() {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(_) if written > 0 => break,
                    Err(e) => return Err(e.into()),
                }
            }
            written += self.drain(&mut buf[written..]);
        }

        Ok(written)
    }
}

impl<R: AsyncRead + AsyncSeek + Unpin> ChunkStream<R> {
    async fn fill_async(&mut self, cancel: &CancellationToken) -> Result<bool> {
        self.flush_buffer();
        let chunk = self.reader.chunk_length();

        for _ in 0..self.read_ahead {
            let slot = &mut self.buffer[self.end..self.end + chunk];
            let n = match self.reader.read_chunk_async(slot, true, cancel).await {
                Ok(n) => n,
                Err(_) if self.end > 0 => break,
                Err(e) => return Err(e),
            };
            if n == 0 {
                self.finished = true;
                break;
            }
            self.end += n;
        }

        Ok(self.end > 0)
    }

    /// Same contract as [`Read::read`]: 0 once everything is consumed. Cancellation or a failure
    /// after some bytes were copied returns those bytes, and the next call fails.
    pub async fn read_async(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<usize> {
        let mut written = 0;

        while written < buf.len() {
            if self.start == self.end {
                if !self.needs_fill() {
                    break;
                }
                match self.fill_async(cancel).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(_) if written > 0 => break,
                    Err(e) => return Err(e),
                }
            }
            written += self.drain(&mut buf[written..]);
        }

        Ok(written)
    }

    /// Fill all of `buf`, or fail with `EndOfData`
    pub async fn read_exact_async(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<()> {
        let mut filled = 0;

        while filled < buf.len() {
            match self.read_async(&mut buf[filled..], cancel).await? {
                0 => return Err(Error::EndOfData),
                n => filled += n,
            }
        }
        Ok(())
    }

    /// Append everything left to `out`, returning how much was appended
    pub async fn read_to_end_async(&mut self, out: &mut Vec<u8>, cancel: &CancellationToken) -> Result<usize> {
        let before = out.len();
        let mut block = vec![0; self.reader.chunk_length()];

        loop {
            let n = self.read_async(&mut block, cancel).await?;
            if n == 0 {
                return Ok(out.len() - before);
            }
            out.extend_from_slice(&block[..n]);
        }
    }
}
