//! The same operations as the blocking reader, over tokio I/O. Cancellation is checked before
//! each chunk, never in the middle of one.

use std::io::SeekFrom;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

use super::ChunkReader;
use crate::{
    codec::Codec,
    error::{Error, Result},
};

pub(crate) fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

impl<R: AsyncRead + AsyncSeek + Unpin> ChunkReader<R> {
    /// Chunks start at the source's current position
    pub async fn new_async(mut source: R, codec: Box<dyn Codec>) -> Result<Self> {
        let origin = source.stream_position().await?;
        let len = source.seek(SeekFrom::End(0)).await?;
        source.seek(SeekFrom::Start(origin)).await?;

        Ok(Self::from_parts(source, codec, origin, len))
    }

    async fn seek_source_async(&mut self, offset: u64) -> Result<()> {
        if self.source_position != Some(offset) {
            self.source_position = None;
            self.source.seek(SeekFrom::Start(offset)).await?;
            self.source_position = Some(offset);
        }
        Ok(())
    }

    async fn length_at_async(&mut self, offset: u64) -> Result<Option<usize>> {
        if self.at_end(offset) {
            return Ok(None);
        }

        self.seek_source_async(offset).await?;
        let mut prefix = [0; 4];
        self.source_position = None;
        self.source
            .read_exact(&mut prefix)
            .await
            .map_err(|e| self.truncated_prefix(offset, e))?;
        self.source_position = Some(offset + 4);

        let length = self.check_length(offset, prefix)?;
        self.record(offset, length);

        Ok(Some(length))
    }

    async fn discover_next_async(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }

        let frontier = self.frontier;
        Ok(self.length_at_async(frontier).await?.is_some())
    }

    pub async fn chunk_count_async(&mut self, cancel: &CancellationToken) -> Result<usize> {
        loop {
            check_cancelled(cancel)?;
            if !self.discover_next_async().await? {
                return Ok(self.offsets.len());
            }
        }
    }

    pub async fn seek_to_chunk_async(&mut self, index: usize, cancel: &CancellationToken) -> Result<u64> {
        while self.offsets.len() <= index {
            check_cancelled(cancel)?;
            if !self.discover_next_async().await? {
                break;
            }
        }

        let offset = self.offset_of(index)?;
        self.position = offset;
        Ok(offset)
    }

    pub async fn read_chunk_async(
        &mut self,
        dest: &mut [u8],
        decompress: bool,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        check_cancelled(cancel)?;
        self.check_destination(dest)?;

        let offset = self.position;
        let Some(length) = self.length_at_async(offset).await? else {
            return Ok(0);
        };

        // Dropping this future mid-read returns the buffer and leaves `position` alone
        let mut body = self.pool.rent(length);
        self.source_position = None;
        self.source.read_exact(&mut body).await?;
        self.source_position = Some(offset + 4 + length as u64);

        let n = self.finish_chunk(offset, &body, dest, decompress)?;
        self.position = offset + 4 + length as u64;
        Ok(n)
    }

    pub async fn read_chunk_at_async(
        &mut self,
        index: usize,
        dest: &mut [u8],
        decompress: bool,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        self.seek_to_chunk_async(index, cancel).await?;
        self.read_chunk_async(dest, decompress, cancel).await
    }
}
