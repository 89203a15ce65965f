use std::io::{self, Read, Seek, SeekFrom};

use tracing::{debug, trace};

use crate::{
    binary::BinaryRead,
    codec::Codec,
    error::{Error, Result},
    pool::BufferPool,
};

/// Random access to a run of `[u32 length][bytes]` chunks.
///
/// A chunk stored with exactly the codec's chunk length is raw, anything shorter is compressed.
/// Chunk offsets are found lazily by walking length prefixes, and remembered.
///
/// The reader owns `source`. Hand it `&mut source` to keep ownership with the caller.
pub struct ChunkReader<R> {
    pub(super) source: R,
    pub(super) codec: Box<dyn Codec>,
    pub(super) pool: BufferPool,
    /// Start of every chunk found so far, in order. Only ever grows.
    pub(super) offsets: Vec<u64>,
    /// End of the last found chunk, where the walk picks up
    pub(super) frontier: u64,
    /// The walk reached the end of the source
    pub(super) exhausted: bool,
    /// Where the next `read_chunk` starts
    pub(super) position: u64,
    /// Where `source` actually is, if known
    pub(super) source_position: Option<u64>,
    pub(super) len: u64,
}

impl<R> ChunkReader<R> {
    /// `origin` is the first chunk's offset and `len` the total source length
    pub(super) fn from_parts(source: R, codec: Box<dyn Codec>, origin: u64, len: u64) -> Self {
        Self {
            source,
            codec,
            pool: BufferPool::new(),
            offsets: vec![],
            frontier: origin,
            exhausted: false,
            position: origin,
            source_position: Some(origin),
            len,
        }
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    /// Size of a full uncompressed chunk, which is also the smallest valid `read_chunk` buffer
    pub fn chunk_length(&self) -> usize {
        self.codec.uncompressed_chunk_length()
    }

    /// Chunks found so far, without walking further
    pub fn discovered(&self) -> usize {
        self.offsets.len()
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    pub(super) fn check_destination(&self, dest: &[u8]) -> Result<()> {
        if dest.len() < self.chunk_length() {
            return Err(Error::invalid_data(format!(
                "Destination holds {} bytes, a chunk needs {}",
                dest.len(),
                self.chunk_length()
            )));
        }
        Ok(())
    }

    /// Validate a length prefix read at `offset`
    pub(super) fn check_length(&self, offset: u64, prefix: [u8; 4]) -> Result<usize> {
        let length = i32::from_le_bytes(prefix) as i64;
        let max = self.chunk_length();

        if length < 0 || length > max as i64 {
            return Err(Error::InvalidChunkLength {
                offset,
                length,
                max,
            });
        }

        let end = offset + 4 + length as u64;
        if end > self.len {
            return Err(Error::invalid_data(format!(
                "Chunk at {offset:#x} ends at {end:#x}, past the end of the source ({:#x})",
                self.len
            )));
        }

        Ok(length as usize)
    }

    /// Remember a chunk if it's the next undiscovered one
    pub(super) fn record(&mut self, offset: u64, length: usize) {
        if offset == self.frontier && !self.exhausted {
            trace!(index = self.offsets.len(), offset, length, "Found chunk");
            self.offsets.push(offset);
            self.frontier = offset + 4 + length as u64;
        }
    }

    /// True if there's nothing left at `offset`
    pub(super) fn at_end(&mut self, offset: u64) -> bool {
        if offset < self.len {
            return false;
        }

        if offset == self.frontier && !self.exhausted {
            debug!(chunks = self.offsets.len(), "Reached the last chunk");
            self.exhausted = true;
        }
        true
    }

    pub(super) fn offset_of(&self, index: usize) -> Result<u64> {
        self.offsets
            .get(index)
            .copied()
            .ok_or(Error::OutOfRange {
                index,
                count: self.offsets.len(),
            })
    }

    /// Turn the body of the chunk at `offset` into output bytes.
    ///
    /// Only the last chunk in the source may decompress to less than a full chunk.
    pub(super) fn finish_chunk(
        &self,
        offset: u64,
        body: &[u8],
        dest: &mut [u8],
        decompress: bool,
    ) -> Result<usize> {
        let max = self.chunk_length();

        if body.len() == max || !decompress {
            dest[..body.len()].copy_from_slice(body);
            return Ok(body.len());
        }

        let n = self.codec.decompress(body, &mut dest[..max])?;
        let end = offset + 4 + body.len() as u64;
        if n < max && end < self.len {
            return Err(Error::invalid_data(format!(
                "Chunk at {offset:#x} decompressed to {n} bytes, only the last chunk may be shorter \
                 than {max}"
            )));
        }

        Ok(n)
    }

    /// A length prefix cut short by the end of the source
    pub(super) fn truncated_prefix(&self, offset: u64, err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            return Error::invalid_data(format!(
                "Chunk length prefix at {offset:#x} runs past the end of the source ({:#x})",
                self.len
            ));
        }
        err.into()
    }
}

impl<R: Read + Seek> ChunkReader<R> {
    /// Chunks start at the source's current position
    pub fn new(mut source: R, codec: Box<dyn Codec>) -> Result<Self> {
        let origin = source.stream_position()?;
        let len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(origin))?;

        Ok(Self::from_parts(source, codec, origin, len))
    }

    fn seek_source(&mut self, offset: u64) -> Result<()> {
        if self.source_position != Some(offset) {
            self.source_position = None;
            self.source.seek(SeekFrom::Start(offset))?;
            self.source_position = Some(offset);
        }
        Ok(())
    }

    /// Read and validate the length prefix at `offset`. `None` at the end of the source.
    fn length_at(&mut self, offset: u64) -> Result<Option<usize>> {
        if self.at_end(offset) {
            return Ok(None);
        }

        self.seek_source(offset)?;
        self.source_position = None;
        let prefix = self
            .source
            .read_array::<4>()
            .map_err(|e| self.truncated_prefix(offset, e))?;
        self.source_position = Some(offset + 4);

        let length = self.check_length(offset, prefix)?;
        self.record(offset, length);

        Ok(Some(length))
    }

    /// Find one more chunk. False once the walk is done.
    fn discover_next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }

        let frontier = self.frontier;
        Ok(self.length_at(frontier)?.is_some())
    }

    /// Total number of chunks, walking the rest of the source the first time
    pub fn chunk_count(&mut self) -> Result<usize> {
        while self.discover_next()? {}
        Ok(self.offsets.len())
    }

    /// Make `index` the next chunk `read_chunk` reads, returning its offset in the source
    pub fn seek_to_chunk(&mut self, index: usize) -> Result<u64> {
        while self.offsets.len() <= index && self.discover_next()? {}

        let offset = self.offset_of(index)?;
        self.position = offset;
        Ok(offset)
    }

    /// Read the chunk at the current position into `dest`, which must hold a full chunk.
    ///
    /// With `decompress` false, compressed chunks are copied as stored. Returns the number of
    /// bytes written, 0 once there are no chunks left.
    pub fn read_chunk(&mut self, dest: &mut [u8], decompress: bool) -> Result<usize> {
        self.check_destination(dest)?;

        let offset = self.position;
        let Some(length) = self.length_at(offset)? else {
            return Ok(0);
        };

        let mut body = self.pool.rent(length);
        self.source_position = None;
        self.source.read_exact(&mut body)?;
        self.source_position = Some(offset + 4 + length as u64);

        // A chunk that fails stays the current one
        let n = self.finish_chunk(offset, &body, dest, decompress)?;
        self.position = offset + 4 + length as u64;
        Ok(n)
    }

    /// `seek_to_chunk` then `read_chunk`
    pub fn read_chunk_at(&mut self, index: usize, dest: &mut [u8], decompress: bool) -> Result<usize> {
        self.seek_to_chunk(index)?;
        self.read_chunk(dest, decompress)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Seek, SeekFrom};

    use byteorder::{LittleEndian, WriteBytesExt};

    use super::ChunkReader;
    use crate::{
        codec::{ZlibCodec, CHUNK_LENGTH},
        error::{Error, ErrorKind},
        test_support::{chunked, noise, zlib, Chunk},
    };

    /// Two raw chunks then a short compressed one
    fn three_chunks() -> (Vec<u8>, [Vec<u8>; 3]) {
        let first = noise(CHUNK_LENGTH, 1);
        let second = noise(CHUNK_LENGTH, 2);
        let third = b"tail of the payload ".repeat(25);

        let source = chunked(&[
            Chunk::Raw(first.clone()),
            Chunk::Raw(second.clone()),
            Chunk::Stored(zlib(&third)),
        ]);

        (source, [first, second, third])
    }

    fn reader(source: Vec<u8>) -> ChunkReader<Cursor<Vec<u8>>> {
        ChunkReader::new(Cursor::new(source), Box::new(ZlibCodec)).unwrap()
    }

    #[test]
    fn test_chunk_count() {
        let (source, _) = three_chunks();
        let mut reader = reader(source);

        assert_eq!(reader.discovered(), 0);
        assert_eq!(reader.chunk_count().unwrap(), 3);
        assert_eq!(reader.chunk_count().unwrap(), 3);
        assert_eq!(reader.discovered(), 3);
    }

    #[test]
    fn test_seek_then_read() {
        let (source, [first, _, third]) = three_chunks();
        let mut reader = reader(source);
        let mut dest = vec![0; CHUNK_LENGTH];

        let offset = reader.seek_to_chunk(2).unwrap();
        assert_eq!(offset, 2 * (4 + CHUNK_LENGTH as u64));
        assert_eq!(reader.discovered(), 3);

        let n = reader.read_chunk(&mut dest, true).unwrap();
        assert_eq!(&dest[..n], &third[..]);

        // Back to an already known chunk
        let n = reader.read_chunk_at(0, &mut dest, true).unwrap();
        assert_eq!(&dest[..n], &first[..]);
    }

    #[test]
    fn test_out_of_range() {
        let (source, _) = three_chunks();
        let mut reader = reader(source);

        let err = reader.seek_to_chunk(5).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { index: 5, count: 3 }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_sequential_reads_then_end() {
        let (source, expected) = three_chunks();
        let mut reader = reader(source);
        let mut dest = vec![0; CHUNK_LENGTH];

        for chunk in &expected {
            let n = reader.read_chunk(&mut dest, true).unwrap();
            assert_eq!(&dest[..n], &chunk[..]);
        }
        assert_eq!(reader.read_chunk(&mut dest, true).unwrap(), 0);
        assert_eq!(reader.read_chunk(&mut dest, true).unwrap(), 0);

        // Sequential reads fill in the index as they go
        assert_eq!(reader.discovered(), 3);
        assert_eq!(reader.chunk_count().unwrap(), 3);
    }

    #[test]
    fn test_read_without_decompressing() {
        let (source, _) = three_chunks();
        let stored = zlib(&b"tail of the payload ".repeat(25));
        let mut reader = reader(source);
        let mut dest = vec![0; CHUNK_LENGTH];

        let n = reader.read_chunk_at(2, &mut dest, false).unwrap();
        assert_eq!(&dest[..n], &stored[..]);
    }

    #[test]
    fn test_starts_at_current_position() {
        let mut source = b"skip me!".to_vec();
        source.extend(chunked(&[Chunk::Stored(zlib(b"abc"))]));

        let mut cursor = Cursor::new(source);
        cursor.seek(SeekFrom::Start(8)).unwrap();
        let mut reader = ChunkReader::new(&mut cursor, Box::new(ZlibCodec)).unwrap();

        let mut dest = vec![0; CHUNK_LENGTH];
        let n = reader.read_chunk(&mut dest, true).unwrap();
        assert_eq!(&dest[..n], b"abc");
        assert_eq!(reader.seek_to_chunk(0).unwrap(), 8);

        // The borrowed cursor is still usable
        drop(reader);
        assert_eq!(cursor.seek(SeekFrom::Start(0)).unwrap(), 0);
    }

    #[test]
    fn test_bad_lengths() {
        let mut source = vec![];
        source.write_i32::<LittleEndian>(-1).unwrap();
        source.extend([0; 8]);
        let err = reader(source).read_chunk(&mut vec![0; CHUNK_LENGTH], true).unwrap_err();
        assert!(matches!(err, Error::InvalidChunkLength { length: -1, .. }));

        let mut source = vec![];
        source.write_u32::<LittleEndian>(CHUNK_LENGTH as u32 + 1).unwrap();
        let err = reader(source).chunk_count().unwrap_err();
        assert!(matches!(err, Error::InvalidChunkLength { offset: 0, .. }));
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn test_truncated_chunk() {
        let mut source = chunked(&[Chunk::Stored(zlib(b"abc"))]);
        source.write_u32::<LittleEndian>(100).unwrap();
        source.extend([0; 10]);

        let err = reader(source).chunk_count().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn test_small_destination() {
        let (source, _) = three_chunks();
        let err = reader(source).read_chunk(&mut [0; 16], true).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_scratch_returned_after_bad_chunk() {
        let source = chunked(&[Chunk::Stored(b"not zlib at all".to_vec())]);
        let mut reader = reader(source);

        let err = reader.read_chunk(&mut vec![0; CHUNK_LENGTH], true).unwrap_err();
        assert!(matches!(err, Error::Decompression { .. }));
        assert_eq!(reader.pool().available(), 1);
    }

    #[test]
    fn test_empty_source() {
        let mut reader = reader(vec![]);
        assert_eq!(reader.chunk_count().unwrap(), 0);
        assert_eq!(reader.read_chunk(&mut vec![0; CHUNK_LENGTH], true).unwrap(), 0);
    }

    #[test]
    fn test_short_chunk_before_the_end() {
        let stored = zlib(&[1; 100]);
        let source = chunked(&[Chunk::Stored(stored.clone()), Chunk::Raw(noise(CHUNK_LENGTH, 4))]);
        let mut reader = reader(source);
        let mut dest = vec![0; CHUNK_LENGTH];

        let err = reader.read_chunk(&mut dest, true).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert_eq!(err.kind(), ErrorKind::Malformed);

        // Still the current chunk, and readable as stored
        assert!(reader.read_chunk(&mut dest, true).is_err());
        let n = reader.read_chunk(&mut dest, false).unwrap();
        assert_eq!(&dest[..n], &stored[..]);
    }

    #[test]
    fn test_truncated_length_prefix() {
        let mut source = chunked(&[Chunk::Stored(zlib(b"abc"))]);
        source.extend([1, 2]);
        let mut reader = reader(source);
        let mut dest = vec![0; CHUNK_LENGTH];

        assert_eq!(reader.read_chunk(&mut dest, true).unwrap(), 3);
        let err = reader.read_chunk(&mut dest, true).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}
