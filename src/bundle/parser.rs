use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use winnow::{
    binary::{le_i64, le_u32},
    combinator::trace,
    Parser,
};

use super::{types::*, BundleVersion};
use crate::{
    chunk::{check_cancelled, ChunkReader, ChunkStream},
    codec::codec_for,
    error::{Error, Result, Stage, StageContext},
    hash_repository::HashRepository,
    options::ReaderOptions,
};

/// Version tag and declared size
const META_LENGTH: usize = 12;

/// Upper bound on up-front allocations driven by counts read from the file
const MAX_PREALLOCATED: usize = 1024;

/// A bundle is compressed if it takes up less room than it says it holds. Uncompressed bundles
/// are padded up to at least their declared size.
pub fn is_compressed(physical_len: u64, declared_size: i64) -> bool {
    i128::from(physical_len) < i128::from(declared_size)
}

struct Meta {
    version: BundleVersion,
    declared_size: i64,
    compressed: bool,
}

fn meta_fields(input: &mut &[u8]) -> winnow::Result<(u32, i64)> {
    trace("meta", (le_u32, le_i64)).parse_next(input)
}

fn parse_meta(prefix: &[u8; META_LENGTH], physical_len: u64) -> Result<Meta> {
    let (tag, declared_size) = meta_fields
        .parse(&prefix[..])
        .map_err(|e| Error::invalid_data(format!("Failed to parse meta: {e:?}")))?;

    let version = BundleVersion::from_tag(tag)?;
    if declared_size < 0 {
        return Err(Error::invalid_data(format!(
            "Negative uncompressed size {declared_size}"
        )));
    }

    let compressed = is_compressed(physical_len, declared_size);
    debug!(%version, declared_size, physical_len, compressed, "Read bundle meta");

    Ok(Meta {
        version,
        declared_size,
        compressed,
    })
}

fn check_size(physical_len: u64) -> Result<()> {
    if physical_len < META_LENGTH as u64 {
        return Err(Error::TooSmall { len: physical_len });
    }
    Ok(())
}

/// Read the meta block at the source's current position
fn read_meta<R: Read + Seek>(source: &mut R) -> Result<Meta> {
    let origin = source.stream_position()?;
    let physical_len = source.seek(SeekFrom::End(0))? - origin;
    source.seek(SeekFrom::Start(origin))?;

    check_size(physical_len)?;
    let mut prefix = [0; META_LENGTH];
    source.read_exact(&mut prefix)?;

    parse_meta(&prefix, physical_len)
}

async fn read_meta_async<R: AsyncRead + AsyncSeek + Unpin>(source: &mut R) -> Result<Meta> {
    let origin = source.stream_position().await?;
    let physical_len = source.seek(SeekFrom::End(0)).await? - origin;
    source.seek(SeekFrom::Start(origin)).await?;

    check_size(physical_len)?;
    let mut prefix = [0; META_LENGTH];
    source.read_exact(&mut prefix).await?;

    parse_meta(&prefix, physical_len)
}

/// Everything after the meta block, decompressed if need be. Borrows the source.
fn logical_stream<'a, R: Read + Seek>(
    source: &'a mut R,
    meta: &Meta,
    options: &ReaderOptions,
) -> Result<Box<dyn Read + 'a>> {
    if !meta.compressed {
        return Ok(Box::new(source));
    }

    let codec = codec_for(meta.version, options.codec_dictionary.as_deref())?;
    let reader = ChunkReader::new(source, codec)?;
    Ok(Box::new(ChunkStream::new(reader, options.read_ahead)))
}

fn read_locator(reader: &mut dyn Read, repository: &HashRepository) -> Result<ResourceLocator> {
    let resource_type = reader.read_u64::<LittleEndian>()?;
    let name = reader.read_u64::<LittleEndian>()?;

    Ok(ResourceLocator {
        resource_type: repository.get_or_create(resource_type),
        name: repository.get_or_create(name),
    })
}

pub(crate) fn entry_without_size(
    reader: &mut dyn Read,
    repository: &HashRepository,
) -> Result<ResourceEntry> {
    Ok(ResourceEntry {
        locator: read_locator(reader, repository)?,
        flags: reader.read_u32::<LittleEndian>()?,
        size: None,
    })
}

pub(crate) fn entry_with_size(
    reader: &mut dyn Read,
    repository: &HashRepository,
) -> Result<ResourceEntry> {
    let mut entry = entry_without_size(reader, repository)?;
    entry.size = Some(reader.read_u32::<LittleEndian>()?);
    Ok(entry)
}

/// Resource count, properties, and the directory
fn read_directory(
    reader: &mut dyn Read,
    meta: &Meta,
    repository: &HashRepository,
) -> Result<BundleHeader> {
    let count = reader.read_i32::<LittleEndian>()?;
    let count = usize::try_from(count)
        .map_err(|_| Error::invalid_data(format!("Negative resource count {count}")))?;

    let mut raw_properties = [0; PROPERTY_COUNT];
    reader.read_u64_into::<LittleEndian>(&mut raw_properties)?;
    let properties = raw_properties.map(|hash| repository.get_or_create(hash));

    let read_entry = meta.version.layout().read_entry;
    let mut directory = Vec::with_capacity(count.min(MAX_PREALLOCATED));
    for _ in 0..count {
        directory.push(read_entry(reader, repository)?);
    }
    debug!(resources = count, "Read bundle directory");

    Ok(BundleHeader {
        version: meta.version,
        uncompressed_size: meta.declared_size,
        compressed: meta.compressed,
        properties,
        directory,
    })
}

fn read_variant(reader: &mut dyn Read) -> Result<Variant> {
    let language = Language(reader.read_u32::<LittleEndian>()?);
    let size = reader.read_u32::<LittleEndian>()?;
    let stream_size = reader.read_u32::<LittleEndian>()?;

    // Grows as bytes arrive, so a bogus size runs out of data instead of memory
    let mut data = Vec::new();
    Read::take(&mut *reader, u64::from(size)).read_to_end(&mut data)?;
    if data.len() < size as usize {
        return Err(Error::EndOfData);
    }

    Ok(Variant {
        language,
        size,
        stream_size,
        data: Bytes::from(data),
    })
}

fn read_resource(
    reader: &mut dyn Read,
    entry: &ResourceEntry,
    repository: &HashRepository,
) -> Result<Resource> {
    let locator = read_locator(reader, repository)?;
    if locator != entry.locator {
        return Err(Error::invalid_data(format!(
            "Resource {locator} does not match its directory entry {}",
            entry.locator
        )));
    }

    let variant_count = reader.read_u32::<LittleEndian>()?;
    let stream_offset = reader.read_u32::<LittleEndian>()?;

    let mut variants = Vec::with_capacity((variant_count as usize).min(MAX_PREALLOCATED));
    for _ in 0..variant_count {
        variants.push(read_variant(reader)?);
    }

    Ok(Resource {
        locator,
        stream_offset,
        variants,
    })
}

fn read_resources(
    reader: &mut dyn Read,
    header: &BundleHeader,
    repository: &HashRepository,
) -> Result<Vec<Resource>> {
    let resources = header
        .directory
        .iter()
        .map(|entry| read_resource(reader, entry, repository))
        .collect::<Result<Vec<_>>>()?;

    debug!(resources = resources.len(), "Read bundle resources");
    Ok(resources)
}

/// Read the meta block and directory, leaving resource records alone.
///
/// `source` is read from its current position.
pub fn read_header<R: Read + Seek>(
    source: &mut R,
    options: &ReaderOptions,
    repository: &HashRepository,
) -> Result<BundleHeader> {
    let meta = read_meta(source).stage(Stage::Meta)?;
    let mut stream = logical_stream(source, &meta, options).stage(Stage::Stream)?;

    read_directory(&mut stream, &meta, repository).stage(Stage::Directory)
}

/// Read a whole bundle from `source`'s current position
pub fn read_bundle<R: Read + Seek>(
    source: &mut R,
    options: &ReaderOptions,
    repository: &HashRepository,
) -> Result<Bundle> {
    let meta = read_meta(source).stage(Stage::Meta)?;
    let mut stream = logical_stream(source, &meta, options).stage(Stage::Stream)?;

    let header = read_directory(&mut stream, &meta, repository).stage(Stage::Directory)?;
    let resources = read_resources(&mut stream, &header, repository).stage(Stage::Resources)?;

    Ok(Bundle { header, resources })
}

/// Pull the logical stream into memory through tokio, then parse it in one go. Chunk failures
/// are reported at the stream stage, since nothing has been parsed yet.
pub async fn read_bundle_async<R: AsyncRead + AsyncSeek + Unpin>(
    source: &mut R,
    options: &ReaderOptions,
    repository: &HashRepository,
    cancel: &CancellationToken,
) -> Result<Bundle> {
    check_cancelled(cancel)?;
    let meta = read_meta_async(source).await.stage(Stage::Meta)?;

    let mut logical = Vec::new();
    if meta.compressed {
        let codec =
            codec_for(meta.version, options.codec_dictionary.as_deref()).stage(Stage::Stream)?;
        let reader = ChunkReader::new_async(&mut *source, codec)
            .await
            .stage(Stage::Stream)?;

        ChunkStream::new(reader, options.read_ahead)
            .read_to_end_async(&mut logical, cancel)
            .await
            .stage(Stage::Stream)?;
    } else {
        source.read_to_end(&mut logical).await.stage(Stage::Stream)?;
    }
    check_cancelled(cancel)?;

    let mut stream: &[u8] = &logical;
    let header = read_directory(&mut stream, &meta, repository).stage(Stage::Directory)?;
    let resources = read_resources(&mut stream, &header, repository).stage(Stage::Resources)?;

    Ok(Bundle { header, resources })
}
