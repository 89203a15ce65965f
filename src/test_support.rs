//! Builders for synthetic chunk runs and bundles

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::{write::ZlibEncoder, Compression};

use crate::{
    bundle::{BundleVersion, PROPERTY_COUNT},
    codec::CHUNK_LENGTH,
    hasher::hash64_str,
};

const META_LENGTH: usize = 12;

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(vec![], Compression::best());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn zstd_with_dictionary(data: &[u8], dictionary: &[u8]) -> Vec<u8> {
    zstd::bulk::Compressor::with_dictionary(3, dictionary)
        .unwrap()
        .compress(data)
        .unwrap()
}

/// Deterministic bytes that don't compress
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 56) as u8
        })
        .collect()
}

pub enum Chunk {
    /// Stored uncompressed, zero-padded to a full chunk
    Raw(Vec<u8>),
    /// Stored exactly as given
    Stored(Vec<u8>),
}

/// `[u32 length][bytes]` for each chunk
pub fn chunked(chunks: &[Chunk]) -> Vec<u8> {
    let mut out = vec![];
    for chunk in chunks {
        let body = match chunk {
            Chunk::Raw(data) => {
                assert!(data.len() <= CHUNK_LENGTH);
                let mut padded = data.clone();
                padded.resize(CHUNK_LENGTH, 0);
                padded
            }
            Chunk::Stored(data) => data.clone(),
        };
        out.write_u32::<LittleEndian>(body.len() as u32).unwrap();
        out.extend(body);
    }
    out
}

pub struct TestResource {
    pub name: String,
    pub resource_type: String,
    pub variants: Vec<(u32, Vec<u8>)>,
}

impl TestResource {
    pub fn new(name: &str, resource_type: &str, variants: Vec<(u32, Vec<u8>)>) -> Self {
        Self {
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            variants,
        }
    }

    fn write_locator(&self, out: &mut Vec<u8>) {
        out.write_u64::<LittleEndian>(hash64_str(&self.resource_type)).unwrap();
        out.write_u64::<LittleEndian>(hash64_str(&self.name)).unwrap();
    }
}

/// Directory and records as they appear once decompressed
pub fn logical_stream(version: BundleVersion, resources: &[TestResource]) -> Vec<u8> {
    let mut out = vec![];
    out.write_i32::<LittleEndian>(resources.len() as i32).unwrap();
    for _ in 0..PROPERTY_COUNT {
        out.write_u64::<LittleEndian>(0).unwrap();
    }

    for resource in resources {
        resource.write_locator(&mut out);
        out.write_u32::<LittleEndian>(0).unwrap();
        if version != BundleVersion::V4 {
            let total: usize = resource.variants.iter().map(|(_, data)| data.len()).sum();
            out.write_u32::<LittleEndian>(total as u32).unwrap();
        }
    }

    for resource in resources {
        resource.write_locator(&mut out);
        out.write_u32::<LittleEndian>(resource.variants.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();

        for (language, data) in &resource.variants {
            out.write_u32::<LittleEndian>(*language).unwrap();
            out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
            out.extend(data);
        }
    }

    out
}

fn meta(version: BundleVersion, declared_size: usize) -> Vec<u8> {
    let mut out = vec![];
    out.write_u32::<LittleEndian>(version.tag()).unwrap();
    out.write_i64::<LittleEndian>(declared_size as i64).unwrap();
    out
}

/// Meta block and logical stream, zero-padded to `total_len`, which is also the declared size
pub fn uncompressed_bundle(version: BundleVersion, logical: &[u8], total_len: usize) -> Vec<u8> {
    let mut out = meta(version, total_len);
    out.extend(logical);
    assert!(out.len() <= total_len);
    out.resize(total_len, 0);
    out
}

/// Each chunk compressed with `compress`, unless that doesn't make it smaller. `raw_first`
/// forces the first chunk to be stored raw.
pub fn compressed_bundle(
    version: BundleVersion,
    logical: &[u8],
    compress: impl Fn(&[u8]) -> Vec<u8>,
    raw_first: bool,
) -> Vec<u8> {
    let chunks: Vec<_> = logical
        .chunks(CHUNK_LENGTH)
        .enumerate()
        .map(|(i, piece)| {
            let compressed = compress(piece);
            if (i == 0 && raw_first) || compressed.len() >= CHUNK_LENGTH {
                Chunk::Raw(piece.to_vec())
            } else {
                Chunk::Stored(compressed)
            }
        })
        .collect();

    let mut out = meta(version, META_LENGTH + logical.len());
    out.extend(chunked(&chunks));
    assert!(out.len() < META_LENGTH + logical.len(), "test bundle didn't compress");
    out
}
