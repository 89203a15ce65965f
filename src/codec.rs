//! Pluggable chunk decompressors, and the table picking one per bundle version

use flate2::{Decompress, FlushDecompress, Status};
use zstd::{bulk::Decompressor, dict::DecoderDictionary};

use crate::{
    bundle::{BundleVersion, CodecKind},
    error::{Error, Result},
};

/// Uncompressed size of every chunk but possibly the last
pub const CHUNK_LENGTH: usize = 0x10000;

pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fixed size a chunk inflates to. A chunk stored with exactly this length is raw.
    fn uncompressed_chunk_length(&self) -> usize;

    /// Inflate `src` into `dst`, returning the bytes written
    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ZlibCodec;

impl Codec for ZlibCodec {
    fn name(&self) -> &'static str {
        "zlib"
    }

    fn uncompressed_chunk_length(&self) -> usize {
        CHUNK_LENGTH
    }

    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        let mut inflater = Decompress::new(true);
        let status = inflater
            .decompress(src, dst, FlushDecompress::Finish)
            .map_err(|e| Error::Decompression {
                codec: self.name(),
                message: e.to_string(),
            })?;

        match status {
            Status::StreamEnd => Ok(inflater.total_out() as usize),
            // Out of room or out of input before the end of the stream
            Status::Ok | Status::BufError => Err(Error::Decompression {
                codec: self.name(),
                message: format!(
                    "stream did not end within {} bytes of output",
                    dst.len()
                ),
            }),
        }
    }
}

/// zstd with a dictionary that ships separately from the bundles
pub struct ZstdCodec {
    dictionary: DecoderDictionary<'static>,
}

impl ZstdCodec {
    pub fn new(dictionary: &[u8]) -> Self {
        Self {
            dictionary: DecoderDictionary::copy(dictionary),
        }
    }
}

impl Codec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn uncompressed_chunk_length(&self) -> usize {
        CHUNK_LENGTH
    }

    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        let error = |e: std::io::Error| Error::Decompression {
            codec: "zstd",
            message: e.to_string(),
        };

        let mut decompressor = Decompressor::with_prepared_dictionary(&self.dictionary).map_err(error)?;
        decompressor.decompress_to_buffer(src, dst).map_err(error)
    }
}

/// The codec a bundle version compresses its chunks with
pub fn codec_for(version: BundleVersion, dictionary: Option<&[u8]>) -> Result<Box<dyn Codec>> {
    match version.codec() {
        CodecKind::Zlib => Ok(Box::new(ZlibCodec)),
        CodecKind::ZstdDictionary => {
            let dictionary = dictionary.ok_or(Error::MissingDictionary(version))?;
            Ok(Box::new(ZstdCodec::new(dictionary)))
        }
    }
}
