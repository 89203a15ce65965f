//! Bundle archives: a 12-byte meta block, then a directory and resource records, stored either
//! as is or as a run of compressed chunks

use std::io::{Read, Seek};

use tokio::io::{AsyncRead, AsyncSeek};
use tokio_util::sync::CancellationToken;

use crate::{error::Result, hash_repository::HashRepository, options::ReaderOptions};

pub mod parser;
pub mod types;
mod version;

pub use parser::{is_compressed, read_header};
pub use types::*;
pub use version::{BundleVersion, CodecKind, VersionLayout};

impl Bundle {
    /// Read every resource. Nothing is kept from a failed open.
    ///
    /// Pass `&mut source` to keep using the source afterwards.
    pub fn open<R: Read + Seek>(
        mut source: R,
        options: &ReaderOptions,
        repository: &HashRepository,
    ) -> Result<Self> {
        parser::read_bundle(&mut source, options, repository)
    }

    /// Cancellation is checked before each chunk
    pub async fn open_async<R: AsyncRead + AsyncSeek + Unpin>(
        mut source: R,
        options: &ReaderOptions,
        repository: &HashRepository,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        parser::read_bundle_async(&mut source, options, repository, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tokio_util::sync::CancellationToken;

    use super::{Bundle, BundleVersion};
    use crate::{
        hash_repository::HashRepository,
        options::ReaderOptions,
        test_support::{compressed_bundle, logical_stream, zlib, TestResource},
    };

    fn bundle_bytes() -> Vec<u8> {
        let resources = [TestResource::new("units/box", "unit", vec![(0, b"box".repeat(90))])];
        let logical = logical_stream(BundleVersion::V5, &resources);
        compressed_bundle(BundleVersion::V5, &logical, zlib, false)
    }

    #[test]
    fn test_open_leaves_source_with_caller() {
        let repository = HashRepository::new();
        repository.insert_name("units/box");
        repository.insert_name("unit");

        let mut cursor = Cursor::new(bundle_bytes());
        let bundle = Bundle::open(&mut cursor, &ReaderOptions::default(), &repository).unwrap();

        let names: Vec<_> = bundle.resources().map(|r| r.locator.to_string()).collect();
        assert_eq!(names, ["units/box.unit"]);

        // Still ours
        cursor.set_position(0);
        assert!(Bundle::open(cursor, &ReaderOptions::default(), &repository).is_ok());
    }

    #[tokio::test]
    async fn test_open_async() {
        let repository = HashRepository::new();
        let bundle = Bundle::open_async(
            Cursor::new(bundle_bytes()),
            &ReaderOptions::default(),
            &repository,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(&bundle.resources[0].variants[0].data[..], &b"box".repeat(90)[..]);
        assert!(!bundle.resources[0].locator.name.is_resolved());
    }
}
