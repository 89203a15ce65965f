use std::{fmt::Display, io::Read};

use serde::Serialize;

use super::{
    parser::{entry_with_size, entry_without_size},
    types::ResourceEntry,
};
use crate::{
    error::{Error, Result},
    hash_repository::HashRepository,
};

/// Every bundle version this reader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BundleVersion {
    V4,
    V5,
    V6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CodecKind {
    /// Fixed 64 KiB chunks
    Zlib,
    /// Needs a dictionary from outside the bundle
    ZstdDictionary,
}

pub(crate) type EntryReader = fn(&mut dyn Read, &HashRepository) -> Result<ResourceEntry>;

/// How one version lays out its bytes
pub struct VersionLayout {
    pub version: BundleVersion,
    pub tag: u32,
    pub codec: CodecKind,
    pub(crate) read_entry: EntryReader,
}

/// Not every value between the lowest and highest tag is a real version, so this is an
/// allow-list rather than a range.
const LAYOUTS: &[VersionLayout] = &[
    VersionLayout {
        version: BundleVersion::V4,
        tag: 0xf000_0004,
        codec: CodecKind::Zlib,
        read_entry: entry_without_size,
    },
    VersionLayout {
        version: BundleVersion::V5,
        tag: 0xf000_0005,
        codec: CodecKind::Zlib,
        read_entry: entry_with_size,
    },
    VersionLayout {
        version: BundleVersion::V6,
        tag: 0xf000_0006,
        codec: CodecKind::ZstdDictionary,
        read_entry: entry_with_size,
    },
];

impl BundleVersion {
    pub const MIN: BundleVersion = BundleVersion::V4;

    pub fn from_tag(tag: u32) -> Result<Self> {
        LAYOUTS
            .iter()
            .find(|layout| layout.tag == tag)
            .map(|layout| layout.version)
            .ok_or(Error::UnsupportedVersion(tag))
    }

    pub fn layout(self) -> &'static VersionLayout {
        LAYOUTS
            .iter()
            .find(|layout| layout.version == self)
            .unwrap_or_else(|| unreachable!("every version has a layout"))
    }

    pub fn tag(self) -> u32 {
        self.layout().tag
    }

    pub fn codec(self) -> CodecKind {
        self.layout().codec
    }
}

impl Display for BundleVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({:#010x})", self, self.tag())
    }
}
