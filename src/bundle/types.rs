use std::{fmt::Display, str::FromStr};

use bytes::Bytes;
use serde::Serialize;

use super::BundleVersion;
use crate::{
    error::{Error, Result},
    hash_id::HashId64,
};

/// Number of property slots in every bundle header
pub const PROPERTY_COUNT: usize = 32;

/// Identifies one resource within a bundle
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceLocator {
    pub resource_type: HashId64,
    pub name: HashId64,
}

/// `name.type`, the way resources are usually referred to
impl Display for ResourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.name, self.resource_type)
    }
}

/// Either a string to hash, or `#` and a hex hash
fn parse_part(part: &str) -> Result<HashId64> {
    match part.strip_prefix('#') {
        Some(hex) => u64::from_str_radix(hex, 16)
            .map(HashId64::unresolved)
            .map_err(|e| Error::invalid_data(format!("Bad hash {part:?}: {e}"))),
        None if part.is_empty() => Err(Error::invalid_data("Empty locator part")),
        None => Ok(HashId64::new(part)),
    }
}

/// Parses the `name.type` form that `Display` prints. The type is everything after the last dot.
impl FromStr for ResourceLocator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, resource_type) = s
            .rsplit_once('.')
            .ok_or_else(|| Error::invalid_data(format!("Expected name.type, got {s:?}")))?;

        Ok(ResourceLocator {
            resource_type: parse_part(resource_type)?,
            name: parse_part(name)?,
        })
    }
}

/// One directory slot
#[derive(Debug, Clone, Serialize)]
pub struct ResourceEntry {
    pub locator: ResourceLocator,
    pub flags: u32,
    /// Total size across variants. Not stored by V4.
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleHeader {
    pub version: BundleVersion,
    pub uncompressed_size: i64,
    pub compressed: bool,
    /// Meaning unknown, kept as read
    pub properties: [HashId64; PROPERTY_COUNT],
    pub directory: Vec<ResourceEntry>,
}

impl BundleHeader {
    pub fn resource_count(&self) -> usize {
        self.directory.len()
    }
}

/// Opaque language tag of a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Language(pub u32);

impl Language {
    pub const DEFAULT: Language = Language(0);
}

/// One payload of a resource, bytes left as stored
#[derive(Debug, Clone, Serialize)]
pub struct Variant {
    pub language: Language,
    pub size: u32,
    pub stream_size: u32,
    #[serde(skip)]
    pub data: Bytes,
}

#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub locator: ResourceLocator,
    pub stream_offset: u32,
    pub variants: Vec<Variant>,
}

impl Resource {
    pub fn variant(&self, language: Language) -> Option<&Variant> {
        self.variants.iter().find(|v| v.language == language)
    }
}

/// A fully read bundle
#[derive(Debug, Clone, Serialize)]
pub struct Bundle {
    pub header: BundleHeader,
    pub resources: Vec<Resource>,
}

impl Bundle {
    pub fn resource(&self, locator: &ResourceLocator) -> Option<&Resource> {
        self.resources.iter().find(|r| &r.locator == locator)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }
}
