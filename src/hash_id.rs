//! Hashed identifiers that remember the string they came from, when known

use std::{
    cmp::Ordering,
    fmt::{self, Debug, Display, LowerHex},
    hash::{Hash, Hasher},
    sync::Arc,
};

use dashmap::DashMap;
use serde::{Serialize, Serializer};

use crate::{
    hash_repository::HashRepository,
    hasher::{hash32, hash64},
};

mod sealed {
    pub trait Sealed {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
}

/// Numeric width of a hash domain. Implemented for `u32` and `u64` only.
pub trait HashValue:
    sealed::Sealed + Copy + Eq + Ord + Hash + LowerHex + Debug + Send + Sync + 'static
{
    /// Bits in the hash, also the domain name used in logs
    const BITS: u32;

    fn of_bytes(bytes: &[u8]) -> Self;

    /// The repository table holding this domain
    fn table(repository: &HashRepository) -> &DashMap<Self, HashId<Self>>;

    fn widen(self) -> u64;
}

impl HashValue for u32 {
    const BITS: u32 = 32;

    fn of_bytes(bytes: &[u8]) -> Self {
        hash32(bytes, 0)
    }

    fn table(repository: &HashRepository) -> &DashMap<Self, HashId<Self>> {
        &repository.ids32
    }

    fn widen(self) -> u64 {
        self as u64
    }
}

impl HashValue for u64 {
    const BITS: u32 = 64;

    fn of_bytes(bytes: &[u8]) -> Self {
        hash64(bytes, 0)
    }

    fn table(repository: &HashRepository) -> &DashMap<Self, HashId<Self>> {
        &repository.ids64
    }

    fn widen(self) -> u64 {
        self
    }
}

/// A hash plus, if known, the string that produced it.
///
/// Equality, ordering and hashing only look at the numeric value. Two ids with the same value
/// and different strings are a collision, see [`HashId::collides_with`].
#[derive(Clone)]
pub struct HashId<H> {
    hash: H,
    name: Option<Arc<str>>,
}

pub type HashId32 = HashId<u32>;
pub type HashId64 = HashId<u64>;

impl<H: HashValue> HashId<H> {
    /// Hash a known string
    pub fn new(name: &str) -> Self {
        Self {
            hash: H::of_bytes(name.as_bytes()),
            name: Some(name.into()),
        }
    }

    /// Pair a hash with a string without checking they match, e.g. from a dictionary file
    pub fn with_name(hash: H, name: impl Into<Arc<str>>) -> Self {
        Self {
            hash,
            name: Some(name.into()),
        }
    }

    /// A raw value read from a file, string not yet looked up
    pub fn unresolved(hash: H) -> Self {
        Self { hash, name: None }
    }

    pub fn hash(&self) -> H {
        self.hash
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn name_arc(&self) -> Option<&Arc<str>> {
        self.name.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.name.is_some()
    }

    /// Same hash, different non-null strings
    pub fn collides_with(&self, other: &Self) -> bool {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => self.hash == other.hash && a != b,
            _ => false,
        }
    }
}

impl<H: PartialEq> PartialEq for HashId<H> {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl<H: Eq> Eq for HashId<H> {}

impl<H: Ord> PartialOrd for HashId<H> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<H: Ord> Ord for HashId<H> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash.cmp(&other.hash)
    }
}

impl<H: Hash> Hash for HashId<H> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.hash.hash(state);
    }
}

impl<H: HashValue> Display for HashId<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None => {
                let width = (H::BITS / 4) as usize;
                write!(f, "#{:0width$x}", self.hash)
            }
        }
    }
}

impl<H: HashValue> Debug for HashId<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = (H::BITS / 4) as usize;
        match &self.name {
            Some(name) => write!(f, "{:0width$x}({name:?})", self.hash),
            None => write!(f, "{:0width$x}", self.hash),
        }
    }
}

impl<H: HashValue> Serialize for HashId<H> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
