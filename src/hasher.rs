//! MurmurHash64A, the hash behind every resource type and name identifier

use std::hash::{BuildHasher, Hasher};

use murmurhash64::murmur_hash64a;

/// 64-bit hash of raw bytes
pub fn hash64(bytes: &[u8], seed: u64) -> u64 {
    murmur_hash64a(bytes, seed)
}

/// 32-bit hash of raw bytes. Always the upper half of the 64-bit hash.
pub fn hash32(bytes: &[u8], seed: u64) -> u32 {
    derive32(hash64(bytes, seed))
}

/// Upper 32 bits of a 64-bit hash computed elsewhere
pub fn derive32(hash: u64) -> u32 {
    (hash >> 32) as u32
}

pub fn hash64_str(value: &str) -> u64 {
    hash64(value.as_bytes(), 0)
}

pub fn hash32_str(value: &str) -> u32 {
    hash32(value.as_bytes(), 0)
}

/// Accumulates bytes and hashes them all at once on `finish`, so multiple writes hash the
/// same as one write of the concatenation
pub struct MurmurHash64A {
    seed: u64,
    data: Vec<u8>,
}

impl MurmurHash64A {
    pub fn new(seed: u64) -> Self {
        MurmurHash64A { seed, data: vec![] }
    }
}

impl Hasher for MurmurHash64A {
    fn finish(&self) -> u64 {
        hash64(&self.data, self.seed)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.data.extend(bytes);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildMurmurHash64A {
    pub seed: u64,
}

impl BuildHasher for BuildMurmurHash64A {
    type Hasher = MurmurHash64A;

    fn build_hasher(&self) -> Self::Hasher {
        MurmurHash64A::new(self.seed)
    }
}
