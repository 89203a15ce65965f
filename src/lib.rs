pub mod binary;
pub mod bundle;
pub mod chunk;
pub mod codec;
pub mod commands;
pub mod dictionary;
pub mod error;
pub mod hash_id;
pub mod hash_repository;
pub mod hasher;
pub mod options;
pub mod pool;

#[cfg(test)]
mod test_support;

pub use bundle::{Bundle, BundleHeader, BundleVersion};
pub use error::{Error, ErrorKind, Result};
pub use hash_id::{HashId, HashId32, HashId64};
pub use hash_repository::HashRepository;
pub use options::ReaderOptions;
