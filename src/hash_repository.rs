//! Thread-safe lookup from hash values back to the strings that produced them

use std::sync::{Arc, OnceLock};

use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;
use tracing::warn;

use crate::{
    error::{Error, Result},
    hash_id::{HashId, HashId64, HashValue},
};

/// Two different strings claimed the same hash. The stored one was kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub bits: u32,
    pub hash: u64,
    pub kept: Arc<str>,
    pub rejected: Arc<str>,
}

/// Insert-only table of known hash strings, one per hash width.
///
/// The first entry stored for a hash wins for the lifetime of the table. Every operation can be
/// called concurrently without outside locking.
#[derive(Debug, Default)]
pub struct HashRepository {
    pub(crate) ids32: DashMap<u32, HashId<u32>>,
    pub(crate) ids64: DashMap<u64, HashId<u64>>,
    collisions: Mutex<Vec<Collision>>,
}

static GLOBAL: OnceLock<HashRepository> = OnceLock::new();

impl HashRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared process-wide table, for callers that don't want to thread their own through
    pub fn global() -> &'static HashRepository {
        GLOBAL.get_or_init(HashRepository::new)
    }

    pub fn contains<H: HashValue>(&self, hash: H) -> bool {
        H::table(self).contains_key(&hash)
    }

    pub fn get<H: HashValue>(&self, hash: H) -> Result<HashId<H>> {
        self.try_get(hash)
            .ok_or_else(|| Error::NotFound(format!("{hash:#x}")))
    }

    pub fn try_get<H: HashValue>(&self, hash: H) -> Option<HashId<H>> {
        H::table(self).get(&hash).map(|entry| entry.value().clone())
    }

    /// The stored id, or an unresolved one wrapping `hash`. Never inserts.
    pub fn get_or_create<H: HashValue>(&self, hash: H) -> HashId<H> {
        self.try_get(hash)
            .unwrap_or_else(|| HashId::unresolved(hash))
    }

    pub fn add<H: HashValue>(&self, id: HashId<H>) -> Result<()> {
        let hash = id.hash();
        if self.try_add(id) {
            Ok(())
        } else {
            Err(Error::AlreadyExists(format!("{hash:#x}")))
        }
    }

    /// Insert unless the hash is already present. A different string for an existing hash is
    /// logged and recorded as a collision, the stored entry is left alone.
    pub fn try_add<H: HashValue>(&self, id: HashId<H>) -> bool {
        // The shard lock is held from lookup to insert
        let collision = match H::table(self).entry(id.hash()) {
            Entry::Vacant(slot) => {
                slot.insert(id);
                return true;
            }
            Entry::Occupied(existing) => {
                let existing = existing.get();
                match (existing.name_arc(), id.name_arc()) {
                    (Some(kept), Some(rejected)) if kept != rejected => Collision {
                        bits: H::BITS,
                        hash: id.hash().widen(),
                        kept: kept.clone(),
                        rejected: rejected.clone(),
                    },
                    _ => return false,
                }
            }
        };

        warn!(
            hash = %format_args!("{:x}", collision.hash),
            bits = collision.bits,
            kept = %collision.kept,
            rejected = %collision.rejected,
            "Hash collision"
        );
        self.collisions.lock().push(collision);

        false
    }

    /// Hash a name into the 64-bit domain and store it. Returns whichever entry ends up stored.
    pub fn insert_name(&self, name: &str) -> HashId64 {
        let id = HashId64::new(name);
        let hash = id.hash();
        self.try_add(id);
        self.get_or_create(hash)
    }

    /// Entries across both widths
    pub fn len(&self) -> usize {
        self.ids32.len() + self.ids64.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn collisions(&self) -> Vec<Collision> {
        self.collisions.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use rayon::iter::{IntoParallelIterator, ParallelIterator};

    use super::HashRepository;
    use crate::{
        error::{Error, ErrorKind},
        hash_id::{HashId32, HashId64},
    };

    #[test]
    fn test_first_writer_wins() {
        let repo = HashRepository::new();

        assert!(repo.try_add(HashId64::with_name(5, "a")));
        assert!(!repo.try_add(HashId64::with_name(5, "b")));

        assert_eq!(repo.get(5_u64).unwrap().name(), Some("a"));

        let collisions = repo.collisions();
        assert_eq!(collisions.len(), 1);
        assert_eq!(&*collisions[0].kept, "a");
        assert_eq!(&*collisions[0].rejected, "b");
        assert_eq!(collisions[0].bits, 64);
    }

    #[test]
    fn test_same_value_twice_is_not_a_collision() {
        let repo = HashRepository::new();

        assert!(repo.try_add(HashId64::with_name(5, "a")));
        assert!(!repo.try_add(HashId64::with_name(5, "a")));

        assert!(repo.collisions().is_empty());
    }

    #[test]
    fn test_add_rejects_existing() {
        let repo = HashRepository::new();

        repo.add(HashId32::new("lua")).unwrap();
        let err = repo.add(HashId32::new("lua")).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[test]
    fn test_lookups() {
        let repo = HashRepository::new();
        let id = repo.insert_name("unit");

        assert!(repo.contains(id.hash()));
        assert!(!repo.contains(id.hash() as u32));
        assert_eq!(repo.try_get(0xe0a48d0be9a7453f_u64).unwrap().name(), Some("unit"));

        let err = repo.get(1_u64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(repo.try_get(1_u32).is_none());
    }

    #[test]
    fn test_get_or_create_does_not_insert() {
        let repo = HashRepository::new();

        let id = repo.get_or_create(42_u64);
        assert_eq!(id.hash(), 42);
        assert!(!id.is_resolved());
        assert!(repo.is_empty());
    }

    #[test]
    fn test_domains_are_separate() {
        let repo = HashRepository::new();
        repo.add(HashId32::with_name(7, "thirty-two")).unwrap();
        repo.add(HashId64::with_name(7, "sixty-four")).unwrap();

        assert_eq!(repo.get(7_u32).unwrap().name(), Some("thirty-two"));
        assert_eq!(repo.get(7_u64).unwrap().name(), Some("sixty-four"));
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_concurrent_try_add_has_one_winner() {
        let repo = HashRepository::new();

        let winners = (0..64)
            .into_par_iter()
            .filter(|i| repo.try_add(HashId64::with_name(99, format!("name{i}"))))
            .count();

        assert_eq!(winners, 1);
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.collisions().len(), 63);
    }

    #[test]
    fn test_global_is_shared() {
        let a = HashRepository::global() as *const _;
        let b = HashRepository::global() as *const _;
        assert_eq!(a, b);
    }
}
