//! In-process selector table.
//!
//! [`LocalSelectorTable`] implements [`SelectorRuntime`] without an
//! Objective-C runtime. Names are interned into leaked, never-freed entries
//! whose addresses serve as the selector handles, so handles stay valid for
//! the whole program.
//!
//! # Sharding
//!
//! The table is split into `NUM_SHARDS` (16) shards, each with its own
//! `RwLock` and `BUCKETS_PER_SHARD` (256) bucket chains:
//!
//! - shard: `hash & SHARD_MASK`
//! - bucket: `(hash >> 4) & BUCKET_MASK`
//!
//! A lookup hit takes one shard read lock; a miss takes one shard write lock.

// Allow cast truncation - only the low bits of the hash select shard and bucket
#![allow(clippy::cast_possible_truncation)]

use std::ffi::c_void;
use std::hash::{Hash, Hasher};
use std::ptr::NonNull;
use std::sync::{OnceLock, PoisonError, RwLock};

use fxhash::FxHasher;
use hashbrown::HashSet;

use super::selector::{SelectorHandle, SelectorRuntime};
use crate::error::{Error, Result};

/// Number of shards (power of 2 for bit masking).
const NUM_SHARDS: usize = 16;

/// Bucket chains per shard (power of 2 for bit masking).
const BUCKETS_PER_SHARD: usize = 256;

const SHARD_MASK: usize = NUM_SHARDS - 1;
const BUCKET_MASK: usize = BUCKETS_PER_SHARD - 1;
const SHARD_BITS: u32 = NUM_SHARDS.trailing_zeros();

/// One interned name. Leaked on creation and never freed.
struct InternedSelector {
    name: Box<str>,
    /// Precomputed `FxHash` of the name
    hash: u64,
    /// Next entry in the same bucket
    next: Option<&'static InternedSelector>,
}

impl InternedSelector {
    fn handle(&'static self) -> SelectorHandle {
        SelectorHandle::from_non_null(NonNull::from(self).cast::<c_void>())
    }
}

struct SelectorShard {
    buckets: RwLock<Vec<Option<&'static InternedSelector>>>,
    /// Addresses of every entry in this shard, for validating handles
    issued: RwLock<HashSet<usize, fxhash::FxBuildHasher>>,
}

impl SelectorShard {
    fn new() -> Self {
        SelectorShard {
            buckets: RwLock::new(vec![None; BUCKETS_PER_SHARD]),
            issued: RwLock::new(HashSet::default()),
        }
    }
}

/// A self-contained selector runtime.
///
/// Every table issues its own handles: the same name registered in two
/// tables yields two different handles.
pub struct LocalSelectorTable {
    shards: [SelectorShard; NUM_SHARDS],
}

static GLOBAL_TABLE: OnceLock<LocalSelectorTable> = OnceLock::new();

fn hash_name(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    hasher.finish()
}

fn find(
    mut current: Option<&'static InternedSelector>,
    name: &str,
    hash: u64,
) -> Option<&'static InternedSelector> {
    while let Some(entry) = current {
        if entry.hash == hash && &*entry.name == name {
            return Some(entry);
        }
        current = entry.next;
    }
    None
}

impl LocalSelectorTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        LocalSelectorTable {
            shards: std::array::from_fn(|_| SelectorShard::new()),
        }
    }

    /// The process-wide table, used by the default selector interner.
    pub fn global() -> &'static LocalSelectorTable {
        GLOBAL_TABLE.get_or_init(LocalSelectorTable::new)
    }

    /// Interns `name`, returning its stable entry.
    fn intern(&self, name: &str) -> &'static InternedSelector {
        let hash = hash_name(name);
        let shard = &self.shards[(hash as usize) & SHARD_MASK];
        let bucket_idx = ((hash >> SHARD_BITS) as usize) & BUCKET_MASK;

        // Fast path: read lock on one shard
        {
            let buckets = shard.buckets.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = find(buckets[bucket_idx], name, hash) {
                return entry;
            }
        }

        let mut buckets = shard.buckets.write().unwrap_or_else(PoisonError::into_inner);

        // Double-check: another thread may have inserted while we waited
        if let Some(entry) = find(buckets[bucket_idx], name, hash) {
            return entry;
        }

        let entry: &'static InternedSelector = Box::leak(Box::new(InternedSelector {
            name: name.into(),
            hash,
            next: buckets[bucket_idx],
        }));
        shard
            .issued
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(std::ptr::from_ref(entry) as usize);
        buckets[bucket_idx] = Some(entry);
        entry
    }

    /// Returns the entry behind `handle` if this table issued it.
    fn entry(&self, handle: SelectorHandle) -> Option<&'static InternedSelector> {
        let addr = handle.as_ptr() as usize;
        let owned = self.shards.iter().any(|shard| {
            shard
                .issued
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&addr)
        });
        if !owned {
            return None;
        }
        // SAFETY: `addr` was recorded from a leaked `InternedSelector`, which
        // is never freed or mutated after insertion.
        Some(unsafe { &*handle.as_ptr().cast::<InternedSelector>() })
    }

    /// Number of distinct names in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.issued.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// True if the table holds no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LocalSelectorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectorRuntime for LocalSelectorTable {
    fn register_name(&self, name: &str) -> Result<SelectorHandle> {
        Ok(self.intern(name).handle())
    }

    fn name_of(&self, handle: SelectorHandle) -> Result<String> {
        self.entry(handle)
            .map(|entry| entry.name.to_string())
            .ok_or_else(|| {
                Error::fatal("sel_getName", format!("{handle:?} was not issued by this table"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_register_is_idempotent() {
        let table = LocalSelectorTable::new();
        let a = table.register_name("init").unwrap();
        let b = table.register_name("init").unwrap();
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_distinct_names_distinct_handles() {
        let table = LocalSelectorTable::new();
        let names = ["aaa", "bbb", "ccc", "", "initWithObjects:count:"];
        let handles: Vec<_> = names
            .iter()
            .map(|n| table.register_name(n).unwrap())
            .collect();

        for (i, a) in handles.iter().enumerate() {
            for b in &handles[i + 1..] {
                assert_ne!(a, b);
            }
        }
        for (name, handle) in names.iter().zip(&handles) {
            assert_eq!(table.name_of(*handle).unwrap(), *name);
        }
    }

    #[test]
    fn test_tables_are_independent() {
        let first = LocalSelectorTable::new();
        let second = LocalSelectorTable::new();
        let handle = first.register_name("retain").unwrap();

        assert_ne!(second.register_name("retain").unwrap(), handle);
        assert!(second.name_of(first.register_name("release").unwrap()).is_err());
    }

    #[test]
    fn test_unknown_handle_is_fatal() {
        let table = LocalSelectorTable::new();
        let mut slot = 0u8;
        let bogus = SelectorHandle::from_ptr(std::ptr::from_mut(&mut slot).cast()).unwrap();
        let err = table.name_of(bogus).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_shard_distribution() {
        let names = ["init", "method:", "foo:bar:", "test", "alloc", "dealloc"];
        let mut shard_counts = [0; NUM_SHARDS];
        for name in names {
            shard_counts[(hash_name(name) as usize) & SHARD_MASK] += 1;
        }
        let non_empty = shard_counts.iter().filter(|&&count| count > 0).count();
        assert!(non_empty >= 2, "names should spread across shards");
    }

    #[test]
    fn test_sharded_thread_safety() {
        let table = LocalSelectorTable::new();
        let num_threads = 8;

        thread::scope(|scope| {
            let workers: Vec<_> = (0..num_threads)
                .map(|thread_id| {
                    let table = &table;
                    scope.spawn(move || {
                        (0..10)
                            .map(|i| {
                                let shared = table.register_name("shared:").unwrap();
                                let own = format!("thread{thread_id}_sel{i}:");
                                (shared, table.register_name(&own).unwrap())
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            let results: Vec<_> = workers
                .into_iter()
                .flat_map(|w| w.join().unwrap())
                .collect();
            assert!(results.windows(2).all(|w| w[0].0 == w[1].0));
        });

        assert_eq!(table.len(), num_threads * 10 + 1);
    }
}
