//! Struct descriptor cache.
//!
//! Maps a canonical struct name to the one [`StructType`] built for it. The
//! cache is append-only and insert-if-absent: once a name is published, every
//! later lookup returns the same descriptor, even when two threads race to
//! build it.

use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use hashbrown::HashMap;

use super::native::StructType;

/// Storage for resolved struct descriptors.
///
/// Implementations must be safe to share between threads and must never
/// replace a published entry.
pub trait StructCache: Send + Sync {
    /// Returns the descriptor cached under `name`.
    fn get(&self, name: &str) -> Option<Arc<StructType>>;

    /// Publishes `ty` under `name` unless the name is already taken, and
    /// returns whichever descriptor the cache holds afterwards.
    fn insert(&self, name: &str, ty: Arc<StructType>) -> Arc<StructType>;

    /// Publishes `ty` under `name` together with the `members` of its
    /// reference cycle, and returns whichever descriptor the cache holds for
    /// `name` afterwards.
    ///
    /// If `name` is already taken, none of `members` is published, so a
    /// cached struct never points at a second descriptor for a cached name.
    /// The default implementation does not hold a lock across the group.
    fn insert_group(
        &self,
        name: &str,
        ty: Arc<StructType>,
        members: Vec<(String, Arc<StructType>)>,
    ) -> Arc<StructType> {
        if let Some(existing) = self.get(name) {
            return existing;
        }
        for (member, member_ty) in members {
            self.insert(&member, member_ty);
        }
        self.insert(name, ty)
    }

    /// Number of cached descriptors.
    fn len(&self) -> usize;

    /// True if nothing is cached.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The default [`StructCache`]: a `RwLock`-guarded `FxHash` map.
#[derive(Default)]
pub struct StructTable {
    entries: RwLock<HashMap<String, Arc<StructType>, fxhash::FxBuildHasher>>,
}

impl StructTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every cached struct, in no particular order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.keys().cloned().collect()
    }
}

impl StructCache for StructTable {
    fn get(&self, name: &str) -> Option<Arc<StructType>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(name).cloned()
    }

    fn insert(&self, name: &str, ty: Arc<StructType>) -> Arc<StructType> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(name.to_string()).or_insert(ty))
    }

    fn insert_group(
        &self,
        name: &str,
        ty: Arc<StructType>,
        members: Vec<(String, Arc<StructType>)>,
    ) -> Arc<StructType> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(name) {
            return Arc::clone(existing);
        }
        for (member, member_ty) in members {
            entries.entry(member).or_insert(member_ty);
        }
        Arc::clone(entries.entry(name.to_string()).or_insert(ty))
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl fmt::Debug for StructTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructTable")
            .field("entries", &self.len())
            .finish()
    }
}

static GLOBAL_STRUCTS: OnceLock<StructTable> = OnceLock::new();

/// The process-wide struct cache used by [`TypeMapper::global`](super::TypeMapper::global).
pub fn global_struct_cache() -> &'static StructTable {
    GLOBAL_STRUCTS.get_or_init(StructTable::new)
}
