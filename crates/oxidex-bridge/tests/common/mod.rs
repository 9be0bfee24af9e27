// Common test utilities for integration tests
//
// Isolated caches and an instrumented selector runtime, so tests never
// depend on what other tests put into the process-wide state.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use oxidex_bridge::runtime::{LocalSelectorTable, SelectorInterner, StructTable};
use oxidex_bridge::{Result, SelectorHandle, SelectorRuntime};

/// Foundation geometry encodings with named fields.
pub const CGPOINT: &str = "{CGPoint=\"x\"d\"y\"d}";
pub const CGSIZE: &str = "{CGSize=\"width\"d\"height\"d}";
pub const CGRECT: &str =
    "{CGRect=\"origin\"{CGPoint=\"x\"d\"y\"d}\"size\"{CGSize=\"width\"d\"height\"d}}";

/// A local selector table that counts calls into it.
#[derive(Default)]
pub struct CountingRuntime {
    inner: LocalSelectorTable,
    registrations: AtomicUsize,
    lookups: AtomicUsize,
}

impl CountingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `register_name` calls seen.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    /// Number of `name_of` calls seen.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl SelectorRuntime for CountingRuntime {
    fn register_name(&self, name: &str) -> Result<SelectorHandle> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        self.inner.register_name(name)
    }

    fn name_of(&self, handle: SelectorHandle) -> Result<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.name_of(handle)
    }
}

/// A fresh struct cache.
pub fn isolated_structs() -> StructTable {
    StructTable::new()
}

/// A fresh interner over a counting runtime.
pub fn counting_interner() -> SelectorInterner<CountingRuntime> {
    SelectorInterner::new(CountingRuntime::new())
}
