//! Integration tests for selector interning.

mod common;

use std::sync::Arc;

use common::{CountingRuntime, counting_interner};
use oxidex_bridge::runtime::{LibObjc, LocalSelectorTable, SelectorInterner, selectors};
use oxidex_bridge::{ErrorKind, SelectorRuntime, sel, sel_name};

#[test]
fn test_intern_twice_gives_equal_handles() {
    let interner = counting_interner();
    let first = interner.intern("tableView:numberOfRowsInSection:").unwrap();
    let second = interner.intern("tableView:numberOfRowsInSection:").unwrap();

    assert_eq!(first, second);
    assert_eq!(interner.resolve(first).unwrap(), "tableView:numberOfRowsInSection:");
    assert_eq!(interner.runtime().registrations(), 1);
}

#[test]
fn test_resolve_is_answered_from_cache() {
    let interner = counting_interner();
    let handle = interner.intern("count").unwrap();

    for _ in 0..5 {
        assert_eq!(interner.resolve(handle).unwrap(), "count");
    }
    assert_eq!(interner.runtime().lookups(), 0);
}

#[test]
fn test_foreign_handle_goes_to_runtime() {
    let runtime = Arc::new(CountingRuntime::new());
    let foreign = runtime.register_name("hash").unwrap();

    let interner = SelectorInterner::new(Arc::clone(&runtime));
    assert_eq!(interner.resolve(foreign).unwrap(), "hash");
    assert_eq!(runtime.lookups(), 1);
    // Resolving does not populate the cache.
    assert!(interner.lookup("hash").is_none());
}

#[test]
fn test_names_are_not_normalized() {
    let interner = SelectorInterner::new(LocalSelectorTable::new());
    let names = ["init", "init:", "Init", "", "方法:", "method🚀rocket"];
    let handles: Vec<_> = names.iter().map(|n| interner.intern(n).unwrap()).collect();

    for (i, a) in handles.iter().enumerate() {
        for b in &handles[i + 1..] {
            assert_ne!(a, b);
        }
    }
    for (name, handle) in names.iter().zip(handles) {
        assert_eq!(interner.resolve(handle).unwrap(), *name);
    }
    assert_eq!(interner.len(), names.len());
}

#[test]
fn test_global_interner() {
    let handle = sel("oxidexSelectorTestGlobal:").unwrap();
    assert_eq!(selectors().lookup("oxidexSelectorTestGlobal:"), Some(handle));
    assert_eq!(sel_name(handle).unwrap(), "oxidexSelectorTestGlobal:");
}

#[test]
fn test_unloadable_runtime_is_fatal() {
    let err = LibObjc::open("/nonexistent/libobjc.so").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FatalBridge);
    assert!(err.is_fatal());
}
