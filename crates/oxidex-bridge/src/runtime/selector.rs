//! Selector interning.
//!
//! A [`SelectorInterner`] caches the bidirectional mapping between selector
//! names and the opaque handles a [`SelectorRuntime`] issues for them. The
//! runtime is asked for each distinct name once; later calls are answered
//! from the cache under a read lock.
//!
//! The process-wide interner is reached through [`selectors`]. It uses the
//! in-process [`LocalSelectorTable`](super::LocalSelectorTable) unless a
//! different runtime was installed first with [`install_selector_runtime`].

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use hashbrown::HashMap;
use oxidex_log::debug;

use super::local::LocalSelectorTable;
use crate::error::Result;

/// Opaque selector handle (`SEL`) as issued by a selector runtime.
///
/// Handles are compared by address. Equal names interned through the same
/// runtime always produce equal handles.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct SelectorHandle(NonNull<c_void>);

// SAFETY: a handle is an immutable token. The runtime that issued it never
// frees or moves what it points to, and this type never dereferences it.
unsafe impl Send for SelectorHandle {}
unsafe impl Sync for SelectorHandle {}

impl SelectorHandle {
    /// Wraps a raw `SEL`, returning `None` for NULL.
    #[inline]
    #[must_use]
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(SelectorHandle)
    }

    pub(crate) fn from_non_null(ptr: NonNull<c_void>) -> Self {
        SelectorHandle(ptr)
    }

    /// Returns the raw `SEL` for passing to native code.
    #[inline]
    #[must_use]
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

impl fmt::Debug for SelectorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SelectorHandle({:p})", self.0)
    }
}

/// The native side of selector interning.
///
/// Implementations must be idempotent: registering the same name twice
/// returns the same handle.
pub trait SelectorRuntime: Send + Sync {
    /// Registers `name` (or finds its existing registration) and returns its
    /// handle. Corresponds to `sel_registerName`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FatalBridge`](crate::Error::FatalBridge) if the runtime cannot produce a handle.
    fn register_name(&self, name: &str) -> Result<SelectorHandle>;

    /// Returns the name a handle was registered under. Corresponds to
    /// `sel_getName`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FatalBridge`](crate::Error::FatalBridge) if the runtime does not know the handle
    /// or returns an unusable name.
    fn name_of(&self, handle: SelectorHandle) -> Result<String>;
}

impl<R: SelectorRuntime + ?Sized> SelectorRuntime for &R {
    fn register_name(&self, name: &str) -> Result<SelectorHandle> {
        (**self).register_name(name)
    }

    fn name_of(&self, handle: SelectorHandle) -> Result<String> {
        (**self).name_of(handle)
    }
}

impl<R: SelectorRuntime + ?Sized> SelectorRuntime for Box<R> {
    fn register_name(&self, name: &str) -> Result<SelectorHandle> {
        (**self).register_name(name)
    }

    fn name_of(&self, handle: SelectorHandle) -> Result<String> {
        (**self).name_of(handle)
    }
}

impl<R: SelectorRuntime + ?Sized> SelectorRuntime for Arc<R> {
    fn register_name(&self, name: &str) -> Result<SelectorHandle> {
        (**self).register_name(name)
    }

    fn name_of(&self, handle: SelectorHandle) -> Result<String> {
        (**self).name_of(handle)
    }
}

#[derive(Default)]
struct Tables {
    by_name: HashMap<Arc<str>, SelectorHandle, fxhash::FxBuildHasher>,
    by_handle: HashMap<SelectorHandle, Arc<str>, fxhash::FxBuildHasher>,
}

/// Bidirectional selector cache in front of a [`SelectorRuntime`].
///
/// Both directions are kept in one table behind one lock, so a reader never
/// sees a name without its handle or the reverse.
pub struct SelectorInterner<R = Box<dyn SelectorRuntime>> {
    runtime: R,
    tables: RwLock<Tables>,
}

impl<R: SelectorRuntime> SelectorInterner<R> {
    /// Creates an empty interner over `runtime`.
    pub fn new(runtime: R) -> Self {
        SelectorInterner {
            runtime,
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Returns the handle for `name`, registering it with the runtime on
    /// first use.
    ///
    /// ```
    /// use oxidex_bridge::runtime::{LocalSelectorTable, SelectorInterner};
    ///
    /// let interner = SelectorInterner::new(LocalSelectorTable::new());
    /// let a = interner.intern("initWithFrame:").unwrap();
    /// let b = interner.intern("initWithFrame:").unwrap();
    /// assert_eq!(a, b);
    /// assert_eq!(interner.resolve(a).unwrap(), "initWithFrame:");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::FatalBridge`](crate::Error::FatalBridge) if the runtime fails. Nothing is cached
    /// in that case.
    pub fn intern(&self, name: &str) -> Result<SelectorHandle> {
        // Fast path: read lock only
        {
            let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&handle) = tables.by_name.get(name) {
                return Ok(handle);
            }
        }

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);

        // Double-check: another thread may have interned it while we waited
        if let Some(&handle) = tables.by_name.get(name) {
            return Ok(handle);
        }

        let handle = self.runtime.register_name(name)?;
        debug!("registered selector {name:?} as {handle:?}");

        let key: Arc<str> = Arc::from(name);
        tables.by_name.insert(Arc::clone(&key), handle);
        tables.by_handle.entry(handle).or_insert(key);
        Ok(handle)
    }

    /// Returns the name of `handle`.
    ///
    /// Handles issued by this interner are answered from the cache. Unknown
    /// handles are passed to the runtime and not cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FatalBridge`](crate::Error::FatalBridge) if the handle is unknown to the cache
    /// and the runtime cannot name it.
    pub fn resolve(&self, handle: SelectorHandle) -> Result<String> {
        {
            let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(name) = tables.by_handle.get(&handle) {
                return Ok(name.to_string());
            }
        }

        debug!("selector handle {handle:?} not interned here, asking runtime");
        self.runtime.name_of(handle)
    }

    /// Returns the cached handle for `name` without registering it.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<SelectorHandle> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.by_name.get(name).copied()
    }

    /// Number of interned names.
    #[must_use]
    pub fn len(&self) -> usize {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.by_name.len()
    }

    /// True if nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The underlying runtime.
    #[must_use]
    pub fn runtime(&self) -> &R {
        &self.runtime
    }
}

impl<R> fmt::Debug for SelectorInterner<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("SelectorInterner")
            .field("interned", &tables.by_name.len())
            .finish_non_exhaustive()
    }
}

/// Process-wide interner.
static SELECTORS: OnceLock<SelectorInterner> = OnceLock::new();

/// Installs the runtime backing the process-wide interner.
///
/// Returns false if the interner was already initialized, either by an
/// earlier install or by a call to [`selectors`]; the given runtime is then
/// dropped.
pub fn install_selector_runtime(runtime: Box<dyn SelectorRuntime>) -> bool {
    let mut runtime = Some(runtime);
    SELECTORS.get_or_init(|| {
        SelectorInterner::new(runtime.take().unwrap_or_else(default_runtime))
    });
    runtime.is_none()
}

fn default_runtime() -> Box<dyn SelectorRuntime> {
    Box::new(LocalSelectorTable::global())
}

/// Returns the process-wide interner.
pub fn selectors() -> &'static SelectorInterner {
    SELECTORS.get_or_init(|| SelectorInterner::new(default_runtime()))
}

/// Interns `name` through the process-wide interner.
///
/// # Errors
///
/// See [`SelectorInterner::intern`].
pub fn sel(name: &str) -> Result<SelectorHandle> {
    selectors().intern(name)
}

/// Resolves `handle` through the process-wide interner.
///
/// # Errors
///
/// See [`SelectorInterner::resolve`].
pub fn sel_name(handle: SelectorHandle) -> Result<String> {
    selectors().resolve(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Counts how often the runtime is consulted.
    struct Counting {
        inner: LocalSelectorTable,
        registrations: AtomicUsize,
    }

    impl Counting {
        fn new() -> Self {
            Counting {
                inner: LocalSelectorTable::new(),
                registrations: AtomicUsize::new(0),
            }
        }
    }

    impl SelectorRuntime for Counting {
        fn register_name(&self, name: &str) -> Result<SelectorHandle> {
            self.registrations.fetch_add(1, Ordering::SeqCst);
            self.inner.register_name(name)
        }

        fn name_of(&self, handle: SelectorHandle) -> Result<String> {
            self.inner.name_of(handle)
        }
    }

    struct Failing;

    impl SelectorRuntime for Failing {
        fn register_name(&self, _name: &str) -> Result<SelectorHandle> {
            Err(Error::fatal("sel_registerName", "returned NULL"))
        }

        fn name_of(&self, _handle: SelectorHandle) -> Result<String> {
            Err(Error::fatal("sel_getName", "returned NULL"))
        }
    }

    #[test]
    fn test_intern_is_idempotent() {
        let interner = SelectorInterner::new(Counting::new());
        let a = interner.intern("alloc").unwrap();
        let b = interner.intern("alloc").unwrap();
        let c = interner.intern("init").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.runtime().registrations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_round_trip() {
        let interner = SelectorInterner::new(LocalSelectorTable::new());
        let handle = interner.intern("setObject:forKey:").unwrap();
        assert_eq!(interner.resolve(handle).unwrap(), "setObject:forKey:");
        assert_eq!(interner.lookup("setObject:forKey:"), Some(handle));
        assert_eq!(interner.lookup("missing"), None);
    }

    #[test]
    fn test_resolve_unknown_handle_asks_runtime_without_caching() {
        let runtime = Arc::new(LocalSelectorTable::new());
        let foreign = runtime.register_name("description").unwrap();

        let interner = SelectorInterner::new(Arc::clone(&runtime));
        assert_eq!(interner.resolve(foreign).unwrap(), "description");
        assert!(interner.is_empty());
    }

    #[test]
    fn test_runtime_failure_is_fatal_and_not_cached() {
        let interner = SelectorInterner::new(Failing);
        let err = interner.intern("init").unwrap_err();
        assert!(err.is_fatal());
        assert!(interner.is_empty());

        let bogus = SelectorHandle::from_ptr(NonNull::<c_void>::dangling().as_ptr()).unwrap();
        assert!(interner.resolve(bogus).unwrap_err().is_fatal());
    }

    #[test]
    fn test_handle_from_null() {
        assert!(SelectorHandle::from_ptr(std::ptr::null_mut()).is_none());
    }

    #[test]
    fn test_concurrent_intern_registers_once() {
        let interner = Arc::new(SelectorInterner::new(Counting::new()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let interner = Arc::clone(&interner);
                thread::spawn(move || interner.intern("concurrentSelector:").unwrap())
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(interner.runtime().registrations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_global_helpers() {
        let handle = sel("globalHelperSelector").unwrap();
        assert_eq!(sel("globalHelperSelector").unwrap(), handle);
        assert_eq!(sel_name(handle).unwrap(), "globalHelperSelector");
    }
}
