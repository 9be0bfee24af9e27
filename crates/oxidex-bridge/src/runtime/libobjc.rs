//! Selector runtime backed by the Objective-C runtime library.
//!
//! The library is opened at run time with `libloading`, so the crate builds
//! and runs on hosts without Objective-C; only [`LibObjc::open`] fails there.

use std::ffi::{CStr, CString, c_char, c_void};
use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use oxidex_log::{debug, error};

use super::selector::{SelectorHandle, SelectorRuntime};
use crate::error::{Error, Result};

/// Location of the system runtime on macOS.
pub const DEFAULT_PATH: &str = "/usr/lib/libobjc.A.dylib";

type RegisterNameFn = unsafe extern "C" fn(*const c_char) -> *mut c_void;
type GetNameFn = unsafe extern "C" fn(*mut c_void) -> *const c_char;

/// `sel_registerName` and `sel_getName` from a loaded runtime library.
pub struct LibObjc {
    register_name: RegisterNameFn,
    get_name: GetNameFn,
    path: PathBuf,
    // Keeps the function pointers above valid. Dropped last.
    _library: Library,
}

impl LibObjc {
    /// Opens the runtime at [`DEFAULT_PATH`].
    ///
    /// # Errors
    ///
    /// See [`LibObjc::open`].
    pub fn load() -> Result<Self> {
        Self::open(DEFAULT_PATH)
    }

    /// Opens the runtime library at `path` and resolves the selector
    /// functions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FatalBridge`] if the library cannot be loaded or does
    /// not export `sel_registerName` and `sel_getName`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!("loading Objective-C runtime from {}", path.display());

        // SAFETY: loading runs the library's initializers. The Objective-C
        // runtime has no initializers with preconditions on the caller.
        let library = unsafe { Library::new(&path) }.map_err(|e| {
            error!("cannot load Objective-C runtime {}: {e}", path.display());
            Error::fatal("dlopen", format!("{}: {e}", path.display()))
        })?;

        // SAFETY: both symbols have these exact C signatures in every
        // Objective-C runtime (Apple and GNUstep).
        let register_name = unsafe { library.get::<RegisterNameFn>(b"sel_registerName\0") }
            .map(|sym| *sym)
            .map_err(|e| Error::fatal("dlsym", format!("sel_registerName: {e}")))?;
        let get_name = unsafe { library.get::<GetNameFn>(b"sel_getName\0") }
            .map(|sym| *sym)
            .map_err(|e| Error::fatal("dlsym", format!("sel_getName: {e}")))?;

        Ok(LibObjc {
            register_name,
            get_name,
            path,
            _library: library,
        })
    }

    /// Path the library was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SelectorRuntime for LibObjc {
    fn register_name(&self, name: &str) -> Result<SelectorHandle> {
        let c_name = CString::new(name).map_err(|e| {
            Error::fatal(
                "sel_registerName",
                format!("selector name contains a NUL byte at {}", e.nul_position()),
            )
        })?;

        // SAFETY: `c_name` is a valid NUL-terminated string for the duration
        // of the call. The runtime copies it.
        let raw = unsafe { (self.register_name)(c_name.as_ptr()) };
        SelectorHandle::from_ptr(raw)
            .ok_or_else(|| Error::fatal("sel_registerName", format!("returned NULL for {name:?}")))
    }

    fn name_of(&self, handle: SelectorHandle) -> Result<String> {
        // SAFETY: `handle` is non-NULL. The runtime owns the returned string
        // and never frees it.
        let raw = unsafe { (self.get_name)(handle.as_ptr()) };
        if raw.is_null() {
            return Err(Error::fatal("sel_getName", format!("returned NULL for {handle:?}")));
        }
        // SAFETY: non-NULL, NUL-terminated, and immutable for the program.
        let name = unsafe { CStr::from_ptr(raw) };
        name.to_str()
            .map(str::to_string)
            .map_err(|e| Error::fatal("sel_getName", format!("name is not UTF-8: {e}")))
    }
}

impl fmt::Debug for LibObjc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibObjc").field("path", &self.path).finish_non_exhaustive()
    }
}
