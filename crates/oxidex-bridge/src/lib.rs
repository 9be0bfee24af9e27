//! `OxideX` bridge: Objective-C type encodings to native types
//!
//! The bridge turns the type-encoding strings an Objective-C runtime attaches
//! to its methods into native type descriptors a foreign-call invoker can
//! use, and interns selector names into stable opaque handles.
//!
//! - **Tokenizer**: splits `"i24@0:8@16"` into `["i", "@", ":", "@"]`
//! - **Struct parser**: splits `{CGPoint="x"d"y"d}` into a name and fields
//! - **Type mapper**: maps tokens to [`NativeType`]s, caching structs by name
//! - **Selector interner**: bidirectional name/handle cache in front of a
//!   native runtime
//!
//! # Architecture
//!
//! - [`encoding`]: pure string processing, no shared state
//! - [`runtime`]: the caches, native descriptors, and selector runtimes
//! - [`config`]: options and environment configuration
//!
//! # Example
//!
//! ```rust
//! use oxidex_bridge::runtime::{NativeType, StructTable, TypeMapper};
//!
//! let cache = StructTable::new();
//! let mapper = TypeMapper::new(&cache);
//!
//! let sig = mapper.map_method_encoding("{CGPoint=dd}16@0:8").unwrap();
//! assert_eq!(sig.return_type.size(), 16);
//! assert_eq!(sig.argument_types, [NativeType::Object, NativeType::Selector]);
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod runtime;

pub use config::{BridgeConfig, MapperOptions, SelectorBackend};
pub use encoding::{SignatureShape, Token, TypeKind, classify, tokenize};
pub use error::{Error, ErrorKind, Result, SignaturePosition};
pub use runtime::{
    MappedSignature, NativeType, SelectorHandle, SelectorRuntime, StructType, TypeMapper, sel,
    sel_name,
};

use oxidex_log::{error, info, warn};

use crate::runtime::{LibObjc, LocalSelectorTable};

/// Initializes the bridge from the environment.
///
/// Configures logging from `OXIDEX_LOG`, reads [`BridgeConfig::from_env`],
/// installs the configured selector runtime and fixes the options used by
/// [`TypeMapper::global`]. Calling it is optional; without it the
/// process-wide interner uses the local selector table and the global mapper
/// uses default options.
///
/// Settings that were already fixed by earlier use are left alone and
/// reported with a warning.
///
/// # Errors
///
/// Returns [`Error::FatalBridge`] if the configured Objective-C runtime
/// cannot be loaded.
pub fn init() -> Result<BridgeConfig> {
    oxidex_log::init_from_env();
    let config = BridgeConfig::from_env();
    init_with(&config)?;
    Ok(config)
}

/// Initializes the bridge with an explicit configuration.
///
/// # Errors
///
/// See [`init`].
pub fn init_with(config: &BridgeConfig) -> Result<()> {
    let runtime: Box<dyn SelectorRuntime> = match &config.selectors {
        SelectorBackend::Local => Box::new(LocalSelectorTable::global()),
        SelectorBackend::LibObjc(path) => {
            let lib = match path {
                Some(path) => LibObjc::open(path),
                None => LibObjc::load(),
            }
            .inspect_err(|e| error!("{e}"))?;
            info!("using Objective-C runtime at {}", lib.path().display());
            Box::new(lib)
        }
    };

    if !runtime::install_selector_runtime(runtime) {
        warn!("selector runtime already initialized, keeping the existing one");
    }
    if !runtime::mapper::set_global_options(config.mapper) {
        warn!("type mapper options already fixed, ignoring {:?}", config.mapper);
    }
    Ok(())
}
