//! Runtime side of the bridge.
//!
//! - [`native`]: native type descriptors with C layout
//! - [`struct_cache`]: name-keyed struct descriptor cache
//! - [`mapper`]: token and signature mapping
//! - [`selector`]: selector interning over a [`SelectorRuntime`]
//! - [`local`]: in-process selector runtime
//! - [`libobjc`]: selector runtime backed by the Objective-C runtime library
//!
//! Both caches are process-wide by default ([`selectors`],
//! [`global_struct_cache`]) and injectable for isolated use.

pub mod libobjc;
pub mod local;
pub mod mapper;
pub mod native;
pub mod selector;
pub mod struct_cache;

pub use libobjc::LibObjc;
pub use local::LocalSelectorTable;
pub use mapper::{MappedSignature, SignatureKind, TypeMapper, map_type};
pub use native::{NativeType, StructMember, StructType};
pub use selector::{
    SelectorHandle, SelectorInterner, SelectorRuntime, install_selector_runtime, sel, sel_name,
    selectors,
};
pub use struct_cache::{StructCache, StructTable, global_struct_cache};
