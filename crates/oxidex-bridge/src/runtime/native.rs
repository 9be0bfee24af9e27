//! Native type descriptors.
//!
//! [`NativeType`] is what the foreign call invoker consumes: a C-ABI type
//! with a known size and alignment. Struct descriptors are shared through
//! [`Arc`] and compared by identity, so a descriptor obtained from the
//! struct cache is the same object every time it is resolved.

// Allow match arms with identical bodies - several codes share a width
#![allow(clippy::match_same_arms)]

use std::ffi::c_void;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem::{align_of, size_of};
use std::sync::{Arc, OnceLock};

use crate::encoding::ScalarCode;

const POINTER_SIZE: usize = size_of::<*const c_void>();
const POINTER_ALIGN: usize = align_of::<*const c_void>();

/// A resolved, native-callable type.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum NativeType {
    /// `void`, only meaningful as a return type.
    Void,
    /// `char` / `int8_t`
    Int8,
    /// `unsigned char` / `uint8_t`
    UInt8,
    /// `short`
    Int16,
    /// `unsigned short`
    UInt16,
    /// `int`, and `long` as encoded by `l`
    Int32,
    /// `unsigned int`
    UInt32,
    /// `long long`
    Int64,
    /// `unsigned long long`, and `unsigned long` as encoded by `L`
    UInt64,
    /// `float`
    Float,
    /// `double`
    Double,
    /// C99 `_Bool`
    Bool,
    /// `char *`
    CString,
    /// `id`
    Object,
    /// `Class`
    Class,
    /// `SEL`
    Selector,
    /// Opaque `void *`. Pointees are never resolved.
    Pointer,
    /// A struct passed by value.
    Struct(Arc<StructType>),
}

impl NativeType {
    /// Size in bytes under the C ABI of the host.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            NativeType::Void => 0,
            NativeType::Int8 | NativeType::UInt8 | NativeType::Bool => 1,
            NativeType::Int16 | NativeType::UInt16 => 2,
            NativeType::Int32 | NativeType::UInt32 => 4,
            NativeType::Float => 4,
            NativeType::Int64 | NativeType::UInt64 => 8,
            NativeType::Double => 8,
            NativeType::CString
            | NativeType::Object
            | NativeType::Class
            | NativeType::Selector
            | NativeType::Pointer => POINTER_SIZE,
            NativeType::Struct(ty) => ty.size(),
        }
    }

    /// Alignment in bytes under the C ABI of the host.
    #[must_use]
    pub fn align(&self) -> usize {
        match self {
            NativeType::Void => 1,
            NativeType::Int8 | NativeType::UInt8 | NativeType::Bool => 1,
            NativeType::Int16 | NativeType::UInt16 => 2,
            NativeType::Int32 | NativeType::UInt32 => align_of::<u32>(),
            NativeType::Float => align_of::<f32>(),
            NativeType::Int64 | NativeType::UInt64 => align_of::<u64>(),
            NativeType::Double => align_of::<f64>(),
            NativeType::CString
            | NativeType::Object
            | NativeType::Class
            | NativeType::Selector
            | NativeType::Pointer => POINTER_ALIGN,
            NativeType::Struct(ty) => ty.align(),
        }
    }

    /// Returns the struct descriptor if this is a struct.
    #[must_use]
    pub fn as_struct(&self) -> Option<&Arc<StructType>> {
        match self {
            NativeType::Struct(ty) => Some(ty),
            _ => None,
        }
    }

    /// True for every pointer-sized handle type.
    #[must_use]
    pub const fn is_pointer_like(&self) -> bool {
        matches!(
            self,
            NativeType::CString
                | NativeType::Object
                | NativeType::Class
                | NativeType::Selector
                | NativeType::Pointer
        )
    }

    const fn scalar_name(&self) -> &'static str {
        match self {
            NativeType::Void => "void",
            NativeType::Int8 => "int8",
            NativeType::UInt8 => "uint8",
            NativeType::Int16 => "int16",
            NativeType::UInt16 => "uint16",
            NativeType::Int32 => "int32",
            NativeType::UInt32 => "uint32",
            NativeType::Int64 => "int64",
            NativeType::UInt64 => "uint64",
            NativeType::Float => "float",
            NativeType::Double => "double",
            NativeType::Bool => "bool",
            NativeType::CString => "cstring",
            NativeType::Object => "id",
            NativeType::Class => "Class",
            NativeType::Selector => "SEL",
            NativeType::Pointer => "pointer",
            NativeType::Struct(_) => "struct",
        }
    }
}

impl From<ScalarCode> for NativeType {
    fn from(code: ScalarCode) -> Self {
        match code {
            ScalarCode::Char => NativeType::Int8,
            ScalarCode::Int => NativeType::Int32,
            ScalarCode::Short => NativeType::Int16,
            // `l` is a 32-bit quantity even in 64-bit programs
            ScalarCode::Long => NativeType::Int32,
            ScalarCode::LongLong => NativeType::Int64,
            ScalarCode::UChar => NativeType::UInt8,
            ScalarCode::UInt => NativeType::UInt32,
            ScalarCode::UShort => NativeType::UInt16,
            ScalarCode::ULong => NativeType::UInt64,
            ScalarCode::ULongLong => NativeType::UInt64,
            ScalarCode::Float => NativeType::Float,
            ScalarCode::Double => NativeType::Double,
            ScalarCode::Bool => NativeType::Bool,
            ScalarCode::Void => NativeType::Void,
            ScalarCode::CString => NativeType::CString,
            ScalarCode::Object => NativeType::Object,
            ScalarCode::Class => NativeType::Class,
            ScalarCode::Selector => NativeType::Selector,
            ScalarCode::Unknown => NativeType::Pointer,
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::Struct(ty) => write!(f, "struct {}", ty.name()),
            other => f.write_str(other.scalar_name()),
        }
    }
}

impl fmt::Debug for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::Struct(ty) => fmt::Debug::fmt(ty, f),
            other => f.write_str(other.scalar_name()),
        }
    }
}

/// One member of a struct layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructMember {
    /// Declared name; empty for positional members.
    pub name: String,
    /// Member type.
    pub ty: NativeType,
    /// Byte offset from the start of the struct.
    pub offset: usize,
}

#[derive(Debug)]
struct StructLayout {
    members: Vec<StructMember>,
    size: usize,
    align: usize,
}

/// A struct descriptor.
///
/// Created as a placeholder carrying only the name, then completed once
/// with its members. A struct that (illegally) contains itself by value
/// sees the placeholder, whose size is 0 until completion.
pub struct StructType {
    name: String,
    layout: OnceLock<StructLayout>,
}

impl StructType {
    /// Creates an incomplete descriptor for `name`.
    #[must_use]
    pub(crate) fn placeholder(name: impl Into<String>) -> Arc<Self> {
        Arc::new(StructType {
            name: name.into(),
            layout: OnceLock::new(),
        })
    }

    /// Completes the descriptor, laying members out with C rules: each
    /// member at the next multiple of its alignment, total size rounded up
    /// to the largest alignment.
    ///
    /// Returns false if the descriptor was already complete.
    pub(crate) fn complete(&self, fields: Vec<(String, NativeType)>) -> bool {
        let mut offset = 0usize;
        let mut align = 1usize;
        let members = fields
            .into_iter()
            .map(|(name, ty)| {
                let member_align = ty.align();
                offset = offset.next_multiple_of(member_align);
                let member = StructMember {
                    name,
                    offset,
                    ty,
                };
                offset += member.ty.size();
                align = align.max(member_align);
                member
            })
            .collect();
        let layout = StructLayout {
            members,
            size: offset.next_multiple_of(align),
            align,
        };
        self.layout.set(layout).is_ok()
    }

    /// Canonical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// False only while the descriptor is still being resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.layout.get().is_some()
    }

    /// Members in layout order.
    #[must_use]
    pub fn members(&self) -> &[StructMember] {
        self.layout.get().map_or(&[], |l| l.members.as_slice())
    }

    /// Looks up a member by declared name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&StructMember> {
        self.members().iter().find(|m| m.name == name)
    }

    /// Total size in bytes, including trailing padding.
    #[must_use]
    pub fn size(&self) -> usize {
        self.layout.get().map_or(0, |l| l.size)
    }

    /// Alignment in bytes.
    #[must_use]
    pub fn align(&self) -> usize {
        self.layout.get().map_or(1, |l| l.align)
    }
}

// Identity semantics: one descriptor per canonical name.
impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for StructType {}

impl Hash for StructType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self, state);
    }
}

impl fmt::Debug for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Members print shallowly so self-referencing structs terminate.
        let mut s = f.debug_struct("StructType");
        s.field("name", &self.name);
        if self.is_complete() {
            let members: Vec<String> = self
                .members()
                .iter()
                .map(|m| format!("{}: {} @ {}", m.name, m.ty, m.offset))
                .collect();
            s.field("members", &members)
                .field("size", &self.size())
                .field("align", &self.align());
        } else {
            s.field("complete", &false);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Arc<StructType> {
        let ty = StructType::placeholder("CGPoint");
        assert!(ty.complete(vec![
            ("x".into(), NativeType::Double),
            ("y".into(), NativeType::Double),
        ]));
        ty
    }

    #[test]
    fn test_scalar_mapping_widths() {
        assert_eq!(NativeType::from(ScalarCode::Char).size(), 1);
        assert_eq!(NativeType::from(ScalarCode::Short).size(), 2);
        assert_eq!(NativeType::from(ScalarCode::Long), NativeType::Int32);
        assert_eq!(NativeType::from(ScalarCode::ULong), NativeType::UInt64);
        assert_eq!(NativeType::from(ScalarCode::LongLong).size(), 8);
        assert_eq!(NativeType::from(ScalarCode::Void).size(), 0);
        assert_eq!(NativeType::from(ScalarCode::Unknown), NativeType::Pointer);
        assert!(NativeType::from(ScalarCode::Selector).is_pointer_like());
    }

    #[test]
    fn test_struct_layout_offsets_and_padding() {
        let ty = StructType::placeholder("Padded");
        ty.complete(vec![
            ("flag".into(), NativeType::Int8),
            ("value".into(), NativeType::Int32),
            ("tail".into(), NativeType::Int16),
        ]);

        let offsets: Vec<usize> = ty.members().iter().map(|m| m.offset).collect();
        assert_eq!(offsets, [0, 4, 8]);
        assert_eq!(ty.size(), 12);
        assert_eq!(ty.align(), 4);
    }

    #[test]
    fn test_nested_struct_layout() {
        let rect = StructType::placeholder("CGRect");
        rect.complete(vec![
            ("origin".into(), NativeType::Struct(point())),
            ("size".into(), NativeType::Struct(point())),
        ]);
        assert_eq!(rect.size(), 32);
        assert_eq!(rect.member("size").map(|m| m.offset), Some(16));
        assert!(rect.member("depth").is_none());
    }

    #[test]
    fn test_struct_completes_once() {
        let ty = point();
        assert!(!ty.complete(Vec::new()));
        assert_eq!(ty.members().len(), 2);
    }

    #[test]
    fn test_placeholder_is_empty_until_complete() {
        let ty = StructType::placeholder("Pending");
        assert!(!ty.is_complete());
        assert!(ty.members().is_empty());
        assert_eq!(ty.size(), 0);
        assert!(format!("{ty:?}").contains("complete: false"));
    }

    #[test]
    fn test_struct_equality_is_identity() {
        let a = point();
        let b = point();
        assert_eq!(NativeType::Struct(a.clone()), NativeType::Struct(a.clone()));
        assert_ne!(NativeType::Struct(a), NativeType::Struct(b));
    }

    #[test]
    fn test_display() {
        assert_eq!(NativeType::Selector.to_string(), "SEL");
        assert_eq!(NativeType::Struct(point()).to_string(), "struct CGPoint");
    }
}
