//! Token classification.
//!
//! [`classify`] decides what a token denotes without touching any cache or
//! building any descriptor. It is total: every string maps to some
//! [`TypeKind`], with [`TypeKind::Unknown`] as the catch-all.

use super::structs::{is_struct_encoding, parse_name};
use super::types::{BITFIELD, POINTER};
use super::{ScalarCode, strip_qualifiers};
use crate::config::MapperOptions;
use crate::error::Error;

/// Recognized type kinds that have no native mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsupportedKind {
    /// `[N type]`
    Array,
    /// `(name=...)`
    Union,
    /// `bN`
    Bitfield,
}

impl UnsupportedKind {
    /// Builds the error reported for `token`.
    #[must_use]
    pub fn into_error(self, token: &str) -> Error {
        let token = token.to_string();
        match self {
            UnsupportedKind::Array => Error::ArrayUnsupported { token },
            UnsupportedKind::Union => Error::UnionUnsupported { token },
            UnsupportedKind::Bitfield => Error::BitfieldUnsupported { token },
        }
    }
}

/// What a single type token denotes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A scalar code.
    Scalar(ScalarCode),
    /// A pointer; `None` for a bare `^` with nothing after it.
    Pointer(Option<Box<TypeKind>>),
    /// A struct, by canonical name.
    StructRef(String),
    /// Nothing recognizable.
    Unknown,
    /// Recognized but not mapped.
    Unsupported(UnsupportedKind),
}

/// Classifies a token with the default options.
///
/// ```
/// use oxidex_bridge::encoding::{ScalarCode, TypeKind, UnsupportedKind, classify};
///
/// assert_eq!(classify("rd"), TypeKind::Scalar(ScalarCode::Double));
/// assert_eq!(classify("{CGPoint=dd}"), TypeKind::StructRef("CGPoint".into()));
/// assert_eq!(classify("[4i]"), TypeKind::Unsupported(UnsupportedKind::Array));
/// assert_eq!(classify("Z"), TypeKind::Unknown);
/// ```
#[must_use]
pub fn classify(token: &str) -> TypeKind {
    classify_with(token, &MapperOptions::default())
}

/// Classifies a token.
///
/// In order, after stripping qualifiers: struct encoding, pointer prefix,
/// whole-token scalar, last-character scalar (skipped when
/// [`MapperOptions::strict`] is set), then the unsupported bracket and
/// bit-field forms.
#[must_use]
pub fn classify_with(token: &str, options: &MapperOptions) -> TypeKind {
    let stripped = strip_qualifiers(token, options.qualifiers);

    if is_struct_encoding(stripped) {
        if let Ok(name) = parse_name(stripped) {
            return TypeKind::StructRef(name.to_string());
        }
    }

    if let Some(pointee) = stripped.strip_prefix(POINTER) {
        let inner = (!pointee.is_empty()).then(|| Box::new(classify_with(pointee, options)));
        return TypeKind::Pointer(inner);
    }

    if let Some(code) = ScalarCode::from_token(stripped) {
        return TypeKind::Scalar(code);
    }

    // Legacy accommodation for prefixes that survived stripping. It can
    // misread a truncated token, which is what strict mode is for.
    if !options.strict {
        if let Some(code) = stripped.chars().last().and_then(ScalarCode::from_char) {
            return TypeKind::Scalar(code);
        }
    }

    match stripped.chars().next() {
        Some('[') => TypeKind::Unsupported(UnsupportedKind::Array),
        Some('(') => TypeKind::Unsupported(UnsupportedKind::Union),
        Some(BITFIELD) => TypeKind::Unsupported(UnsupportedKind::Bitfield),
        _ => TypeKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::QualifierStripping;

    #[test]
    fn test_classify_scalars_and_qualifiers() {
        assert_eq!(classify("v"), TypeKind::Scalar(ScalarCode::Void));
        assert_eq!(classify("r*"), TypeKind::Scalar(ScalarCode::CString));
        assert_eq!(classify("Vv"), TypeKind::Scalar(ScalarCode::Void));
        assert_eq!(classify("?"), TypeKind::Scalar(ScalarCode::Unknown));
    }

    #[test]
    fn test_classify_pointers() {
        assert_eq!(
            classify("^i"),
            TypeKind::Pointer(Some(Box::new(TypeKind::Scalar(ScalarCode::Int))))
        );
        assert_eq!(
            classify("r^{CGPoint=dd}"),
            TypeKind::Pointer(Some(Box::new(TypeKind::StructRef("CGPoint".into()))))
        );
        assert_eq!(classify("^"), TypeKind::Pointer(None));
    }

    #[test]
    fn test_classify_unsupported_forms() {
        assert_eq!(classify("["), TypeKind::Unsupported(UnsupportedKind::Array));
        assert_eq!(classify("("), TypeKind::Unsupported(UnsupportedKind::Union));
        assert_eq!(classify("(U=id)"), TypeKind::Unsupported(UnsupportedKind::Union));
        assert_eq!(classify("b"), TypeKind::Unsupported(UnsupportedKind::Bitfield));
        assert_eq!(classify("b12"), TypeKind::Unsupported(UnsupportedKind::Bitfield));
        assert_eq!(classify("Z"), TypeKind::Unknown);
        assert_eq!(classify(""), TypeKind::Unknown);
    }

    #[test]
    fn test_last_character_fallback_and_strict_mode() {
        // `{Open=i` is a truncated struct; the fallback reads its last char.
        assert_eq!(classify("{Open=i"), TypeKind::Scalar(ScalarCode::Int));
        assert_eq!(classify("xd"), TypeKind::Scalar(ScalarCode::Double));

        let strict = MapperOptions::default().strict(true);
        assert_eq!(classify_with("{Open=i", &strict), TypeKind::Unknown);
        assert_eq!(classify_with("xd", &strict), TypeKind::Unknown);
        assert_eq!(classify_with("d", &strict), TypeKind::Scalar(ScalarCode::Double));
    }

    #[test]
    fn test_stacked_qualifiers_depend_on_stripping_mode() {
        let once = MapperOptions::default()
            .strict(true)
            .qualifier_stripping(QualifierStripping::Once);
        let iterative = MapperOptions::default().strict(true);

        assert_eq!(classify_with("rn^v", &iterative), classify("^v"));
        // One pass leaves `n^v`, which is nothing in strict mode.
        assert_eq!(classify_with("rn^v", &once), TypeKind::Unknown);
        // Without strict mode the last-character fallback hides the difference.
        assert_eq!(
            classify_with("rn^v", &MapperOptions::default().qualifier_stripping(QualifierStripping::Once)),
            TypeKind::Scalar(ScalarCode::Void)
        );
    }
}
