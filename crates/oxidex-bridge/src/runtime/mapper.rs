//! Type mapper: encoding tokens to native types.
//!
//! A token is resolved in this order, first match wins:
//!
//! 1. struct encoding: cached descriptor by canonical name, otherwise parse,
//!    map every field, lay out, publish
//! 2. `^` prefix: opaque pointer (the pointee is never resolved)
//! 3. whole (qualifier-stripped) token in the scalar table
//! 4. last character in the scalar table, unless strict
//! 5. error: array, union, bit-field or unknown
//!
//! # Struct resolution
//!
//! The cache is consulted by name before the token body is even parsed, so
//! the first encoding seen for a name defines it for the life of the cache.
//!
//! A miss pushes a placeholder descriptor onto a per-call resolution stack
//! before the fields are mapped. A field that names a struct still on the
//! stack receives that placeholder, so self-referencing graphs terminate.
//! Placeholders live only on the stack: a struct is published once its
//! layout is final, and a struct that captured a placeholder is held back
//! until that placeholder is final too, including when it captured one only
//! through another held struct. The held group is published in one step with
//! the struct that closes it. Other threads therefore see either nothing or
//! a complete descriptor. Two threads racing on one name may both
//! build it; the cache keeps the first and both callers receive it.

use std::sync::{Arc, OnceLock};

use oxidex_log::{debug, trace};

use super::native::{NativeType, StructType};
use super::struct_cache::{StructCache, global_struct_cache};
use crate::config::MapperOptions;
use crate::encoding::structs::{self, is_struct_encoding, parse_name};
use crate::encoding::kind::classify_with;
use crate::encoding::{SignatureShape, TypeKind, strip_qualifiers};
use crate::error::{Error, Result};

/// Whether a signature carries the implicit receiver and selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignatureKind {
    /// An Objective-C method: arguments start with `@` and `:`.
    #[default]
    Method,
    /// A plain C function: no implicit arguments.
    Function,
}

/// A signature with every token mapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappedSignature {
    /// Return type.
    pub return_type: NativeType,
    /// Argument types in order, including the receiver and selector of a
    /// method.
    pub argument_types: Vec<NativeType>,
    /// How the signature was validated.
    pub kind: SignatureKind,
}

impl MappedSignature {
    /// Arguments after the implicit receiver and selector. For a function
    /// signature this is every argument.
    #[must_use]
    pub fn explicit_arguments(&self) -> &[NativeType] {
        match self.kind {
            SignatureKind::Method => self.argument_types.get(2..).unwrap_or(&[]),
            SignatureKind::Function => &self.argument_types,
        }
    }
}

/// Cache key for a struct: its name, or the whole encoding for anonymous
/// structs (`{?=...}` and `{=...}`), which would otherwise all collide.
fn cache_key<'a>(name: &'a str, token: &'a str) -> &'a str {
    if name.is_empty() || name == "?" { token } else { name }
}

/// A struct whose fields are being mapped.
struct Frame {
    key: String,
    ty: Arc<StructType>,
    /// Lowest stack index this struct captured a placeholder from.
    low: usize,
    /// Length of `Resolution::held` when this frame was pushed.
    held_mark: usize,
}

/// A complete struct waiting for an ancestor placeholder to be finalized.
struct Held {
    key: String,
    ty: Arc<StructType>,
    /// Lowest stack index the struct depends on.
    low: usize,
}

/// Per-call struct resolution state.
#[derive(Default)]
struct Resolution {
    stack: Vec<Frame>,
    held: Vec<Held>,
}

impl Resolution {
    /// Returns the in-progress or held descriptor for `key`, recording the
    /// dependency of the innermost frame on it.
    fn find(&mut self, key: &str) -> Option<Arc<StructType>> {
        let (ty, low) = if let Some(index) = self.stack.iter().position(|f| f.key == key) {
            (Arc::clone(&self.stack[index].ty), index)
        } else {
            let held = self.held.iter().find(|h| h.key == key)?;
            (Arc::clone(&held.ty), held.low)
        };
        if let Some(top) = self.stack.last_mut() {
            top.low = top.low.min(low);
        }
        Some(ty)
    }
}

/// Global mapper options, fixed by the first of [`crate::init`] or
/// [`TypeMapper::global`].
static GLOBAL_OPTIONS: OnceLock<MapperOptions> = OnceLock::new();

pub(crate) fn set_global_options(options: MapperOptions) -> bool {
    GLOBAL_OPTIONS.set(options).is_ok()
}

/// Maps encoding tokens and signatures to [`NativeType`]s through a
/// [`StructCache`].
#[derive(Clone, Copy)]
pub struct TypeMapper<'c> {
    cache: &'c dyn StructCache,
    options: MapperOptions,
}

impl<'c> TypeMapper<'c> {
    /// Creates a mapper over `cache` with default options.
    pub fn new(cache: &'c dyn StructCache) -> Self {
        Self::with_options(cache, MapperOptions::default())
    }

    /// Creates a mapper over `cache`.
    pub fn with_options(cache: &'c dyn StructCache, options: MapperOptions) -> Self {
        TypeMapper { cache, options }
    }

    /// The options in effect.
    #[must_use]
    pub fn options(&self) -> MapperOptions {
        self.options
    }

    /// Classifies `token` without mapping it.
    #[must_use]
    pub fn classify(&self, token: &str) -> TypeKind {
        classify_with(token, &self.options)
    }

    /// Maps one type token.
    ///
    /// ```
    /// use oxidex_bridge::runtime::{NativeType, StructTable, TypeMapper};
    ///
    /// let cache = StructTable::new();
    /// let mapper = TypeMapper::new(&cache);
    /// assert_eq!(mapper.map_token("rd").unwrap(), NativeType::Double);
    /// assert_eq!(mapper.map_token("^{CGPoint=dd}").unwrap(), NativeType::Pointer);
    ///
    /// let point = mapper.map_token("{CGPoint=\"x\"d\"y\"d}").unwrap();
    /// assert_eq!(point.size(), 16);
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::ArrayUnsupported`], [`Error::UnionUnsupported`],
    /// [`Error::BitfieldUnsupported`] or [`Error::UnknownType`] for tokens
    /// with no native mapping, and [`Error::UnsupportedEncoding`] for struct
    /// encodings whose field list cannot be split.
    pub fn map_token(&self, token: &str) -> Result<NativeType> {
        let mut resolution = Resolution::default();
        self.map_in(token, &mut resolution)
            .inspect_err(|e| debug!("cannot map {token:?}: {e}"))
    }

    /// Maps each token in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// See [`TypeMapper::map_token`].
    pub fn map_tokens<T: AsRef<str>>(&self, tokens: &[T]) -> Result<Vec<NativeType>> {
        tokens.iter().map(|t| self.map_token(t.as_ref())).collect()
    }

    /// Maps a method signature, checking its receiver and selector markers
    /// first.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedSignature`] if `argument_tokens[0]` is not `@` or
    /// `argument_tokens[1]` is not `:`; otherwise see
    /// [`TypeMapper::map_token`].
    pub fn map_signature(&self, shape: &SignatureShape) -> Result<MappedSignature> {
        self.map_shape(shape, SignatureKind::Method)
    }

    /// Maps a plain function signature. No argument is implicit.
    ///
    /// # Errors
    ///
    /// See [`TypeMapper::map_token`].
    pub fn map_function_signature(&self, shape: &SignatureShape) -> Result<MappedSignature> {
        self.map_shape(shape, SignatureKind::Function)
    }

    /// Maps `shape` as the given kind of signature.
    ///
    /// # Errors
    ///
    /// See [`TypeMapper::map_signature`].
    pub fn map_shape(&self, shape: &SignatureShape, kind: SignatureKind) -> Result<MappedSignature> {
        if kind == SignatureKind::Method {
            shape
                .validate_method()
                .inspect_err(|e| debug!("rejecting signature: {e}"))?;
        }
        Ok(MappedSignature {
            return_type: self.map_token(shape.return_token())?,
            argument_types: self.map_tokens(shape.argument_tokens())?,
            kind,
        })
    }

    /// Tokenizes and maps a flat method encoding such as `"v24@0:8@16"`.
    ///
    /// ```
    /// use oxidex_bridge::runtime::{NativeType, StructTable, TypeMapper};
    ///
    /// let cache = StructTable::new();
    /// let sig = TypeMapper::new(&cache).map_method_encoding("v@:").unwrap();
    /// assert_eq!(sig.return_type, NativeType::Void);
    /// assert_eq!(sig.argument_types, [NativeType::Object, NativeType::Selector]);
    /// ```
    ///
    /// # Errors
    ///
    /// See [`TypeMapper::map_signature`].
    pub fn map_method_encoding(&self, raw: &str) -> Result<MappedSignature> {
        self.map_signature(&SignatureShape::parse(raw)?)
    }

    /// Returns the cached descriptor for a canonical struct name.
    #[must_use]
    pub fn struct_named(&self, name: &str) -> Option<Arc<StructType>> {
        self.cache.get(name)
    }

    fn map_in(&self, token: &str, resolution: &mut Resolution) -> Result<NativeType> {
        match self.classify(token) {
            TypeKind::StructRef(_) => {
                let stripped = strip_qualifiers(token, self.options.qualifiers);
                self.resolve_struct(stripped, resolution).map(NativeType::Struct)
            }
            TypeKind::Pointer(_) => Ok(NativeType::Pointer),
            TypeKind::Scalar(code) => Ok(NativeType::from(code)),
            TypeKind::Unsupported(kind) => Err(kind.into_error(token)),
            TypeKind::Unknown => Err(Error::UnknownType {
                token: token.to_string(),
            }),
        }
    }

    fn resolve_struct(&self, token: &str, resolution: &mut Resolution) -> Result<Arc<StructType>> {
        debug_assert!(is_struct_encoding(token));
        let name = parse_name(token)?;
        let key = cache_key(name, token);

        if let Some(ty) = self.cache.get(key) {
            trace!("struct cache hit for {key}");
            return Ok(ty);
        }
        if let Some(ty) = resolution.find(key) {
            trace!("struct {key} is still being resolved, using its placeholder");
            return Ok(ty);
        }

        let descriptor = structs::parse(token)?;
        let index = resolution.stack.len();
        let placeholder = StructType::placeholder(name);
        resolution.stack.push(Frame {
            key: key.to_string(),
            ty: Arc::clone(&placeholder),
            low: index,
            held_mark: resolution.held.len(),
        });

        let mut fields = Vec::with_capacity(descriptor.fields.len());
        for field in descriptor.fields {
            match self.map_in(&field.type_token, resolution) {
                Ok(ty) => fields.push((field.name, ty)),
                Err(e) => {
                    // Nothing from this subtree gets published.
                    let mark = resolution.stack[index].held_mark;
                    resolution.stack.truncate(index);
                    resolution.held.truncate(mark);
                    return Err(e);
                }
            }
        }

        let (low, held_mark) = {
            let frame = &resolution.stack[index];
            (frame.low, frame.held_mark)
        };
        resolution.stack.truncate(index);
        placeholder.complete(fields);
        let key = key.to_string();
        debug!(
            "defined struct {key} ({} members, {} bytes)",
            placeholder.members().len(),
            placeholder.size()
        );

        if low < index {
            // Captured an ancestor's placeholder: publish together with it.
            if let Some(parent) = resolution.stack.last_mut() {
                parent.low = parent.low.min(low);
            }
            for held in &mut resolution.held[held_mark..] {
                held.low = held.low.min(low);
            }
            resolution.held.push(Held {
                key,
                ty: Arc::clone(&placeholder),
                low,
            });
            return Ok(placeholder);
        }

        let members = resolution
            .held
            .drain(held_mark..)
            .map(|held| (held.key, held.ty))
            .collect();
        Ok(self.cache.insert_group(&key, placeholder, members))
    }
}

impl TypeMapper<'static> {
    /// A mapper over the process-wide struct cache, with the options set by
    /// [`crate::init`] or the defaults.
    pub fn global() -> Self {
        let options = *GLOBAL_OPTIONS.get_or_init(MapperOptions::default);
        TypeMapper::with_options(global_struct_cache(), options)
    }
}

impl std::fmt::Debug for TypeMapper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMapper")
            .field("cached_structs", &self.cache.len())
            .field("options", &self.options)
            .finish()
    }
}

/// Convenience wrapper: maps `token` through [`TypeMapper::global`].
///
/// # Errors
///
/// See [`TypeMapper::map_token`].
pub fn map_type(token: &str) -> Result<NativeType> {
    TypeMapper::global().map_token(token)
}
