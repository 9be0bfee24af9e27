//! Struct type encodings.
//!
//! A struct encoding is `{name=fields}`. Field lists come in two forms:
//!
//! - named: `{CGPoint="x"d"y"d}`, each field a quoted name followed by its
//!   type
//! - positional: `{CGPoint=dd}`, types only (what `@encode` emits for method
//!   signatures)
//!
//! `{name}` and `{name=}` declare an opaque struct with no known fields.
//! Field types may themselves be structs, arrays or unions, so every split
//! tracks bracket depth and only acts on top-level delimiters.

use super::tokenizer::Token;
use super::types::{BITFIELD, FIELD_SEPARATOR, QUOTE};
use super::{is_close_bracket, is_open_bracket, is_scalar_char};
use crate::error::{Error, Result};

/// One field of a parsed struct encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructField {
    /// Declared field name; empty for positional fields.
    pub name: String,
    /// Unmapped type token of the field.
    pub type_token: Token,
}

/// A struct encoding split into its canonical name and ordered fields.
///
/// Field order is the native layout order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructDescriptor {
    /// Canonical name, the struct cache key.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<StructField>,
}

impl StructDescriptor {
    /// `(name, type)` pairs, for comparisons and diagnostics.
    #[must_use]
    pub fn field_pairs(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), f.type_token.as_str()))
            .collect()
    }
}

/// Returns true if `token` is exactly one balanced `{...}` construct.
///
/// ```
/// use oxidex_bridge::encoding::structs::is_struct_encoding;
///
/// assert!(is_struct_encoding("{CGPoint=dd}"));
/// assert!(!is_struct_encoding("^{CGPoint=dd}"));
/// assert!(!is_struct_encoding("{A=i}{B=i}"));
/// ```
#[must_use]
pub fn is_struct_encoding(token: &str) -> bool {
    if !token.starts_with('{') {
        return false;
    }
    let mut depth = 0usize;
    for (index, ch) in token.char_indices() {
        if is_open_bracket(ch) {
            depth += 1;
        } else if is_close_bracket(ch) {
            let Some(next) = depth.checked_sub(1) else {
                return false;
            };
            depth = next;
            if depth == 0 {
                return index + ch.len_utf8() == token.len() && ch == '}';
            }
        }
    }
    false
}

/// Returns the text between the braces.
fn inner(token: &str) -> Result<&str> {
    if !is_struct_encoding(token) {
        return Err(Error::unsupported(token, "not a struct encoding"));
    }
    Ok(&token[1..token.len() - 1])
}

/// Byte index of the first `=` outside nested brackets.
fn top_level_separator(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, ch) in s.char_indices() {
        if is_open_bracket(ch) {
            depth += 1;
        } else if is_close_bracket(ch) {
            depth = depth.saturating_sub(1);
        } else if ch == FIELD_SEPARATOR && depth == 0 {
            return Some(index);
        }
    }
    None
}

/// Extracts the canonical name of a struct encoding.
///
/// Without an `=` (an opaque struct) the whole inner text is the name.
///
/// # Errors
///
/// Returns [`Error::UnsupportedEncoding`] if `token` is not a struct
/// encoding.
pub fn parse_name(token: &str) -> Result<&str> {
    let inner = inner(token)?;
    Ok(match top_level_separator(inner) {
        Some(eq) => &inner[..eq],
        None => inner,
    })
}

/// Parses a struct encoding into its name and field list.
///
/// ```
/// use oxidex_bridge::encoding::structs::parse;
///
/// let point = parse("{CGPoint=\"x\"d\"y\"d}").unwrap();
/// assert_eq!(point.name, "CGPoint");
/// assert_eq!(point.field_pairs(), [("x", "d"), ("y", "d")]);
/// ```
///
/// # Errors
///
/// Returns [`Error::UnsupportedEncoding`] if the token is not a struct, if
/// the quoted field list does not alternate name/type, or if a field has no
/// type.
pub fn parse(token: &str) -> Result<StructDescriptor> {
    let inner = inner(token)?;
    let Some(eq) = top_level_separator(inner) else {
        return Ok(StructDescriptor {
            name: inner.to_string(),
            fields: Vec::new(),
        });
    };
    let name = inner[..eq].to_string();
    let body = &inner[eq + 1..];

    let fields = if has_top_level_quote(body) {
        named_fields(token, body)?
    } else {
        positional_fields(body)
            .into_iter()
            .map(|ty| StructField {
                name: String::new(),
                type_token: Token::new(ty),
            })
            .collect()
    };

    Ok(StructDescriptor { name, fields })
}

fn has_top_level_quote(body: &str) -> bool {
    let mut depth = 0usize;
    for ch in body.chars() {
        if is_open_bracket(ch) {
            depth += 1;
        } else if is_close_bracket(ch) {
            depth = depth.saturating_sub(1);
        } else if ch == QUOTE && depth == 0 {
            return true;
        }
    }
    false
}

/// Splits `"name"type"name"type...` on top-level quotes and pairs up the
/// segments.
fn named_fields(token: &str, body: &str) -> Result<Vec<StructField>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in body.chars() {
        if ch == QUOTE && depth == 0 {
            segments.push(std::mem::take(&mut current));
            continue;
        }
        if is_open_bracket(ch) {
            depth += 1;
        } else if is_close_bracket(ch) {
            depth = depth.saturating_sub(1);
        }
        current.push(ch);
    }
    segments.push(current);

    // segments = [prefix, name, type, name, type, ...]
    let mut segments = segments.into_iter();
    if segments.next().is_some_and(|prefix| !prefix.is_empty()) {
        return Err(Error::unsupported(token, "type text before the first field name"));
    }
    let rest: Vec<String> = segments.collect();
    if rest.len() % 2 != 0 {
        return Err(Error::unsupported(token, "field name without a type"));
    }

    rest.chunks_exact(2)
        .map(|pair| {
            if pair[1].is_empty() {
                return Err(Error::unsupported(token, "field with an empty type"));
            }
            Ok(StructField {
                name: pair[0].clone(),
                type_token: Token::new(pair[1].clone()),
            })
        })
        .collect()
}

/// Splits a positional field list into one type per field.
///
/// Qualifier and pointer prefixes stay attached to the type they prefix, a
/// bracketed type runs to its matching closer, and a bit-field keeps its
/// width digits.
fn positional_fields(body: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if is_open_bracket(ch) {
            depth += 1;
        } else if is_close_bracket(ch) {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                fields.push(std::mem::take(&mut current));
            }
        } else if depth == 0 && ch == BITFIELD {
            while let Some(digit) = chars.next_if(char::is_ascii_digit) {
                current.push(digit);
            }
            fields.push(std::mem::take(&mut current));
        } else if depth == 0 && is_scalar_char(ch) {
            fields.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        fields.push(current);
    }
    fields
}
