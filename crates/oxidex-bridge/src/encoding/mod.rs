//! Objective-C type encodings.
//!
//! Type encodings are the compact strings the Objective-C runtime attaches
//! to methods, ivars and properties (the output of `@encode()`):
//!
//! - `"v@:"` - void return, id self, SEL _cmd (no arguments)
//! - `"i24@0:8@16"` - int return, self, _cmd, one object; digits are stack
//!   offsets
//! - `"{CGPoint=\"x\"d\"y\"d}"` - a struct with two named double fields
//!
//! # Alphabet
//!
//! | Code | Meaning | Code | Meaning |
//! |------|---------|------|---------|
//! | `c` | char | `C` | unsigned char |
//! | `s` | short | `S` | unsigned short |
//! | `i` | int | `I` | unsigned int |
//! | `l` | long (32-bit) | `L` | unsigned long |
//! | `q` | long long | `Q` | unsigned long long |
//! | `f` | float | `d` | double |
//! | `B` | bool | `v` | void |
//! | `*` | C string | `@` | object (id) |
//! | `#` | class | `:` | selector (SEL) |
//! | `?` | unknown / function pointer | `^` | pointer prefix |
//!
//! Compound forms: `{name=...}` struct, `[N type]` array, `(name=...)`
//! union, `bN` bit-field. Method qualifiers `r n N o O R V` may prefix any
//! type and carry no layout information.
//!
//! # Modules
//!
//! - [`tokenizer`]: splits a signature into type tokens
//! - [`structs`]: parses struct encodings into name + field list
//! - [`kind`]: pure classification of a token into a [`TypeKind`]

pub mod kind;
pub mod structs;
pub mod tokenizer;

pub use kind::{TypeKind, UnsupportedKind, classify};
pub use structs::{StructDescriptor, StructField};
pub use tokenizer::{SignatureShape, Token, tokenize};

/// Single-character type code constants.
pub mod types {
    /// Void type encoding
    pub const VOID: char = 'v';

    /// Object (id) type encoding, also the receiver marker
    pub const OBJECT: char = '@';

    /// Selector (SEL) type encoding, also the implicit selector marker
    pub const SELECTOR: char = ':';

    /// Class type encoding
    pub const CLASS: char = '#';

    /// C string (char*) type encoding
    pub const C_STRING: char = '*';

    /// Pointer prefix
    pub const POINTER: char = '^';

    /// Field name quote inside struct encodings
    pub const QUOTE: char = '"';

    /// Separates a struct or union name from its members
    pub const FIELD_SEPARATOR: char = '=';

    /// Bit-field prefix
    pub const BITFIELD: char = 'b';

    /// Receiver marker token of a method signature
    pub const RECEIVER_MARKER: &str = "@";

    /// Implicit selector marker token of a method signature
    pub const SELECTOR_MARKER: &str = ":";
}

/// A scalar/primitive type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarCode {
    /// `c`
    Char,
    /// `i`
    Int,
    /// `s`
    Short,
    /// `l`
    Long,
    /// `q`
    LongLong,
    /// `C`
    UChar,
    /// `I`
    UInt,
    /// `S`
    UShort,
    /// `L`
    ULong,
    /// `Q`
    ULongLong,
    /// `f`
    Float,
    /// `d`
    Double,
    /// `B`
    Bool,
    /// `v`
    Void,
    /// `*`
    CString,
    /// `@`
    Object,
    /// `#`
    Class,
    /// `:`
    Selector,
    /// `?`
    Unknown,
}

impl ScalarCode {
    /// Every scalar code, in alphabet order.
    pub const ALL: [ScalarCode; 19] = [
        ScalarCode::Char,
        ScalarCode::Int,
        ScalarCode::Short,
        ScalarCode::Long,
        ScalarCode::LongLong,
        ScalarCode::UChar,
        ScalarCode::UInt,
        ScalarCode::UShort,
        ScalarCode::ULong,
        ScalarCode::ULongLong,
        ScalarCode::Float,
        ScalarCode::Double,
        ScalarCode::Bool,
        ScalarCode::Void,
        ScalarCode::CString,
        ScalarCode::Object,
        ScalarCode::Class,
        ScalarCode::Selector,
        ScalarCode::Unknown,
    ];

    /// Looks up a scalar code by its encoding character.
    #[must_use]
    pub const fn from_char(ch: char) -> Option<Self> {
        Some(match ch {
            'c' => ScalarCode::Char,
            'i' => ScalarCode::Int,
            's' => ScalarCode::Short,
            'l' => ScalarCode::Long,
            'q' => ScalarCode::LongLong,
            'C' => ScalarCode::UChar,
            'I' => ScalarCode::UInt,
            'S' => ScalarCode::UShort,
            'L' => ScalarCode::ULong,
            'Q' => ScalarCode::ULongLong,
            'f' => ScalarCode::Float,
            'd' => ScalarCode::Double,
            'B' => ScalarCode::Bool,
            'v' => ScalarCode::Void,
            '*' => ScalarCode::CString,
            '@' => ScalarCode::Object,
            '#' => ScalarCode::Class,
            ':' => ScalarCode::Selector,
            '?' => ScalarCode::Unknown,
            _ => return None,
        })
    }

    /// Looks up a scalar code for a whole token, which must be exactly one
    /// code character.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Self::from_char(ch),
            _ => None,
        }
    }

    /// Returns the encoding character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            ScalarCode::Char => 'c',
            ScalarCode::Int => 'i',
            ScalarCode::Short => 's',
            ScalarCode::Long => 'l',
            ScalarCode::LongLong => 'q',
            ScalarCode::UChar => 'C',
            ScalarCode::UInt => 'I',
            ScalarCode::UShort => 'S',
            ScalarCode::ULong => 'L',
            ScalarCode::ULongLong => 'Q',
            ScalarCode::Float => 'f',
            ScalarCode::Double => 'd',
            ScalarCode::Bool => 'B',
            ScalarCode::Void => 'v',
            ScalarCode::CString => '*',
            ScalarCode::Object => '@',
            ScalarCode::Class => '#',
            ScalarCode::Selector => ':',
            ScalarCode::Unknown => '?',
        }
    }
}

/// Checks if a character is one of the scalar type codes. These are also
/// the token delimiters of a signature.
#[must_use]
pub const fn is_scalar_char(ch: char) -> bool {
    ScalarCode::from_char(ch).is_some()
}

/// Method type qualifiers. They annotate distributed-objects semantics and
/// never affect the native type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    /// `r`
    Const,
    /// `n`
    In,
    /// `N`
    Inout,
    /// `o`
    Out,
    /// `O`
    Bycopy,
    /// `R`
    Byref,
    /// `V`
    Oneway,
}

impl Qualifier {
    /// Looks up a qualifier by its encoding character.
    #[must_use]
    pub const fn from_char(ch: char) -> Option<Self> {
        Some(match ch {
            'r' => Qualifier::Const,
            'n' => Qualifier::In,
            'N' => Qualifier::Inout,
            'o' => Qualifier::Out,
            'O' => Qualifier::Bycopy,
            'R' => Qualifier::Byref,
            'V' => Qualifier::Oneway,
            _ => return None,
        })
    }

    /// Returns the encoding character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Qualifier::Const => 'r',
            Qualifier::In => 'n',
            Qualifier::Inout => 'N',
            Qualifier::Out => 'o',
            Qualifier::Bycopy => 'O',
            Qualifier::Byref => 'R',
            Qualifier::Oneway => 'V',
        }
    }

    /// Returns the source-level keyword (`const`, `inout`, ...).
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Qualifier::Const => "const",
            Qualifier::In => "in",
            Qualifier::Inout => "inout",
            Qualifier::Out => "out",
            Qualifier::Bycopy => "bycopy",
            Qualifier::Byref => "byref",
            Qualifier::Oneway => "oneway",
        }
    }
}

/// How many leading qualifiers [`strip_qualifiers`] removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualifierStripping {
    /// Remove qualifiers until none remains (`"rn^v"` → `"^v"`).
    #[default]
    Iterative,
    /// Remove at most one qualifier (`"rn^v"` → `"n^v"`).
    Once,
}

/// Removes leading method qualifiers from a token.
///
/// ```
/// use oxidex_bridge::encoding::{QualifierStripping, strip_qualifiers};
///
/// assert_eq!(strip_qualifiers("r*", QualifierStripping::Iterative), "*");
/// assert_eq!(strip_qualifiers("rn^v", QualifierStripping::Iterative), "^v");
/// assert_eq!(strip_qualifiers("rn^v", QualifierStripping::Once), "n^v");
/// ```
#[must_use]
pub fn strip_qualifiers(token: &str, mode: QualifierStripping) -> &str {
    match mode {
        QualifierStripping::Iterative => {
            token.trim_start_matches(|ch: char| Qualifier::from_char(ch).is_some())
        }
        QualifierStripping::Once => match token.chars().next() {
            Some(ch) if Qualifier::from_char(ch).is_some() => &token[ch.len_utf8()..],
            _ => token,
        },
    }
}

/// Returns the qualifiers prefixing `token`, outermost first.
#[must_use]
pub fn qualifiers(token: &str) -> Vec<Qualifier> {
    token.chars().map_while(Qualifier::from_char).collect()
}

/// Bracket classification used by the tokenizer and the struct parser.
pub(crate) const fn is_open_bracket(ch: char) -> bool {
    matches!(ch, '{' | '[' | '(')
}

pub(crate) const fn is_close_bracket(ch: char) -> bool {
    matches!(ch, '}' | ']' | ')')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_code_round_trip_covers_alphabet() {
        let alphabet: String = ScalarCode::ALL.iter().map(|c| c.as_char()).collect();
        assert_eq!(alphabet, "cislqCISLQfdBv*@#:?");
        for code in ScalarCode::ALL {
            assert_eq!(ScalarCode::from_char(code.as_char()), Some(code));
        }
    }

    #[test]
    fn test_scalar_from_token() {
        assert_eq!(ScalarCode::from_token("d"), Some(ScalarCode::Double));
        assert_eq!(ScalarCode::from_token("dd"), None);
        assert_eq!(ScalarCode::from_token(""), None);
        assert_eq!(ScalarCode::from_token("Z"), None);
    }

    #[test]
    fn test_qualifiers_are_not_scalars() {
        for ch in ['r', 'n', 'N', 'o', 'O', 'R', 'V'] {
            assert!(Qualifier::from_char(ch).is_some());
            assert!(!is_scalar_char(ch));
        }
        assert_eq!(Qualifier::Inout.keyword(), "inout");
        assert_eq!(Qualifier::Oneway.as_char(), 'V');
    }

    #[test]
    fn test_strip_qualifiers_modes() {
        assert_eq!(strip_qualifiers("Vv", QualifierStripping::Iterative), "v");
        assert_eq!(strip_qualifiers("rN@", QualifierStripping::Iterative), "@");
        assert_eq!(strip_qualifiers("rN@", QualifierStripping::Once), "N@");
        assert_eq!(strip_qualifiers("i", QualifierStripping::Once), "i");
        assert_eq!(strip_qualifiers("", QualifierStripping::Iterative), "");
        assert_eq!(qualifiers("rno^i"), vec![Qualifier::Const, Qualifier::In, Qualifier::Out]);
    }
}
