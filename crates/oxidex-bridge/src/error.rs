//! Error types for the `OxideX` encoding bridge.
//!
//! Every failure is reported synchronously at the point of detection and
//! carries the offending token or input text. Parse and mapping errors are
//! deterministic: retrying the same input cannot succeed. Only
//! [`Error::FatalBridge`] reflects the environment rather than the input.

use std::fmt;

/// Which implicit argument of a method signature failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignaturePosition {
    /// The return type token (missing entirely).
    Return,
    /// `argument_tokens[0]`, the receiver (`@`).
    Receiver,
    /// `argument_tokens[1]`, the implicit selector (`:`).
    Selector,
}

impl SignaturePosition {
    /// Human-readable name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SignaturePosition::Return => "return type",
            SignaturePosition::Receiver => "receiver (self)",
            SignaturePosition::Selector => "selector (_cmd)",
        }
    }
}

impl fmt::Display for SignaturePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fieldless discriminant of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// [`Error::MalformedSignature`]
    MalformedSignature,
    /// [`Error::UnsupportedEncoding`]
    UnsupportedEncoding,
    /// [`Error::ArrayUnsupported`]
    ArrayUnsupported,
    /// [`Error::UnionUnsupported`]
    UnionUnsupported,
    /// [`Error::BitfieldUnsupported`]
    BitfieldUnsupported,
    /// [`Error::UnknownType`]
    UnknownType,
    /// [`Error::FatalBridge`]
    FatalBridge,
}

/// Errors produced while parsing encodings, mapping types, or talking to the
/// native selector runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A method signature is missing its receiver or selector marker.
    MalformedSignature {
        /// The position that failed.
        position: SignaturePosition,
        /// The token found at that position, if any.
        found: Option<String>,
        /// The raw signature input.
        input: String,
    },

    /// A struct encoding whose field list cannot be split into name/type
    /// pairs, or a token handed to the struct parser that is not a struct.
    UnsupportedEncoding {
        /// The offending encoding.
        encoding: String,
        /// What went wrong.
        reason: &'static str,
    },

    /// Array types (`[N type]`) are recognized but not mapped.
    ArrayUnsupported {
        /// The offending token.
        token: String,
    },

    /// Union types (`(name=...)`) are recognized but not mapped.
    UnionUnsupported {
        /// The offending token.
        token: String,
    },

    /// Bit-field types (`bN`) are recognized but not mapped.
    BitfieldUnsupported {
        /// The offending token.
        token: String,
    },

    /// The token matches no known type code.
    UnknownType {
        /// The offending token.
        token: String,
    },

    /// The native selector runtime did not return a usable value.
    FatalBridge {
        /// The native operation that failed (e.g. `sel_registerName`).
        operation: &'static str,
        /// Details about the failure.
        detail: String,
    },
}

impl Error {
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedSignature { .. } => ErrorKind::MalformedSignature,
            Error::UnsupportedEncoding { .. } => ErrorKind::UnsupportedEncoding,
            Error::ArrayUnsupported { .. } => ErrorKind::ArrayUnsupported,
            Error::UnionUnsupported { .. } => ErrorKind::UnionUnsupported,
            Error::BitfieldUnsupported { .. } => ErrorKind::BitfieldUnsupported,
            Error::UnknownType { .. } => ErrorKind::UnknownType,
            Error::FatalBridge { .. } => ErrorKind::FatalBridge,
        }
    }

    /// True only for failures of the native runtime itself.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Error::FatalBridge { .. })
    }

    pub(crate) fn unsupported(encoding: &str, reason: &'static str) -> Self {
        Error::UnsupportedEncoding {
            encoding: encoding.to_string(),
            reason,
        }
    }

    pub(crate) fn fatal(operation: &'static str, detail: impl Into<String>) -> Self {
        Error::FatalBridge {
            operation,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedSignature {
                position,
                found: Some(found),
                input,
            } => {
                write!(
                    f,
                    "Malformed method signature {input:?}: expected {position} marker, found {found:?}"
                )
            }
            Error::MalformedSignature {
                position,
                found: None,
                input,
            } => {
                write!(
                    f,
                    "Malformed method signature {input:?}: missing {position}"
                )
            }
            Error::UnsupportedEncoding { encoding, reason } => {
                write!(f, "Unsupported struct encoding {encoding:?}: {reason}")
            }
            Error::ArrayUnsupported { token } => {
                write!(f, "Array types not yet supported: {token}")
            }
            Error::UnionUnsupported { token } => {
                write!(f, "Union types not yet supported: {token}")
            }
            Error::BitfieldUnsupported { token } => {
                write!(f, "Bit field types not yet supported: {token}")
            }
            Error::UnknownType { token } => {
                write!(f, "Could not convert type: {token}")
            }
            Error::FatalBridge { operation, detail } => {
                write!(f, "Native runtime call {operation} failed: {detail}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::ArrayUnsupported {
                token: "[4i]".into()
            }
            .to_string(),
            "Array types not yet supported: [4i]"
        );
        assert_eq!(
            Error::MalformedSignature {
                position: SignaturePosition::Selector,
                found: Some("i".into()),
                input: "v@i".into(),
            }
            .to_string(),
            "Malformed method signature \"v@i\": expected selector (_cmd) marker, found \"i\""
        );
        assert_eq!(
            Error::MalformedSignature {
                position: SignaturePosition::Receiver,
                found: None,
                input: "v".into(),
            }
            .to_string(),
            "Malformed method signature \"v\": missing receiver (self)"
        );
    }

    #[test]
    fn test_error_kind_and_fatality() {
        let fatal = Error::fatal("sel_registerName", "returned NULL");
        assert_eq!(fatal.kind(), ErrorKind::FatalBridge);
        assert!(fatal.is_fatal());

        let unknown = Error::UnknownType { token: "Z".into() };
        assert_eq!(unknown.kind(), ErrorKind::UnknownType);
        assert!(!unknown.is_fatal());
    }
}
