//! Signature tokenizer.
//!
//! Splits a method or function type encoding into one token per type. The
//! scanner keeps two pieces of state, a bracket depth and the token being
//! accumulated:
//!
//! - at depth 0, digits are stack-frame offsets and are dropped, and a
//!   scalar code character ends the current token
//! - inside `{}`, `[]` or `()` every character is kept verbatim (array
//!   lengths and nested field lists contain digits and scalar codes)
//! - a token also ends when the depth returns to 0
//!
//! ```
//! use oxidex_bridge::encoding::tokenize;
//!
//! assert_eq!(tokenize("v@:"), ["v", "@", ":"]);
//! assert_eq!(tokenize("c24@0:8^{CGPoint=dd}16"), ["c", "@", ":", "^{CGPoint=dd}"]);
//! ```

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use super::types::{RECEIVER_MARKER, SELECTOR_MARKER};
use super::{is_close_bracket, is_open_bracket, is_scalar_char};
use crate::error::{Error, Result, SignaturePosition};

/// One type of a signature, as it appears in the encoding (qualifiers and
/// pointer prefix included).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Token(String);

impl Token {
    /// Wraps raw token text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Token(text.into())
    }

    /// Returns the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, returning its text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for Token {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(text: &str) -> Self {
        Token(text.to_string())
    }
}

impl From<String> for Token {
    fn from(text: String) -> Self {
        Token(text)
    }
}

impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Token {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits a raw encoding into ordered type tokens.
///
/// The first token is the return type, the rest are arguments. Text left
/// over after the last delimiter (a truncated or unsupported trailing type
/// such as `b4`) is emitted as a final token so the mapper can report it.
#[must_use]
pub fn tokenize(raw: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in raw.chars() {
        if depth == 0 && ch.is_ascii_digit() {
            continue;
        }
        current.push(ch);

        if is_open_bracket(ch) {
            depth += 1;
        } else if is_close_bracket(ch) {
            // A closer with nothing open stays in the token as plain text.
            if depth > 0 {
                depth -= 1;
                if depth == 0 {
                    tokens.push(Token(std::mem::take(&mut current)));
                }
            }
        } else if depth == 0 && is_scalar_char(ch) {
            tokens.push(Token(std::mem::take(&mut current)));
        }
    }

    if !current.is_empty() {
        tokens.push(Token(current));
    }
    tokens
}

/// Return token plus ordered argument tokens of a signature.
///
/// Built either from a flat encoding string ([`SignatureShape::parse`]) or
/// from an already split return/arguments pair
/// ([`SignatureShape::from_parts`]); both produce the same representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureShape {
    return_token: Token,
    argument_tokens: Vec<Token>,
    source: String,
}

impl SignatureShape {
    /// Tokenizes a flat encoding string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSignature`] at [`SignaturePosition::Return`]
    /// if the string contains no type at all.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut tokens = tokenize(raw).into_iter();
        let Some(return_token) = tokens.next() else {
            return Err(Error::MalformedSignature {
                position: SignaturePosition::Return,
                found: None,
                input: raw.to_string(),
            });
        };
        Ok(SignatureShape {
            return_token,
            argument_tokens: tokens.collect(),
            source: raw.to_string(),
        })
    }

    /// Builds a shape from a return type and argument types that were split
    /// by the caller.
    pub fn from_parts<R, I, A>(return_type: R, arguments: I) -> Self
    where
        R: Into<Token>,
        I: IntoIterator<Item = A>,
        A: Into<Token>,
    {
        let return_token = return_type.into();
        let argument_tokens: Vec<Token> = arguments.into_iter().map(Into::into).collect();
        let mut source = return_token.as_str().to_string();
        for arg in &argument_tokens {
            source.push_str(arg);
        }
        SignatureShape {
            return_token,
            argument_tokens,
            source,
        }
    }

    /// The return type token.
    #[must_use]
    pub fn return_token(&self) -> &Token {
        &self.return_token
    }

    /// All argument tokens, including the implicit receiver and selector of
    /// a method signature.
    #[must_use]
    pub fn argument_tokens(&self) -> &[Token] {
        &self.argument_tokens
    }

    /// Arguments after the implicit receiver and selector.
    ///
    /// Only meaningful for method signatures that passed
    /// [`validate_method`](Self::validate_method).
    #[must_use]
    pub fn explicit_arguments(&self) -> &[Token] {
        self.argument_tokens.get(2..).unwrap_or(&[])
    }

    /// The raw input, or the concatenated parts for a split shape.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Return token followed by the argument tokens.
    #[must_use]
    pub fn into_tokens(self) -> Vec<Token> {
        let mut tokens = Vec::with_capacity(self.argument_tokens.len() + 1);
        tokens.push(self.return_token);
        tokens.extend(self.argument_tokens);
        tokens
    }

    /// Checks the receiver (`@`) and selector (`:`) markers every method
    /// signature must start its arguments with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSignature`] naming the first position that
    /// is missing or holds a different token.
    pub fn validate_method(&self) -> Result<()> {
        let expected = [
            (SignaturePosition::Receiver, RECEIVER_MARKER),
            (SignaturePosition::Selector, SELECTOR_MARKER),
        ];
        for (index, (position, marker)) in expected.into_iter().enumerate() {
            match self.argument_tokens.get(index) {
                Some(token) if token == marker => {}
                found => {
                    return Err(Error::MalformedSignature {
                        position,
                        found: found.map(|t| t.as_str().to_string()),
                        input: self.source.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl FromStr for SignatureShape {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        SignatureShape::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_zero_argument_method() {
        assert_eq!(tokenize("v@:"), ["v", "@", ":"]);
    }

    #[test]
    fn test_tokenize_drops_stack_offsets() {
        assert_eq!(tokenize("v24@0:8@16"), ["v", "@", ":", "@"]);
        assert_eq!(tokenize("d40@0:8d16d24q32"), ["d", "@", ":", "d", "d", "q"]);
    }

    #[test]
    fn test_tokenize_keeps_digits_inside_brackets() {
        assert_eq!(tokenize("v@:[16c]"), ["v", "@", ":", "[16c]"]);
        assert_eq!(
            tokenize("{CGRect={CGPoint=dd}{CGSize=dd}}16@0:8"),
            ["{CGRect={CGPoint=dd}{CGSize=dd}}", "@", ":"]
        );
    }

    #[test]
    fn test_tokenize_qualifiers_and_pointers_stay_attached() {
        assert_eq!(tokenize("Vv@:r*^^i"), ["Vv", "@", ":", "r*", "^^i"]);
        assert_eq!(tokenize("v@:^{__CFString=}"), ["v", "@", ":", "^{__CFString=}"]);
    }

    #[test]
    fn test_tokenize_consecutive_delimiters() {
        assert_eq!(tokenize("@@?"), ["@", "@", "?"]);
        assert_eq!(tokenize("::"), [":", ":"]);
    }

    #[test]
    fn test_tokenize_trailing_remainder_is_kept() {
        assert_eq!(tokenize("v@:b4"), ["v", "@", ":", "b"]);
        assert_eq!(tokenize("v@:^"), ["v", "@", ":", "^"]);
        assert_eq!(tokenize("v@:{Open=i"), ["v", "@", ":", "{Open=i"]);
    }

    #[test]
    fn test_tokenize_stray_closer() {
        assert_eq!(tokenize("}i"), ["}i"]);
        assert!(tokenize("").is_empty());
        assert!(tokenize("123").is_empty());
    }

    #[test]
    fn test_shape_parse_and_parts_agree() {
        let parsed = SignatureShape::parse("i24@0:8@16").unwrap();
        let split = SignatureShape::from_parts("i", ["@", ":", "@"]);

        assert_eq!(parsed.return_token(), &Token::from("i"));
        assert_eq!(parsed.argument_tokens(), split.argument_tokens());
        assert_eq!(parsed.explicit_arguments(), [Token::from("@")]);
        assert_eq!(split.source(), "i@:@");
        assert_eq!(parsed.clone().into_tokens(), ["i", "@", ":", "@"]);
    }

    #[test]
    fn test_shape_parse_empty_is_malformed() {
        let err = "".parse::<SignatureShape>().unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedSignature {
                position: SignaturePosition::Return,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_method_markers() {
        assert!(SignatureShape::parse("v@:").unwrap().validate_method().is_ok());

        let err = SignatureShape::parse("vi:").unwrap().validate_method().unwrap_err();
        assert_eq!(
            err,
            Error::MalformedSignature {
                position: SignaturePosition::Receiver,
                found: Some("i".into()),
                input: "vi:".into(),
            }
        );

        let err = SignatureShape::parse("v@").unwrap().validate_method().unwrap_err();
        assert_eq!(
            err,
            Error::MalformedSignature {
                position: SignaturePosition::Selector,
                found: None,
                input: "v@".into(),
            }
        );
    }
}
