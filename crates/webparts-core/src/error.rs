//! Codec and part errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Low-level cause of a failed state decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("missing personalization state marker")]
    BadMarker,

    #[error("data truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("unknown token tag 0x{tag:02x} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },

    #[error("invalid utf-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("unknown interned string index {0}")]
    UnknownStringIndex(u32),

    #[error("token {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("token stream ended at {position}, expected {expected}")]
    MissingToken {
        position: usize,
        expected: &'static str,
    },

    #[error("unsupported personalization format version {0}")]
    UnsupportedVersion(i32),

    #[error("negative {what} count {count}")]
    NegativeCount { what: &'static str, count: i32 },

    #[error("value nesting deeper than {0}")]
    TooDeep(usize),

    #[error("{0} trailing bytes after token stream")]
    TrailingBytes(usize),

    #[error("{0} unread tokens after last record")]
    TrailingTokens(usize),
}

/// Failure of the personalization codec.
///
/// Decoding is all-or-nothing: any problem anywhere in the blob surfaces as
/// [`CodecError::Malformed`] with the decoding cause attached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("malformed personalization data")]
    Malformed(#[source] DecodeError),
}

impl From<DecodeError> for CodecError {
    fn from(err: DecodeError) -> Self {
        Self::Malformed(err)
    }
}

/// Error raised by a part when a property cannot be read or written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartError {
    #[error("unknown property '{0}'")]
    UnknownProperty(SmolStr),

    #[error("property '{property}' expects {expected}, got {found}")]
    TypeMismatch {
        property: SmolStr,
        expected: &'static str,
        found: &'static str,
    },

    #[error("property '{property}' rejected value: {reason}")]
    Rejected { property: SmolStr, reason: SmolStr },
}
