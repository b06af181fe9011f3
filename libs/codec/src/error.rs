//! Codec-level errors with the context needed to diagnose malformed
//! messages: what was expected, what was found, and for decode failures
//! how many bytes had been consumed when the operation failed.

use thiserror::Error;

/// Errors produced by the ISO-8583 codec.
///
/// Variants fall into four groups: framing (bitmap/stream shape), schema
/// (descriptor and field-name problems), encoding (registry lookups and
/// transform failures) and invariant violations (message-level rules such
/// as a missing MTI). All of them are fatal to the operation that raised
/// them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("wrong bitmap length: need {need} bytes, got {got}")]
    WrongBitmapLength { need: usize, got: usize },

    #[error("bad bitmap section {0}: sections are numbered from 1")]
    BadBitmapSection(u32),

    #[error("impossible bitmap: section [{inferior}, {superior}] cannot address element {highest}")]
    ImpossibleBitmap {
        inferior: u32,
        superior: u32,
        highest: u32,
    },

    #[error("bit {0} is the continuation flag and must not be set by the caller")]
    FirstBitProhibited(u32),

    #[error("message remainder ({remaining} bytes) is shorter than the required {need}")]
    MessageTooShort { need: usize, remaining: usize },

    #[error("length prefix {text:?} is not a decimal integer")]
    LengthPrefixNotNumeric { text: String },

    #[error("content length {len} exceeds the {limit} limit of a {digits}-digit prefix")]
    LengthLimitExceeded {
        len: usize,
        limit: usize,
        digits: usize,
    },

    #[error("encoding {0:?} is not registered")]
    UnknownEncoding(String),

    #[error("encoding {name:?} failed: {reason}")]
    EncodingFailed { name: String, reason: String },

    #[error("unknown field {0} in message, upcoming fields cannot be resolved")]
    UnknownField(u32),

    #[error("field {0} is repeated in the schema")]
    DuplicateField(String),

    #[error("invalid field name {0:?}")]
    InvalidFieldName(String),

    #[error("field {name}: invalid length {text:?}")]
    InvalidLength { name: String, text: String },

    #[error("field 0 is not addressable")]
    FieldZeroProhibited,

    #[error("field {field}: value does not match declared kind")]
    ValueKindMismatch { field: String },

    #[error("MTI is not present")]
    MtiMissing,

    #[error("MTI must be 4 decimal digits, got {0:?}")]
    MtiMalformed(String),

    #[error("primary bitmap is not declared in the schema")]
    PrimaryBitmapMissing,

    #[error("primary bitmap resolved without content")]
    PrimaryBitmapEmpty,

    #[error("field {field} reported {consumed} consumed bytes but only {remaining} remain")]
    ConsumedOverrun {
        field: String,
        consumed: usize,
        remaining: usize,
    },
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// A decode failure together with the number of bytes consumed before it.
///
/// The unmarshaller always reports how far it got; callers use the offset
/// to point at the offending region of a captured frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{source} (after {consumed} consumed bytes)")]
pub struct UnmarshalError {
    pub consumed: usize,
    pub source: CodecError,
}

impl UnmarshalError {
    pub(crate) fn at(consumed: usize, source: CodecError) -> Self {
        Self { consumed, source }
    }
}
