//! Field kinds and values.
//!
//! Every on-wire field belongs to one of a closed set of kinds; the
//! marshaller and unmarshaller pattern-match on the kind instead of
//! probing values for capabilities. Each kind knows how to turn a value
//! into bytes and how to read itself back off a stream, reporting exactly
//! how many bytes it consumed so the caller can keep its cursor honest.

use crate::bitmap::{self, Bitmap};
use crate::encoding::{EncodingRegistry, EncodingSpec};
use crate::error::{CodecError, CodecResult};
use crate::length::{length_marshal, length_unmarshal};
use crate::mti::Mti;

/// The closed set of on-wire field layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Fixed-length text of exactly L encoded bytes.
    Var,
    /// Text with a 2-digit decimal length prefix.
    LlVar,
    /// Text with a 3-digit decimal length prefix.
    LllVar,
    /// Fixed-length raw bytes; encodings do not apply.
    Binary,
    /// Raw bytes with a 2-digit length prefix.
    LlBinary,
    /// Raw bytes with a 3-digit length prefix.
    LllBinary,
    /// Message type indicator: a VAR that must decode to 4 decimal digits.
    Mti,
    /// Presence bitmap of L representative bits.
    Bitmap,
}

/// A field's payload, discriminated the same way the kinds are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Bytes(Vec<u8>),
    Bitmap(Bitmap),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(value.into())
    }

    /// Whether this is the kind's zero value, the condition `omitempty`
    /// descriptors test.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Bytes(b) => b.is_empty(),
            Self::Bitmap(m) => m.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bitmap(&self) -> Option<&Bitmap> {
        match self {
            Self::Bitmap(m) => Some(m),
            _ => None,
        }
    }
}

impl FieldKind {
    pub fn is_bitmap(self) -> bool {
        self == Self::Bitmap
    }

    fn prefix_digits(self) -> usize {
        match self {
            Self::LlVar | Self::LlBinary => 2,
            Self::LllVar | Self::LllBinary => 3,
            _ => 0,
        }
    }

    /// Serialises `value` for the wire. `field` names the field in
    /// errors; `length` is the descriptor's byte length, which only the
    /// bitmap kind consults when encoding.
    pub fn encode(
        self,
        field: &str,
        value: &FieldValue,
        length: usize,
        encoding: &EncodingSpec,
        registry: &EncodingRegistry,
    ) -> CodecResult<Vec<u8>> {
        let _ = length;
        let mismatch = || CodecError::ValueKindMismatch {
            field: field.to_string(),
        };

        match self {
            Self::Var | Self::Mti => {
                let text = value.as_text().ok_or_else(mismatch)?;
                registry.encode(encoding.value(), text.as_bytes())
            }
            Self::LlVar | Self::LllVar => {
                let text = value.as_text().ok_or_else(mismatch)?;
                let body = registry.encode(encoding.value(), text.as_bytes())?;
                length_marshal(self.prefix_digits(), &body, encoding.prefix(), registry)
            }
            Self::Binary => match value {
                FieldValue::Bytes(b) => Ok(b.clone()),
                FieldValue::Text(s) => Ok(s.clone().into_bytes()),
                FieldValue::Bitmap(_) => Err(mismatch()),
            },
            Self::LlBinary | Self::LllBinary => {
                let body = match value {
                    FieldValue::Bytes(b) => b.clone(),
                    FieldValue::Text(s) => s.clone().into_bytes(),
                    FieldValue::Bitmap(_) => return Err(mismatch()),
                };
                length_marshal(self.prefix_digits(), &body, encoding.prefix(), registry)
            }
            Self::Bitmap => {
                let set = value.as_bitmap().ok_or_else(mismatch)?;
                Ok(bitmap::to_bytes(set))
            }
        }
    }

    /// Reads one field off the front of `stream`. Returns the decoded
    /// value and the exact number of bytes consumed. `length` is the
    /// descriptor's byte length: the fixed width for VAR/BINARY, the
    /// prefix width for the length-prefixed kinds, and the representative
    /// bit count for bitmaps.
    pub fn decode(
        self,
        stream: &[u8],
        length: usize,
        encoding: &EncodingSpec,
        registry: &EncodingRegistry,
    ) -> CodecResult<(FieldValue, usize)> {
        match self {
            Self::Var => {
                let (text, consumed) = decode_text(stream, length, encoding, registry)?;
                Ok((FieldValue::Text(text), consumed))
            }
            Self::Mti => {
                let (text, consumed) = decode_text(stream, length, encoding, registry)?;
                Mti::new(&text)?;
                Ok((FieldValue::Text(text), consumed))
            }
            Self::LlVar | Self::LllVar => {
                let (consumed, raw) = length_unmarshal(
                    self.prefix_digits(),
                    stream,
                    length,
                    encoding.prefix(),
                    registry,
                )?;
                let decoded = registry.decode(encoding.value(), &raw)?;
                let text = trim_non_graphic(&String::from_utf8_lossy(&decoded)).to_string();
                Ok((FieldValue::Text(text), consumed))
            }
            Self::Binary => {
                if stream.len() < length {
                    return Err(CodecError::MessageTooShort {
                        need: length,
                        remaining: stream.len(),
                    });
                }
                Ok((FieldValue::Bytes(stream[..length].to_vec()), length))
            }
            Self::LlBinary | Self::LllBinary => {
                let (consumed, raw) = length_unmarshal(
                    self.prefix_digits(),
                    stream,
                    length,
                    encoding.prefix(),
                    registry,
                )?;
                Ok((FieldValue::Bytes(raw), consumed))
            }
            Self::Bitmap => {
                let capacity = (length + 7) / 8;
                if stream.len() < capacity {
                    return Err(CodecError::MessageTooShort {
                        need: capacity,
                        remaining: stream.len(),
                    });
                }
                Ok((
                    FieldValue::Bitmap(bitmap::from_bytes(&stream[..capacity])),
                    capacity,
                ))
            }
        }
    }
}

fn decode_text(
    stream: &[u8],
    length: usize,
    encoding: &EncodingSpec,
    registry: &EncodingRegistry,
) -> CodecResult<(String, usize)> {
    if stream.len() < length {
        return Err(CodecError::MessageTooShort {
            need: length,
            remaining: stream.len(),
        });
    }

    let decoded = registry.decode(encoding.value(), &stream[..length])?;
    let text = trim_non_graphic(&String::from_utf8_lossy(&decoded)).to_string();
    Ok((text, length))
}

// Encodings that pad with NUL (EBCDIC's fallback byte) leave control
// characters on the edges of decoded text.
fn trim_non_graphic(s: &str) -> &str {
    s.trim_matches(char::is_control)
}
