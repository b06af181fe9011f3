//! Zero-padded decimal length framing for the LL/LLL family of fields.
//!
//! The marshal direction always emits the full digit count of the kind
//! (2 for LL, 3 for LLL); the unmarshal direction reads however many
//! prefix bytes the descriptor declares, because an encoded prefix does
//! not have to occupy one byte per digit.

use crate::encoding::EncodingRegistry;
use crate::error::{CodecError, CodecResult};

/// Prepends a `digits`-wide, zero-padded decimal length to `body`. The
/// prefix is encoded under `prefix_encoding`; the body passes through
/// unchanged.
pub fn length_marshal(
    digits: usize,
    body: &[u8],
    prefix_encoding: &str,
    registry: &EncodingRegistry,
) -> CodecResult<Vec<u8>> {
    let value = body.len().to_string();
    if value.len() > digits {
        return Err(CodecError::LengthLimitExceeded {
            len: body.len(),
            limit: 10usize.pow(digits as u32) - 1,
            digits,
        });
    }

    let padded = format!("{value:0>digits$}");
    let mut out = registry.encode(prefix_encoding, padded.as_bytes())?;
    out.extend_from_slice(body);
    Ok(out)
}

/// Reads a `prefix_len`-byte length prefix and the value bytes it
/// announces. Returns the total consumed count and the raw value bytes;
/// decoding the value body is the caller's concern.
///
/// `digits` only names the field family (2 for LL, 3 for LLL) in errors.
pub fn length_unmarshal(
    digits: usize,
    stream: &[u8],
    prefix_len: usize,
    prefix_encoding: &str,
    registry: &EncodingRegistry,
) -> CodecResult<(usize, Vec<u8>)> {
    let _ = digits;

    if stream.len() < prefix_len {
        return Err(CodecError::MessageTooShort {
            need: prefix_len,
            remaining: stream.len(),
        });
    }

    let prefix = registry.decode(prefix_encoding, &stream[..prefix_len])?;
    let text = String::from_utf8_lossy(&prefix).into_owned();
    let value_len: usize = text
        .parse()
        .map_err(|_| CodecError::LengthPrefixNotNumeric { text: text.clone() })?;

    if stream.len() - prefix_len < value_len {
        return Err(CodecError::MessageTooShort {
            need: value_len,
            remaining: stream.len() - prefix_len,
        });
    }

    let value = stream[prefix_len..prefix_len + value_len].to_vec();
    Ok((prefix_len + value_len, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marshal_pads_to_the_digit_count() {
        let registry = EncodingRegistry::new();
        assert_eq!(
            length_marshal(2, b"abcd", "ascii", &registry).unwrap(),
            b"04abcd"
        );
        assert_eq!(
            length_marshal(3, b"abcd", "ascii", &registry).unwrap(),
            b"004abcd"
        );
    }

    #[test]
    fn marshal_encodes_the_prefix_only() {
        let registry = EncodingRegistry::new();
        let out = length_marshal(2, b"ascii", "ebcdic", &registry).unwrap();
        assert_eq!(out, [&[0xF0, 0xF5][..], b"ascii"].concat());
    }

    #[test]
    fn marshal_rejects_oversized_bodies() {
        let registry = EncodingRegistry::new();
        let body = vec![b'x'; 100];
        assert_eq!(
            length_marshal(2, &body, "ascii", &registry),
            Err(CodecError::LengthLimitExceeded {
                len: 100,
                limit: 99,
                digits: 2,
            })
        );
    }

    #[test]
    fn unmarshal_reads_prefix_then_value() {
        let registry = EncodingRegistry::new();
        let (consumed, value) = length_unmarshal(2, b"04abcdXX", 2, "ascii", &registry).unwrap();
        assert_eq!(consumed, 6);
        assert_eq!(value, b"abcd");
    }

    #[test]
    fn unmarshal_prefix_width_is_the_descriptor_length() {
        // A one-byte EBCDIC "6" announces six value bytes.
        let registry = EncodingRegistry::new();
        let stream = [&[0xF6][..], b"ebcdic"].concat();
        let (consumed, value) = length_unmarshal(2, &stream, 1, "ebcdic", &registry).unwrap();
        assert_eq!(consumed, 7);
        assert_eq!(value, b"ebcdic");
    }

    #[test]
    fn unmarshal_errors_on_short_prefix() {
        let registry = EncodingRegistry::new();
        assert_eq!(
            length_unmarshal(2, b"asd", 10, "ascii", &registry),
            Err(CodecError::MessageTooShort {
                need: 10,
                remaining: 3,
            })
        );
    }

    #[test]
    fn unmarshal_errors_on_short_value() {
        let registry = EncodingRegistry::new();
        assert_eq!(
            length_unmarshal(2, b"990234", 2, "ascii", &registry),
            Err(CodecError::MessageTooShort {
                need: 99,
                remaining: 4,
            })
        );
    }

    #[test]
    fn unmarshal_rejects_non_decimal_prefixes() {
        let registry = EncodingRegistry::new();
        assert_eq!(
            length_unmarshal(2, b"a0234", 1, "ascii", &registry),
            Err(CodecError::LengthPrefixNotNumeric {
                text: "a".to_string()
            })
        );
    }
}
