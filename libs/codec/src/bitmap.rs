//! Presence bitmaps.
//!
//! A bitmap records which elements of a message are present. Bits are
//! numbered from 1, where bit 1 is the most significant bit of the first
//! byte. Inside an ISO-8583 section of 64 bits, bit 1 is not a field at
//! all: it is the continuation flag announcing that another section
//! follows.
//!
//! Decoded bitmaps keep explicit `false` entries for every observed bit,
//! so a decoded 8-byte bitmap always carries 64 keys. Encoding only cares
//! about the `true` entries but uses the highest key to size the output.

use std::collections::BTreeMap;

use crate::error::{CodecError, CodecResult};

/// Presence map over 1-based bit positions. Ordered so that iteration and
/// equality are deterministic.
pub type Bitmap = BTreeMap<u32, bool>;

const SECTION_BYTES: usize = 8;
const BITS_IN_BYTE: u32 = 8;
const SECTION_BITS: u32 = 64;
const CONTINUATION_BIT: u32 = 1;

/// Records every bit of `bytes` into a presence map. The most significant
/// bit of the first byte becomes key 1.
pub fn from_bytes(bytes: &[u8]) -> Bitmap {
    let mut elements = Bitmap::new();

    for (byte_position, byte) in bytes.iter().enumerate() {
        for bit_offset in (0..BITS_IN_BYTE).rev() {
            let position = byte_position as u32 * BITS_IN_BYTE + (BITS_IN_BYTE - bit_offset);
            elements.insert(position, byte & (1 << bit_offset) != 0);
        }
    }

    elements
}

/// Serialises a presence map into `ceil(max/8)` bytes, most significant
/// bit first. Keys absent from the map are treated as off.
pub fn to_bytes(bitmap: &Bitmap) -> Vec<u8> {
    let (_, highest) = extremities(bitmap);
    let len = (highest as usize + SECTION_BYTES - 1) / SECTION_BYTES;

    let mut bytes = vec![0u8; len];
    for (byte_position, byte) in bytes.iter_mut().enumerate() {
        for bit_offset in (0..BITS_IN_BYTE).rev() {
            let position = byte_position as u32 * BITS_IN_BYTE + (BITS_IN_BYTE - bit_offset);
            if bitmap.get(&position).copied().unwrap_or(false) {
                *byte |= 1 << bit_offset;
            }
        }
    }

    bytes
}

/// Lowest and highest keys of the map, `(0, 0)` when empty.
pub fn extremities(bitmap: &Bitmap) -> (u32, u32) {
    let lowest = bitmap.keys().next().copied().unwrap_or(0);
    let highest = bitmap.keys().next_back().copied().unwrap_or(0);
    (lowest, highest)
}

/// Reads one 8-byte ISO-8583 bitmap section.
///
/// `section` says which section of the chain this is (1 for the primary
/// bitmap). The continuation flag (bit 1 of the section) is stripped from
/// the map and returned separately; every other bit is shifted into the
/// element range the section addresses, so section 2 yields keys 66..=128.
pub fn iso_from_bytes(bytes: &[u8], section: u32) -> CodecResult<(Bitmap, bool)> {
    if bytes.len() != SECTION_BYTES {
        return Err(CodecError::WrongBitmapLength {
            need: SECTION_BYTES,
            got: bytes.len(),
        });
    }

    if section < 1 {
        return Err(CodecError::BadBitmapSection(section));
    }

    let raw = from_bytes(bytes);
    let mut elements = Bitmap::new();

    for (&position, &on) in &raw {
        if position != CONTINUATION_BIT {
            elements.insert(SECTION_BITS * (section - 1) + position, on);
        }
    }

    Ok((elements, raw[&CONTINUATION_BIT]))
}

/// Builds one 8-byte ISO-8583 bitmap section from a presence map.
///
/// The section is inferred from the lowest element: the greatest
/// `64k + 1` not above it becomes the section start, and only elements up
/// to `start + 63` fit. The continuation flag is written at the section
/// start and must not already be present in the input map.
pub fn iso_to_bytes(bitmap: &Bitmap, continuation: bool) -> CodecResult<Vec<u8>> {
    let (lowest, highest) = extremities(bitmap);

    let mut inferior = 1;
    let mut checked = 1;
    while checked < lowest {
        inferior = checked;
        checked += SECTION_BITS;
    }

    let superior = inferior + SECTION_BITS - 1;

    if superior < highest {
        return Err(CodecError::ImpossibleBitmap {
            inferior,
            superior,
            highest,
        });
    }

    if bitmap.contains_key(&inferior) {
        return Err(CodecError::FirstBitProhibited(inferior));
    }

    let mut section = bitmap.clone();
    section.insert(inferior, continuation);
    section.entry(superior).or_insert(false);

    let bytes = to_bytes(&section);
    Ok(bytes[bytes.len() - SECTION_BYTES..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::bits_from_str;

    fn all_true(range: impl Iterator<Item = u32>) -> Bitmap {
        range.map(|n| (n, true)).collect()
    }

    #[test]
    fn first_section_all_set() {
        let input = bits_from_str(
            "11111111 11111111 11111111 11111111 11111111 11111111 11111111 11111111",
        );
        let (elements, continuation) = iso_from_bytes(&input, 1).unwrap();
        assert!(continuation);
        assert_eq!(elements, all_true(2..=64));
    }

    #[test]
    fn second_section_all_set() {
        let input = bits_from_str(
            "11111111 11111111 11111111 11111111 11111111 11111111 11111111 11111111",
        );
        let (elements, continuation) = iso_from_bytes(&input, 2).unwrap();
        assert!(continuation);
        assert_eq!(elements, all_true(66..=128));
    }

    #[test]
    fn first_section_without_continuation() {
        let input = bits_from_str(
            "01111111 11111111 11111111 11111111 11111111 11111111 11111111 11111111",
        );
        let (elements, continuation) = iso_from_bytes(&input, 1).unwrap();
        assert!(!continuation);
        assert_eq!(elements, all_true(2..=64));
    }

    #[test]
    fn last_bit_of_every_byte_off() {
        let input = bits_from_str(
            "11111110 11111110 11111110 11111110 11111110 11111110 11111110 11111110",
        );
        let (elements, continuation) = iso_from_bytes(&input, 1).unwrap();
        assert!(continuation);

        let mut expected = all_true(2..=64);
        for n in (8..=64).step_by(8) {
            expected.insert(n, false);
        }
        assert_eq!(elements, expected);
    }

    #[test]
    fn too_short_input() {
        assert_eq!(
            iso_from_bytes(&[0xFE], 1),
            Err(CodecError::WrongBitmapLength { need: 8, got: 1 })
        );
    }

    #[test]
    fn bad_section_number() {
        assert_eq!(
            iso_from_bytes(&[0xFE; 8], 0),
            Err(CodecError::BadBitmapSection(0))
        );
    }

    #[test]
    fn single_element_in_third_section() {
        // 192 is the last element of the 129..=192 section.
        let bitmap = Bitmap::from([(192, true)]);
        assert_eq!(
            iso_to_bytes(&bitmap, false).unwrap(),
            vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn continuation_flag_is_written() {
        let bitmap = Bitmap::from([(2, true), (64, true)]);
        assert_eq!(
            iso_to_bytes(&bitmap, true).unwrap(),
            vec![0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn elements_spanning_two_sections_are_impossible() {
        let bitmap = Bitmap::from([(130, true), (193, true)]);
        assert_eq!(
            iso_to_bytes(&bitmap, false),
            Err(CodecError::ImpossibleBitmap {
                inferior: 129,
                superior: 192,
                highest: 193,
            })
        );
    }

    #[test]
    fn manually_set_continuation_bit_is_rejected() {
        let bitmap = Bitmap::from([(1, false), (5, true)]);
        assert_eq!(
            iso_to_bytes(&bitmap, false),
            Err(CodecError::FirstBitProhibited(1))
        );
    }

    #[test]
    fn iso_round_trip_strips_the_continuation_flag() {
        let bitmap = Bitmap::from([(3, true), (17, true), (42, true)]);
        let bytes = iso_to_bytes(&bitmap, true).unwrap();
        let (decoded, continuation) = iso_from_bytes(&bytes, 1).unwrap();

        assert!(continuation);
        for (position, on) in &bitmap {
            assert_eq!(decoded.get(position), Some(on));
        }
        assert!(!decoded.contains_key(&1));
    }

    #[test]
    fn raw_round_trip_preserves_every_byte() {
        for input in [
            vec![0x00; 8],
            vec![0xFF; 8],
            vec![0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0],
            bits_from_str("00010001 10000001 00010001 10000000"),
        ] {
            assert_eq!(to_bytes(&from_bytes(&input)), input);
        }
    }

    #[test]
    fn to_bytes_sizes_output_from_the_highest_element() {
        let bitmap = Bitmap::from([(9, true)]);
        assert_eq!(to_bytes(&bitmap), vec![0x00, 0x80]);
        assert!(to_bytes(&Bitmap::new()).is_empty());
    }
}
