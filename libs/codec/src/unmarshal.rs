//! Message unmarshalling: stream walk driven by the bitmap chain.

use crate::bitmap;
use crate::descriptor::{FieldName, Message, MessageSchema};
use crate::encoding::EncodingRegistry;
use crate::error::{CodecError, UnmarshalError};
use crate::field::FieldValue;

/// Parses one message off the front of `data` according to `schema`.
///
/// Reads the MTI, then the primary bitmap, then every field the bitmap
/// chain announces, in ascending index order. Each decoded bitmap expands
/// the expected-field set, so the iteration ceiling grows as sections
/// appear. Returns the message and the number of bytes consumed; surplus
/// trailing bytes are not an error.
///
/// Every field present on the wire must have a descriptor: the length of
/// an unknown field is unknowable, so nothing after it could be located.
pub fn unmarshal(
    schema: &MessageSchema,
    data: &[u8],
    registry: &EncodingRegistry,
) -> Result<(Message, usize), UnmarshalError> {
    let mut message = Message::new();
    let mut consumed = 0usize;

    // MTI.
    let descriptor = schema
        .field(&FieldName::Mti)
        .ok_or_else(|| UnmarshalError::at(consumed, CodecError::MtiMissing))?;
    let (value, n) = descriptor
        .kind
        .decode(
            &data[consumed..],
            descriptor.effective_length(),
            &descriptor.encoding,
            registry,
        )
        .map_err(|e| UnmarshalError::at(consumed, e))?;
    consumed = advance(consumed, n, data.len(), &FieldName::Mti)?;
    message.set(FieldName::Mti, value);

    // Primary bitmap. Its length tag counts representative bits, which
    // is what the expected-field arithmetic below works in.
    let descriptor = schema
        .field(&FieldName::Bitmap)
        .ok_or_else(|| UnmarshalError::at(consumed, CodecError::PrimaryBitmapMissing))?;
    if !descriptor.kind.is_bitmap() {
        return Err(UnmarshalError::at(
            consumed,
            CodecError::ValueKindMismatch {
                field: FieldName::Bitmap.to_string(),
            },
        ));
    }
    let (value, n) = descriptor
        .kind
        .decode(
            &data[consumed..],
            descriptor.effective_length(),
            &descriptor.encoding,
            registry,
        )
        .map_err(|e| UnmarshalError::at(consumed, e))?;
    consumed = advance(consumed, n, data.len(), &FieldName::Bitmap)?;

    // Own the expected set; the bitmap value keeps its map untouched.
    let mut expected = match &value {
        FieldValue::Bitmap(set) => set.clone(),
        _ => unreachable!("bitmap kind always decodes to a bitmap value"),
    };
    let mut representative_bits = descriptor.effective_length() as u32;
    message.set(FieldName::Bitmap, value);

    let mut index = 1u32;
    loop {
        // Re-read the ceiling every pass: decoded sections extend it.
        let (_, highest) = bitmap::extremities(&expected);
        if index > highest {
            break;
        }

        if expected.get(&index) != Some(&true) {
            index += 1;
            continue;
        }

        let name = FieldName::Index(index);
        let descriptor = schema
            .field(&name)
            .ok_or_else(|| UnmarshalError::at(consumed, CodecError::UnknownField(index)))?;
        let (value, n) = descriptor
            .kind
            .decode(
                &data[consumed..],
                descriptor.effective_length(),
                &descriptor.encoding,
                registry,
            )
            .map_err(|e| UnmarshalError::at(consumed, e))?;
        consumed = advance(consumed, n, data.len(), &name)?;

        if descriptor.kind.is_bitmap() {
            if let FieldValue::Bitmap(section) = &value {
                for (&bit, &on) in section {
                    expected.insert(bit + representative_bits, on);
                }
            }
            representative_bits += descriptor.effective_length() as u32;
        }

        message.set(name, value);
        index += 1;
    }

    Ok((message, consumed))
}

fn advance(
    consumed: usize,
    n: usize,
    total: usize,
    field: &FieldName,
) -> Result<usize, UnmarshalError> {
    let remaining = total - consumed;
    if n > remaining {
        return Err(UnmarshalError::at(
            consumed,
            CodecError::ConsumedOverrun {
                field: field.to_string(),
                consumed: n,
                remaining,
            },
        ));
    }
    Ok(consumed + n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;
    use crate::descriptor::FieldDescriptor;
    use crate::field::FieldKind;

    fn schema(descriptors: Vec<FieldDescriptor>) -> MessageSchema {
        MessageSchema::new(descriptors).unwrap()
    }

    fn d(kind: FieldKind, text: &str) -> FieldDescriptor {
        FieldDescriptor::parse(kind, text).unwrap()
    }

    fn frame(parts: &[&[u8]]) -> Vec<u8> {
        parts.concat()
    }

    #[test]
    fn single_field_message() {
        let schema = schema(vec![
            d(FieldKind::Var, "mti,length:4"),
            d(FieldKind::Bitmap, "bitmap,length:64"),
            d(FieldKind::Var, "2,length:3"),
        ]);
        let data = frame(&[b"1000", &[0x40, 0, 0, 0, 0, 0, 0, 0], b"asd"]);

        let (message, consumed) =
            unmarshal(&schema, &data, &EncodingRegistry::new()).unwrap();
        assert_eq!(consumed, data.len());
        assert_eq!(message.mti(), Some("1000"));
        assert_eq!(message.field_text(2), Some("asd"));

        let primary = message.bitmap(&FieldName::Bitmap).unwrap();
        assert_eq!(primary.len(), 64);
        assert_eq!(primary.get(&2), Some(&true));
        assert_eq!(primary.get(&3), Some(&false));
    }

    #[test]
    fn two_sections() {
        let schema = schema(vec![
            d(FieldKind::Var, "mti,length:4"),
            d(FieldKind::Bitmap, "bitmap,length:64"),
            d(FieldKind::Bitmap, "1,length:64"),
            d(FieldKind::Var, "2,length:3"),
            d(FieldKind::Var, "66,length:3"),
        ]);
        let data = frame(&[
            b"1000",
            &[0xC0, 0, 0, 0, 0, 0, 0, 0], // bits 1 and 2
            &[0x40, 0, 0, 0, 0, 0, 0, 0], // bit 2 of section two: field 66
            b"asdfgh",
        ]);

        let (message, consumed) =
            unmarshal(&schema, &data, &EncodingRegistry::new()).unwrap();
        assert_eq!(consumed, data.len());
        assert_eq!(message.field_text(2), Some("asd"));
        assert_eq!(message.field_text(66), Some("fgh"));

        let secondary = message.bitmap(&FieldName::Index(1)).unwrap();
        assert_eq!(secondary.get(&2), Some(&true));
    }

    #[test]
    fn surplus_trailing_bytes_are_reported_not_rejected() {
        let schema = schema(vec![
            d(FieldKind::Var, "mti,length:4"),
            d(FieldKind::Bitmap, "bitmap,length:64"),
            d(FieldKind::Var, "2,length:3"),
        ]);
        let data = frame(&[b"1000", &[0x40, 0, 0, 0, 0, 0, 0, 0], b"asd", b"extra"]);

        let (_, consumed) = unmarshal(&schema, &data, &EncodingRegistry::new()).unwrap();
        assert_eq!(consumed, data.len() - b"extra".len());
    }

    #[test]
    fn unknown_fields_are_fatal() {
        let schema = schema(vec![
            d(FieldKind::Var, "mti,length:4"),
            d(FieldKind::Bitmap, "bitmap,length:64"),
        ]);
        // Bit 1 announces field 1, which the schema does not know.
        let data = frame(&[b"1000", &[0x80, 0, 0, 0, 0, 0, 0, 0], b"asd"]);

        let err = unmarshal(&schema, &data, &EncodingRegistry::new()).unwrap_err();
        assert_eq!(err.source, CodecError::UnknownField(1));
        assert_eq!(err.consumed, 12);
    }

    #[test]
    fn short_stream_reports_the_offset() {
        let schema = schema(vec![
            d(FieldKind::Var, "mti,length:4"),
            d(FieldKind::Bitmap, "bitmap,length:64"),
            d(FieldKind::Var, "2,length:10"),
        ]);
        let data = frame(&[b"1000", &[0x40, 0, 0, 0, 0, 0, 0, 0], b"asd"]);

        let err = unmarshal(&schema, &data, &EncodingRegistry::new()).unwrap_err();
        assert_eq!(
            err.source,
            CodecError::MessageTooShort {
                need: 10,
                remaining: 3,
            }
        );
        assert_eq!(err.consumed, 12);
    }

    #[test]
    fn decoded_bitmaps_keep_their_own_state() {
        let schema = schema(vec![
            d(FieldKind::Var, "mti,length:4"),
            d(FieldKind::Bitmap, "bitmap,length:64"),
            d(FieldKind::Var, "2,length:3"),
        ]);
        let data = frame(&[b"1000", &[0x40, 0, 0, 0, 0, 0, 0, 0], b"asd"]);

        let (message, _) = unmarshal(&schema, &data, &EncodingRegistry::new()).unwrap();

        // The stored bitmap is exactly the decoded 64 bits: growing the
        // expected set during the walk must not have mutated it.
        let stored = message.bitmap(&FieldName::Bitmap).unwrap();
        assert_eq!(stored, &bitmap::from_bytes(&[0x40, 0, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn missing_descriptors_for_mti_and_bitmap() {
        let no_mti = schema(vec![d(FieldKind::Bitmap, "bitmap,length:64")]);
        let err = unmarshal(&no_mti, b"1000", &EncodingRegistry::new()).unwrap_err();
        assert_eq!(err.source, CodecError::MtiMissing);

        let no_bitmap = schema(vec![d(FieldKind::Var, "mti,length:4")]);
        let err = unmarshal(&no_bitmap, b"1000", &EncodingRegistry::new()).unwrap_err();
        assert_eq!(err.source, CodecError::PrimaryBitmapMissing);
        assert_eq!(err.consumed, 4);
    }

    #[test]
    fn explicit_false_bits_decode_without_values() {
        let schema = schema(vec![
            d(FieldKind::Var, "mti,length:4"),
            d(FieldKind::Bitmap, "bitmap,length:64"),
            d(FieldKind::Var, "2,length:3"),
            d(FieldKind::Var, "3,length:3"),
        ]);
        let mut section = Bitmap::new();
        section.insert(2, true);
        let bytes = bitmap::to_bytes(&{
            let mut padded = section.clone();
            padded.insert(64, false);
            padded
        });
        let data = frame(&[b"1000", &bytes, b"asd"]);

        let (message, _) = unmarshal(&schema, &data, &EncodingRegistry::new()).unwrap();
        assert_eq!(message.field_text(2), Some("asd"));
        assert_eq!(message.field_text(3), None);
    }
}
