//! Message marshalling: schema walk to ordered byte stream.

use std::collections::BTreeMap;

use crate::bitmap::{self, Bitmap};
use crate::descriptor::{FieldDescriptor, FieldName, Message, MessageSchema};
use crate::encoding::EncodingRegistry;
use crate::error::{CodecError, CodecResult};
use crate::field::FieldValue;

/// Serialises `message` according to `schema`.
///
/// Data fields are encoded first; bitmap fields are resolved afterwards,
/// last section to first, because each section's continuation bit is the
/// presence bit of the next section's bitmap field, which is only known
/// once that bitmap has itself produced bytes. The emitted stream is
/// always MTI, primary bitmap, then fields in ascending index order.
pub fn marshal(
    schema: &MessageSchema,
    message: &Message,
    registry: &EncodingRegistry,
) -> CodecResult<Vec<u8>> {
    let mut mti: Option<Vec<u8>> = None;
    let mut first_bitmap: Option<Vec<u8>> = None;
    let mut fields: BTreeMap<u32, Vec<u8>> = BTreeMap::new();
    let mut bitmap_fields: Vec<&FieldDescriptor> = Vec::new();

    for descriptor in schema.fields() {
        if descriptor.excluded {
            continue;
        }

        // Bitmap fields resolve after every data field is known.
        if descriptor.kind.is_bitmap() {
            bitmap_fields.push(descriptor);
            continue;
        }

        let Some(value) = message.get(&descriptor.name) else {
            continue;
        };

        if descriptor.omit_empty && value.is_empty() {
            continue;
        }

        let encoded = descriptor.kind.encode(
            &descriptor.name.to_string(),
            value,
            descriptor.effective_length(),
            &descriptor.encoding,
            registry,
        )?;

        match descriptor.name {
            FieldName::Mti => mti = Some(encoded),
            // A non-bitmap-kind descriptor in the bitmap slot carries
            // caller-built bitmap bytes verbatim.
            FieldName::Bitmap => first_bitmap = Some(encoded),
            FieldName::Index(n) => {
                if !encoded.is_empty() {
                    fields.insert(n, encoded);
                }
            }
        }
    }

    resolve_bitmaps(message, &mut bitmap_fields, &mut first_bitmap, &mut fields)?;

    let mti = mti
        .filter(|bytes| !bytes.is_empty())
        .ok_or(CodecError::MtiMissing)?;

    let has_primary = schema
        .fields()
        .iter()
        .any(|d| !d.excluded && d.name == FieldName::Bitmap);
    if !has_primary {
        return Err(CodecError::PrimaryBitmapMissing);
    }

    let first_bitmap = first_bitmap
        .filter(|bytes| !bytes.is_empty())
        .ok_or(CodecError::PrimaryBitmapEmpty)?;

    let mut out = mti;
    out.extend_from_slice(&first_bitmap);
    for bytes in fields.values() {
        out.extend_from_slice(bytes);
    }

    Ok(out)
}

/// Resolves bitmap fields from the set of present data fields.
///
/// Sections are processed in reverse canonical order; each resolved
/// bitmap is inserted into the field map under its own index, so the
/// preceding section sees it as a present field and raises the matching
/// presence bit, which doubles as the chain's continuation flag.
fn resolve_bitmaps(
    message: &Message,
    bitmap_fields: &mut Vec<&FieldDescriptor>,
    first_bitmap: &mut Option<Vec<u8>>,
    fields: &mut BTreeMap<u32, Vec<u8>>,
) -> CodecResult<()> {
    bitmap_fields.sort_by(|a, b| a.name.cmp(&b.name));
    let lengths: Vec<usize> = bitmap_fields.iter().map(|d| d.effective_length()).collect();

    for k in (0..bitmap_fields.len()).rev() {
        let descriptor = bitmap_fields[k];
        let start = 1 + lengths[..k].iter().sum::<usize>() as u32;
        let capacity = lengths[k] as u32;

        let bytes = match message.get(&descriptor.name) {
            // An explicit presence set is emitted as-is: the caller
            // built (or previously decoded) this bitmap.
            Some(FieldValue::Bitmap(set)) => bitmap::to_bytes(set),
            Some(_) => {
                return Err(CodecError::ValueKindMismatch {
                    field: descriptor.name.to_string(),
                })
            }
            None => {
                let mut present = Bitmap::new();
                for &field in fields.keys() {
                    if field >= start && field < start + capacity {
                        present.insert(field - start + 1, true);
                    }
                }
                for bit in 1..=capacity {
                    present.entry(bit).or_insert(false);
                }

                let bytes = bitmap::to_bytes(&present);
                if bytes.iter().all(|b| *b == 0) {
                    Vec::new()
                } else {
                    bytes
                }
            }
        };

        // An empty section is omitted entirely; its predecessor's
        // continuation bit stays off because no field was inserted.
        if bytes.is_empty() {
            continue;
        }

        match descriptor.name {
            FieldName::Bitmap => *first_bitmap = Some(bytes),
            FieldName::Index(n) => {
                fields.insert(n, bytes);
            }
            FieldName::Mti => {}
        }
    }

    Ok(())
}
