//! Field descriptors, schemas and messages.
//!
//! A schema is an ordered list of descriptors, each naming a field and
//! declaring its kind, byte length, encoding and flags. Schemas are plain
//! values: templates for a given network profile are just constructors
//! returning one. A message is the companion value map, keyed by the same
//! names.
//!
//! Descriptors can be built programmatically or parsed from the compact
//! text grammar `name[,length:N][,encoding:E][,omitempty][,-]`.

use std::collections::BTreeMap;
use std::fmt;

use crate::bitmap::Bitmap;
use crate::encoding::EncodingSpec;
use crate::error::{CodecError, CodecResult};
use crate::field::{FieldKind, FieldValue};

const BITMAP_DEFAULT_BITS: usize = 64;

/// A field's position in the message: the MTI, the primary bitmap, or a
/// numeric element index. The derived order is the canonical message
/// order: MTI first, then the primary bitmap, then indices ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldName {
    Mti,
    Bitmap,
    Index(u32),
}

impl FieldName {
    /// Parses a descriptor name: `mti`, `bitmap`, or a positive integer.
    pub fn parse(name: &str) -> CodecResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mti" => Ok(Self::Mti),
            "bitmap" => Ok(Self::Bitmap),
            other => match other.parse::<u32>() {
                Ok(0) => Err(CodecError::FieldZeroProhibited),
                Ok(n) => Ok(Self::Index(n)),
                Err(_) => Err(CodecError::InvalidFieldName(name.to_string())),
            },
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mti => f.write_str("mti"),
            Self::Bitmap => f.write_str("bitmap"),
            Self::Index(n) => write!(f, "{n}"),
        }
    }
}

/// Per-field metadata: where the field sits, how it is laid out on the
/// wire, and the flags controlling its participation in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: FieldName,
    pub kind: FieldKind,
    /// Byte length for fixed kinds, prefix width for length-prefixed
    /// kinds, representative bit count for bitmaps (0 means the 64-bit
    /// default).
    pub length: usize,
    pub encoding: EncodingSpec,
    /// Skip the field when its value is the zero value.
    pub omit_empty: bool,
    /// Never marshal or unmarshal this field.
    pub excluded: bool,
}

impl FieldDescriptor {
    pub fn new(name: FieldName, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            length: 0,
            encoding: EncodingSpec::default(),
            omit_empty: false,
            excluded: false,
        }
    }

    /// Parses the descriptor grammar. The kind is not part of the text
    /// form; it comes from the schema definition.
    ///
    /// ```
    /// use cardstream_codec::{FieldDescriptor, FieldKind, FieldName};
    ///
    /// let d = FieldDescriptor::parse(FieldKind::LlVar, "2,length:2,encoding:ebcdic/ascii,omitempty").unwrap();
    /// assert_eq!(d.name, FieldName::Index(2));
    /// assert_eq!(d.length, 2);
    /// assert!(d.omit_empty);
    /// ```
    pub fn parse(kind: FieldKind, descriptor: &str) -> CodecResult<Self> {
        let mut name: Option<FieldName> = None;
        let mut length = 0usize;
        let mut encoding = EncodingSpec::default();
        let mut omit_empty = false;
        let mut excluded = false;
        let mut bad_length: Option<String> = None;

        for block in descriptor.split(',') {
            if block == "-" {
                excluded = true;
                continue;
            }

            if block == "omitempty" {
                omit_empty = true;
                continue;
            }

            if let Some(text) = block.strip_prefix("length:") {
                match text.parse::<usize>() {
                    Ok(n) => length = n,
                    Err(_) => bad_length = Some(text.to_string()),
                }
                continue;
            }

            if let Some(text) = block.strip_prefix("encoding:") {
                encoding = EncodingSpec::parse(text);
                continue;
            }

            name = Some(FieldName::parse(block)?);
        }

        let name = name.ok_or_else(|| CodecError::InvalidFieldName(String::new()))?;

        if let Some(text) = bad_length {
            return Err(CodecError::InvalidLength {
                name: name.to_string(),
                text,
            });
        }

        Ok(Self {
            name,
            kind,
            length,
            encoding,
            omit_empty,
            excluded,
        })
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn with_encoding(mut self, spec: &str) -> Self {
        self.encoding = EncodingSpec::parse(spec);
        self
    }

    pub fn omit_empty(mut self) -> Self {
        self.omit_empty = true;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    /// The declared length, with the 64-bit default applied to bitmaps.
    pub fn effective_length(&self) -> usize {
        if self.kind.is_bitmap() && self.length == 0 {
            BITMAP_DEFAULT_BITS
        } else {
            self.length
        }
    }
}

/// An ordered descriptor list describing one message layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSchema {
    fields: Vec<FieldDescriptor>,
}

impl MessageSchema {
    /// Builds a schema, rejecting repeated names among the non-excluded
    /// descriptors.
    pub fn new(fields: Vec<FieldDescriptor>) -> CodecResult<Self> {
        let mut seen = Vec::with_capacity(fields.len());
        for descriptor in fields.iter().filter(|d| !d.excluded) {
            if seen.contains(&descriptor.name) {
                return Err(CodecError::DuplicateField(descriptor.name.to_string()));
            }
            seen.push(descriptor.name);
        }

        Ok(Self { fields })
    }

    /// Descriptor for `name` among the non-excluded fields.
    pub fn field(&self, name: &FieldName) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|d| !d.excluded && d.name == *name)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

/// A decoded or to-be-encoded message: values keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    values: BTreeMap<FieldName, FieldValue>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: FieldName, value: FieldValue) -> &mut Self {
        self.values.insert(name, value);
        self
    }

    pub fn set_mti(&mut self, mti: impl Into<String>) -> &mut Self {
        self.set(FieldName::Mti, FieldValue::Text(mti.into()))
    }

    pub fn set_field_text(&mut self, index: u32, value: impl Into<String>) -> &mut Self {
        self.set(FieldName::Index(index), FieldValue::Text(value.into()))
    }

    pub fn set_field_bytes(&mut self, index: u32, value: impl Into<Vec<u8>>) -> &mut Self {
        self.set(FieldName::Index(index), FieldValue::Bytes(value.into()))
    }

    pub fn set_bitmap(&mut self, name: FieldName, bitmap: Bitmap) -> &mut Self {
        self.set(name, FieldValue::Bitmap(bitmap))
    }

    pub fn get(&self, name: &FieldName) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn mti(&self) -> Option<&str> {
        self.values.get(&FieldName::Mti).and_then(FieldValue::as_text)
    }

    pub fn field_text(&self, index: u32) -> Option<&str> {
        self.values
            .get(&FieldName::Index(index))
            .and_then(FieldValue::as_text)
    }

    pub fn field_bytes(&self, index: u32) -> Option<&[u8]> {
        self.values
            .get(&FieldName::Index(index))
            .and_then(FieldValue::as_bytes)
    }

    pub fn bitmap(&self, name: &FieldName) -> Option<&Bitmap> {
        self.values.get(name).and_then(FieldValue::as_bitmap)
    }

    /// Iterates values in canonical order: MTI, bitmap, indices ascending.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &FieldValue)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_full_grammar() {
        let d = FieldDescriptor::parse(FieldKind::LlVar, "2,length:64,encoding:ebcdic,omitempty")
            .unwrap();
        assert_eq!(d.name, FieldName::Index(2));
        assert_eq!(d.length, 64);
        assert_eq!(d.encoding.value(), "ebcdic");
        assert!(d.omit_empty);
        assert!(!d.excluded);
    }

    #[test]
    fn parses_special_names() {
        assert_eq!(
            FieldDescriptor::parse(FieldKind::Mti, "mti,length:4").unwrap().name,
            FieldName::Mti
        );
        assert_eq!(
            FieldDescriptor::parse(FieldKind::Bitmap, "bitmap").unwrap().name,
            FieldName::Bitmap
        );
        assert_eq!(
            FieldDescriptor::parse(FieldKind::Var, "MTI").unwrap().name,
            FieldName::Mti
        );
    }

    #[test]
    fn exclusion_marker() {
        let d = FieldDescriptor::parse(FieldKind::Var, "7,-").unwrap();
        assert!(d.excluded);
    }

    #[test]
    fn rejects_empty_and_invalid_names() {
        assert_eq!(
            FieldDescriptor::parse(FieldKind::Var, "length:4"),
            Err(CodecError::InvalidFieldName(String::new()))
        );
        assert_eq!(
            FieldDescriptor::parse(FieldKind::Var, "asd"),
            Err(CodecError::InvalidFieldName("asd".to_string()))
        );
        assert_eq!(
            FieldDescriptor::parse(FieldKind::Var, "0,length:4"),
            Err(CodecError::FieldZeroProhibited)
        );
    }

    #[test]
    fn rejects_non_integer_lengths() {
        assert_eq!(
            FieldDescriptor::parse(FieldKind::Var, "mti,length:a"),
            Err(CodecError::InvalidLength {
                name: "mti".to_string(),
                text: "a".to_string(),
            })
        );
    }

    #[test]
    fn bitmap_length_defaults_to_64_bits() {
        let d = FieldDescriptor::parse(FieldKind::Bitmap, "bitmap").unwrap();
        assert_eq!(d.effective_length(), 64);

        let half = FieldDescriptor::parse(FieldKind::Bitmap, "65,length:32").unwrap();
        assert_eq!(half.effective_length(), 32);
    }

    #[test]
    fn schema_rejects_duplicates() {
        let result = MessageSchema::new(vec![
            FieldDescriptor::parse(FieldKind::Var, "1,length:4").unwrap(),
            FieldDescriptor::parse(FieldKind::Var, "1,length:4").unwrap(),
        ]);
        assert_eq!(result, Err(CodecError::DuplicateField("1".to_string())));
    }

    #[test]
    fn excluded_descriptors_do_not_count_as_duplicates() {
        let schema = MessageSchema::new(vec![
            FieldDescriptor::parse(FieldKind::Var, "1,length:4").unwrap(),
            FieldDescriptor::parse(FieldKind::Var, "1,length:4,-").unwrap(),
        ])
        .unwrap();
        assert!(schema.field(&FieldName::Index(1)).is_some());
    }

    #[test]
    fn canonical_name_order() {
        let mut names = vec![
            FieldName::Index(2),
            FieldName::Bitmap,
            FieldName::Index(1),
            FieldName::Mti,
            FieldName::Index(66),
        ];
        names.sort();
        assert_eq!(
            names,
            vec![
                FieldName::Mti,
                FieldName::Bitmap,
                FieldName::Index(1),
                FieldName::Index(2),
                FieldName::Index(66),
            ]
        );
    }

    #[test]
    fn message_accessors() {
        let mut message = Message::new();
        message.set_mti("0100");
        message.set_field_text(2, "1234");
        message.set_field_bytes(52, vec![0x01]);

        assert_eq!(message.mti(), Some("0100"));
        assert_eq!(message.field_text(2), Some("1234"));
        assert_eq!(message.field_bytes(52), Some(&[0x01][..]));
        assert_eq!(message.field_text(3), None);
    }
}
