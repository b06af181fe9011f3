//! Schema-driven codec for ISO-8583 financial transaction messages.
//!
//! A message's on-wire layout is controlled by two self-describing
//! structures: the four-digit message type indicator and a chain of
//! presence bitmaps, each 64-bit section of which uses its first bit to
//! announce the next section. Everything after that is a walk over a
//! user-supplied schema: an ordered list of [`FieldDescriptor`]s naming
//! each field's position, kind, byte length and character encoding.
//!
//! ```
//! use cardstream_codec::{
//!     marshal, unmarshal, EncodingRegistry, FieldDescriptor, FieldKind, Message, MessageSchema,
//! };
//!
//! let schema = MessageSchema::new(vec![
//!     FieldDescriptor::parse(FieldKind::Mti, "mti,length:4").unwrap(),
//!     FieldDescriptor::parse(FieldKind::Bitmap, "bitmap,length:64").unwrap(),
//!     FieldDescriptor::parse(FieldKind::LlVar, "2,length:2,omitempty").unwrap(),
//!     FieldDescriptor::parse(FieldKind::Var, "3,length:6,omitempty").unwrap(),
//! ])
//! .unwrap();
//!
//! let registry = EncodingRegistry::new();
//! let mut message = Message::new();
//! message.set_mti("0100");
//! message.set_field_text(2, "4000001234567899");
//! message.set_field_text(3, "000000");
//!
//! let wire = marshal(&schema, &message, &registry).unwrap();
//! let (decoded, consumed) = unmarshal(&schema, &wire, &registry).unwrap();
//! assert_eq!(consumed, wire.len());
//! assert_eq!(decoded.field_text(2), Some("4000001234567899"));
//! ```
//!
//! Character encodings are resolved by name through an
//! [`EncodingRegistry`]; `ascii` and `ebcdic` (code page 1047) are built
//! in and custom transforms can be registered before the registry is
//! handed to the codec. Bitmap and length-prefix primitives are exposed
//! in [`bitmap`] and [`length`] for callers assembling custom layouts.

pub mod bitmap;
pub mod bits;
pub mod descriptor;
pub mod encoding;
pub mod error;
pub mod field;
pub mod inspect;
pub mod length;
pub mod marshal;
pub mod mti;
pub mod template;
pub mod unmarshal;

pub use bitmap::Bitmap;
pub use descriptor::{FieldDescriptor, FieldName, Message, MessageSchema};
pub use encoding::{EncodingRegistry, EncodingSpec};
pub use error::{CodecError, CodecResult, UnmarshalError};
pub use field::{FieldKind, FieldValue};
pub use inspect::{inspect, MessagePreview};
pub use marshal::marshal;
pub use mti::Mti;
pub use unmarshal::unmarshal;
