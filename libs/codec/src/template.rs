//! Ready-made message schemas for common network profiles.
//!
//! Schemas are plain data, so a profile is nothing more than a
//! constructor returning the descriptor list a network publishes.

use crate::descriptor::{FieldDescriptor, MessageSchema};
use crate::field::FieldKind;

/// The MasterCard ISO-8583:1987 communication profile.
pub fn mastercard_1987() -> MessageSchema {
    use FieldKind::{Binary, Bitmap, LlVar, LllBinary, LllVar, Mti, Var};

    let d = |kind, text| {
        FieldDescriptor::parse(kind, text).expect("mastercard descriptor table is well formed")
    };

    MessageSchema::new(vec![
        d(Mti, "mti,length:4,encoding:ebcdic"),
        d(Bitmap, "bitmap"),
        d(Bitmap, "1,omitempty"),
        d(LlVar, "2,length:2,encoding:ebcdic,omitempty"),
        d(Var, "3,length:6,encoding:ebcdic,omitempty"),
        d(Var, "4,length:12,encoding:ebcdic,omitempty"),
        d(Var, "5,length:12,encoding:ebcdic,omitempty"),
        d(Var, "6,length:12,encoding:ebcdic,omitempty"),
        d(Var, "7,length:10,encoding:ebcdic,omitempty"),
        d(Var, "8,length:8,encoding:ebcdic,omitempty"),
        d(Var, "9,length:8,encoding:ebcdic,omitempty"),
        d(Var, "10,length:8,encoding:ebcdic,omitempty"),
        d(Var, "11,length:6,encoding:ebcdic,omitempty"),
        d(Var, "12,length:6,encoding:ebcdic,omitempty"),
        d(Var, "13,length:4,encoding:ebcdic,omitempty"),
        d(Var, "14,length:4,encoding:ebcdic,omitempty"),
        d(Var, "15,length:4,encoding:ebcdic,omitempty"),
        d(Var, "16,length:4,encoding:ebcdic,omitempty"),
        d(Var, "17,length:4,encoding:ebcdic,omitempty"),
        d(Var, "18,length:4,encoding:ebcdic,omitempty"),
        d(Var, "19,length:3,encoding:ebcdic,omitempty"),
        d(Var, "20,length:3,encoding:ebcdic,omitempty"),
        d(Var, "21,length:3,encoding:ebcdic,omitempty"),
        d(Var, "22,length:3,encoding:ebcdic,omitempty"),
        d(Var, "23,length:3,encoding:ebcdic,omitempty"),
        d(Var, "24,length:3,encoding:ebcdic,omitempty"),
        d(Var, "25,length:2,encoding:ebcdic,omitempty"),
        d(Var, "26,length:2,encoding:ebcdic,omitempty"),
        d(Var, "27,length:1,encoding:ebcdic,omitempty"),
        d(Var, "28,length:9,encoding:ebcdic,omitempty"),
        d(Var, "29,length:9,encoding:ebcdic,omitempty"),
        d(Var, "30,length:9,encoding:ebcdic,omitempty"),
        d(Var, "31,length:9,encoding:ebcdic,omitempty"),
        d(LlVar, "32,length:2,encoding:ebcdic,omitempty"),
        d(LlVar, "33,length:2,encoding:ebcdic,omitempty"),
        d(LlVar, "34,length:2,encoding:ebcdic,omitempty"),
        d(LlVar, "35,length:2,encoding:ebcdic,omitempty"),
        d(LllVar, "36,length:3,encoding:ebcdic,omitempty"),
        d(Var, "37,length:12,encoding:ebcdic,omitempty"),
        d(Var, "38,length:6,encoding:ebcdic,omitempty"),
        d(Var, "39,length:2,encoding:ebcdic,omitempty"),
        d(Var, "40,length:3,encoding:ebcdic,omitempty"),
        d(Var, "41,length:8,encoding:ebcdic,omitempty"),
        d(Var, "42,length:15,encoding:ebcdic,omitempty"),
        d(Var, "43,length:40,encoding:ebcdic,omitempty"),
        d(LlVar, "44,length:2,encoding:ebcdic,omitempty"),
        d(LlVar, "45,length:2,encoding:ebcdic,omitempty"),
        d(LllVar, "46,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "47,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "48,length:3,encoding:ebcdic,omitempty"),
        d(Var, "49,length:3,encoding:ebcdic,omitempty"),
        d(Var, "50,length:3,encoding:ebcdic,omitempty"),
        d(Var, "51,length:3,encoding:ebcdic,omitempty"),
        d(Binary, "52,length:8,omitempty"),
        d(Var, "53,length:16,encoding:ebcdic,omitempty"),
        d(LllVar, "54,length:3,encoding:ebcdic,omitempty"),
        d(LllBinary, "55,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "56,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "57,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "58,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "59,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "60,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "61,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "62,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "63,length:3,encoding:ebcdic,omitempty"),
        d(Var, "70,length:3,encoding:ebcdic,omitempty"),
        d(Var, "90,length:42,encoding:ebcdic,omitempty"),
        d(Var, "94,length:7,encoding:ebcdic,omitempty"),
        d(Var, "95,length:42,encoding:ebcdic,omitempty"),
        d(Var, "96,length:8,encoding:ebcdic,omitempty"),
        d(LlVar, "102,length:2,encoding:ebcdic,omitempty"),
        d(LlVar, "103,length:2,encoding:ebcdic,omitempty"),
        d(LllVar, "104,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "108,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "112,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "120,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "121,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "123,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "124,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "126,length:3,encoding:ebcdic,omitempty"),
        d(LllVar, "127,length:3,encoding:ebcdic,omitempty"),
    ])
    .expect("mastercard descriptor table has no duplicates")
}
