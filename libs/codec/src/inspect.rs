//! Schema-less message inspection.
//!
//! Routing layers often need the MTI and the presence set before any
//! schema is chosen — the MTI picks the handler, and the handler picks
//! the layout. [`inspect`] reads just the self-describing prefix of a
//! message: the four-byte MTI and the bitmap chain.

use crate::bitmap::{self, Bitmap};
use crate::error::{CodecError, CodecResult};
use crate::mti::Mti;

const MTI_LEN: usize = 4;
const SECTION_BYTES: usize = 8;

/// The self-describing prefix of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePreview {
    pub mti: Mti,
    /// Merged presence set across every section read.
    pub presence: Bitmap,
    /// How many bitmap sections the chain carried.
    pub sections: u32,
    /// Bytes consumed by the MTI and the bitmap chain.
    pub consumed: usize,
}

impl MessagePreview {
    /// Whether the element at `position` is announced present.
    pub fn contains(&self, position: u32) -> bool {
        self.presence.get(&position).copied().unwrap_or(false)
    }
}

/// Reads the MTI and the full bitmap chain off the front of a message.
///
/// The MTI is taken as four ASCII digits; each 8-byte section follows,
/// for as long as continuation flags keep announcing a successor. Field
/// values are not touched — decoding them needs a schema.
pub fn inspect(data: &[u8]) -> CodecResult<MessagePreview> {
    if data.len() < MTI_LEN {
        return Err(CodecError::MessageTooShort {
            need: MTI_LEN,
            remaining: data.len(),
        });
    }

    let mti_text = match std::str::from_utf8(&data[..MTI_LEN]) {
        Ok(text) => text,
        Err(_) => {
            return Err(CodecError::MtiMalformed(
                String::from_utf8_lossy(&data[..MTI_LEN]).into_owned(),
            ))
        }
    };
    let mti = Mti::new(mti_text)?;

    let mut presence = Bitmap::new();
    let mut consumed = MTI_LEN;
    let mut section = 1u32;

    loop {
        let remaining = &data[consumed..];
        if remaining.len() < SECTION_BYTES {
            return Err(CodecError::MessageTooShort {
                need: SECTION_BYTES,
                remaining: remaining.len(),
            });
        }

        let (elements, continuation) =
            bitmap::iso_from_bytes(&remaining[..SECTION_BYTES], section)?;
        presence.extend(elements);
        consumed += SECTION_BYTES;

        if !continuation {
            break;
        }
        section += 1;
    }

    Ok(MessagePreview {
        mti,
        presence,
        sections: section,
        consumed,
    })
}
