//! Character encodings and the registry the codec resolves them through.
//!
//! Field descriptors carry encoding *names*; the registry maps names to
//! byte transforms at use time. This keeps the name space extensible
//! without global mutable state: build a registry at startup, register any
//! custom transforms, then hand it to the codec entry points and treat it
//! as immutable.

pub mod bcd;
pub mod ebcdic;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CodecError, CodecResult};

/// A named byte transform, one direction.
pub type Transform = Arc<dyn Fn(&[u8]) -> CodecResult<Vec<u8>> + Send + Sync>;

/// Registry of named encode/decode transforms.
///
/// The default registry knows `ascii` (identity) and `ebcdic` (code page
/// 1047). The empty name is always the identity and needs no entry.
#[derive(Clone)]
pub struct EncodingRegistry {
    encoders: HashMap<String, Transform>,
    decoders: HashMap<String, Transform>,
}

impl EncodingRegistry {
    /// Registry with the built-in encodings.
    pub fn new() -> Self {
        let mut registry = Self {
            encoders: HashMap::new(),
            decoders: HashMap::new(),
        };

        registry.register(
            "ascii",
            Arc::new(|bytes| Ok(bytes.to_vec())),
            Arc::new(|bytes| Ok(bytes.to_vec())),
        );
        registry.register(
            "ebcdic",
            Arc::new(|bytes| Ok(ebcdic::encode(&String::from_utf8_lossy(bytes)))),
            Arc::new(|bytes| Ok(ebcdic::decode(bytes).into_bytes())),
        );

        registry
    }

    /// Adds or replaces a named encoding pair.
    pub fn register(&mut self, name: &str, encoder: Transform, decoder: Transform) {
        self.encoders.insert(name.to_string(), encoder);
        self.decoders.insert(name.to_string(), decoder);
    }

    /// Applies the named encoder. The empty name is the identity.
    pub fn encode(&self, name: &str, bytes: &[u8]) -> CodecResult<Vec<u8>> {
        Self::apply(&self.encoders, name, bytes)
    }

    /// Applies the named decoder. The empty name is the identity.
    pub fn decode(&self, name: &str, bytes: &[u8]) -> CodecResult<Vec<u8>> {
        Self::apply(&self.decoders, name, bytes)
    }

    fn apply(
        transforms: &HashMap<String, Transform>,
        name: &str,
        bytes: &[u8],
    ) -> CodecResult<Vec<u8>> {
        if name.is_empty() {
            return Ok(bytes.to_vec());
        }

        let transform = transforms
            .get(name)
            .ok_or_else(|| CodecError::UnknownEncoding(name.to_string()))?;

        transform(bytes).map_err(|e| match e {
            known @ CodecError::UnknownEncoding(_) => known,
            other => CodecError::EncodingFailed {
                name: name.to_string(),
                reason: other.to_string(),
            },
        })
    }
}

impl Default for EncodingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EncodingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.encoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("EncodingRegistry")
            .field("encodings", &names)
            .finish()
    }
}

/// The encoding half of a field descriptor: one name for the length
/// prefix and one for the value body, written `prefix/value`. A spec
/// without the separator uses the same name for both halves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodingSpec {
    prefix: String,
    value: String,
}

impl EncodingSpec {
    /// Parses `"ebcdic"` or `"ebcdic/ascii"` style specs.
    pub fn parse(spec: &str) -> Self {
        match spec.split_once('/') {
            Some((prefix, value)) => Self {
                prefix: prefix.to_string(),
                value: value.to_string(),
            },
            None => Self {
                prefix: spec.to_string(),
                value: spec.to_string(),
            },
        }
    }

    /// Encoding name applied to length prefixes.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Encoding name applied to value bodies.
    pub fn value(&self) -> &str {
        &self.value
    }
}
