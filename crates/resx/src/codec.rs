//! Canonical binary encoding for everything the pipeline persists or
//! embeds in URIs: meta sidecars, transformation options, and
//! adapter-private repository state.
//!
//! The encoding is self-delimiting CBOR with ordered map keys, so the
//! same bytes come out for the same value on every node.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::term::Term;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Encode any serde value to canonical bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(out)
}

/// Decode canonical bytes back into a serde value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Convert a typed value into the dynamic [`Term`] representation by
/// funnelling it through the canonical encoding. Producers use this to
/// keep their repository state opaque to everyone else.
pub fn to_term<T: Serialize>(value: &T) -> Result<Term, CodecError> {
    decode(&encode(value)?)
}

/// Recover a typed value out of a [`Term`].
pub fn from_term<T: DeserializeOwned>(term: &Term) -> Result<T, CodecError> {
    decode(&encode(term)?)
}
