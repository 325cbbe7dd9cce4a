//! # Canonical Encoding
//!
//! The single binary encoding that hashing and signing operate on. Every
//! subsystem MUST hash and sign the output of [`canonical_bytes`]; ad-hoc
//! serialization of the same value elsewhere is fine for transport, but a
//! rumor whose canonical re-serialization hashes differently than the hash
//! it was advertised under is invalid.

use crate::entities::Hash;
use crate::errors::CodecError;
use serde::Serialize;
use sha2::{Digest as _, Sha256};

/// Serialize a value into its canonical byte form.
///
/// Bincode with its default (fixed-width little-endian) integer encoding is
/// deterministic for a fixed type definition, which is all the canonical
/// property requires.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// SHA-256 digest of a value's canonical byte form.
///
/// This is the content hash rumors are advertised under and the message
/// digest signatures are made over.
pub fn content_hash<T: Serialize>(value: &T) -> Result<Hash, CodecError> {
    let bytes = canonical_bytes(value)?;
    Ok(Sha256::digest(&bytes).into())
}
