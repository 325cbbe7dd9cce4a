//! # SHA-256 Hashing
//!
//! Thin wrappers so subsystems never touch the digest crate directly.

use shared_types::Hash;
use sha2::{Digest, Sha256};

/// One-shot SHA-256 of a byte slice.
pub fn sha256(bytes: &[u8]) -> Hash {
    Sha256::digest(bytes).into()
}

/// Incremental SHA-256 hasher.
#[derive(Default)]
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    /// Create a fresh hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the hasher.
    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Consume the hasher and return the digest.
    pub fn finalize(self) -> Hash {
        self.inner.finalize().into()
    }
}
