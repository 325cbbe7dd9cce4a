//! # Shared Crypto - Signing & Hashing Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Content hashing of canonical bytes |
//! | `signatures` | Ed25519 | Rumor origin proofs, majority signatures |
//!
//! ## Security Properties
//!
//! - **Ed25519**: deterministic nonces, no RNG dependency at signing time
//! - **Sign-the-digest**: signatures are made over the 32-byte SHA-256 of a
//!   value's canonical encoding, so a peer can counter-sign a content hash
//!   it has not yet fetched the bytes for
//! - **Key hygiene**: signing-key material is zeroized on drop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

pub use errors::CryptoError;
pub use hashing::{sha256, Sha256Hasher};
pub use signatures::{verify_proof, verify_signed, Keypair};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
