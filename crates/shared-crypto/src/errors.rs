//! Crypto error types.

use thiserror::Error;

/// Failures from signing and verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The embedded verifying-key bytes do not decode to a curve point.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// The peer id's trailing digest does not match its embedded key.
    #[error("malformed peer id")]
    MalformedPeerId,

    /// The signature did not verify over the given digest.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// The value could not be canonically encoded for hashing.
    #[error("canonical encoding failed: {0}")]
    Encoding(String),

    /// A signed value carried no proofs at all.
    #[error("empty proof list")]
    EmptyProofs,
}
