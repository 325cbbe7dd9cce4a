//! # Ed25519 Signatures
//!
//! Keypair and verification helpers bound to the [`PeerId`] identity scheme:
//! a peer's id embeds its verifying key, so verification needs nothing but
//! the proof itself and the digest it claims to cover.

use crate::errors::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::Serialize;
use shared_types::{content_hash, Hash, PeerId, Signed, SignatureProof};
use zeroize::Zeroize;

/// Ed25519 keypair with the node-identity derivation attached.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from a 32-byte secret seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// The peer id derived from this keypair's verifying key.
    pub fn peer_id(&self) -> PeerId {
        PeerId::from_verifying_key_bytes(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a 32-byte content digest.
    pub fn sign_digest(&self, digest: &Hash) -> [u8; 64] {
        self.signing_key.sign(digest).to_bytes()
    }

    /// Produce a `(signer, signature)` proof over a value's content hash.
    pub fn prove<T: Serialize>(&self, value: &T) -> Result<SignatureProof, CryptoError> {
        let digest = content_hash(value).map_err(|e| CryptoError::Encoding(e.to_string()))?;
        Ok(SignatureProof {
            signer: self.peer_id(),
            signature: self.sign_digest(&digest),
        })
    }

    /// Wrap a value in a [`Signed`] envelope carrying this keypair's proof.
    pub fn sign_value<T: Serialize>(&self, value: T) -> Result<Signed<T>, CryptoError> {
        let proof = self.prove(&value)?;
        Ok(Signed::new(value, vec![proof]))
    }

    /// The secret seed (for keystore serialization).
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Drop for Keypair {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

/// Verify one proof over a 32-byte content digest.
///
/// Checks the signer id is well formed, decodes the embedded verifying key,
/// and verifies the signature.
pub fn verify_proof(digest: &Hash, proof: &SignatureProof) -> Result<(), CryptoError> {
    if !proof.signer.is_well_formed() {
        return Err(CryptoError::MalformedPeerId);
    }
    let verifying_key = VerifyingKey::from_bytes(&proof.signer.verifying_key_bytes())
        .map_err(|_| CryptoError::InvalidPublicKey)?;
    let signature = ed25519_dalek::Signature::from_bytes(&proof.signature);
    verifying_key
        .verify(digest, &signature)
        .map_err(|_| CryptoError::SignatureVerificationFailed)
}

/// Verify every proof of a [`Signed`] value against its content hash.
///
/// Fails on the first bad proof; callers that need per-proof fault
/// accumulation (the gossip envelope validator) use [`verify_proof`]
/// directly.
pub fn verify_signed<T: Serialize>(signed: &Signed<T>) -> Result<(), CryptoError> {
    if signed.proofs.is_empty() {
        return Err(CryptoError::EmptyProofs);
    }
    let digest = content_hash(&signed.value).map_err(|e| CryptoError::Encoding(e.to_string()))?;
    for proof in &signed.proofs {
        verify_proof(&digest, proof)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let keypair = Keypair::generate();
        let signed = keypair.sign_value(vec![1u8, 2, 3]).unwrap();
        assert!(verify_signed(&signed).is_ok());
    }

    #[test]
    fn test_tampered_value_fails() {
        let keypair = Keypair::generate();
        let mut signed = keypair.sign_value(vec![1u8, 2, 3]).unwrap();
        signed.value[0] = 9;
        assert_eq!(
            verify_signed(&signed),
            Err(CryptoError::SignatureVerificationFailed)
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair1 = Keypair::generate();
        let keypair2 = Keypair::generate();

        let digest = sha_of(b"message");
        let mut proof = keypair1.prove(&42u64).unwrap();
        proof.signer = keypair2.peer_id();
        assert!(verify_proof(&digest, &proof).is_err());
    }

    #[test]
    fn test_empty_proofs_rejected() {
        let signed: Signed<u64> = Signed::new(7, vec![]);
        assert_eq!(verify_signed(&signed), Err(CryptoError::EmptyProofs));
    }

    #[test]
    fn test_malformed_signer_rejected() {
        let keypair = Keypair::generate();
        let mut proof = keypair.prove(&42u64).unwrap();
        proof.signer.0[50] ^= 0x01;
        let digest = content_hash(&42u64).unwrap();
        assert_eq!(
            verify_proof(&digest, &proof),
            Err(CryptoError::MalformedPeerId)
        );
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = Keypair::from_seed([0xAB; 32]);
        let digest = sha_of(b"deterministic");
        assert_eq!(keypair.sign_digest(&digest), keypair.sign_digest(&digest));
    }

    #[test]
    fn test_roundtrip_seed() {
        let original = Keypair::generate();
        let restored = Keypair::from_seed(original.to_seed());
        assert_eq!(original.peer_id(), restored.peer_id());
    }

    fn sha_of(bytes: &[u8]) -> Hash {
        crate::hashing::sha256(bytes)
    }
}
