//! Consensus rumor payloads and their content-type tags.
//!
//! Declarations travel as peer rumors (attributed to their origin);
//! artifacts travel as common rumors so any holder can re-serve the bytes.
//! Payloads are canonically encoded into the rumor's opaque payload field.

use crate::domain::{Bound, ConsensusError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use shared_types::{canonical_bytes, CodecError, Hash, Signature, SignatureProof};

/// Tag for upper-bound declarations.
pub const TAG_FACILITY: &str = "consensus.facility";
/// Tag for proposal-hash declarations.
pub const TAG_PROPOSAL: &str = "consensus.proposal";
/// Tag for majority signatures.
pub const TAG_SIGNATURE: &str = "consensus.signature";
/// Tag for artifact content (candidate or fully signed).
pub const TAG_ARTIFACT: &str = "consensus.artifact";
/// Tag for facilitator-slot release on departure.
pub const TAG_DEREGISTRATION: &str = "consensus.deregistration";
/// Tag for application events feeding proposals.
pub const TAG_EVENT: &str = "consensus.event";

/// A facilitator opens a round by declaring its upper bound.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityAnnouncement<K> {
    pub key: K,
    pub upper_bound: Bound,
}

/// A facilitator declares the hash of its proposal artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAnnouncement<K> {
    pub key: K,
    pub proposal: Hash,
}

/// A facilitator counter-signs the selected majority hash.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureAnnouncement<K> {
    pub key: K,
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

/// Artifact bytes for a round. `proofs` is empty for candidates and carries
/// the full facilitator signature set once the majority is signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactAnnouncement<K, A> {
    pub key: K,
    pub artifact: A,
    pub proofs: Vec<SignatureProof>,
}

/// A departing node releases its facilitator slot from `key` onward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeregistrationAnnouncement<K> {
    pub key: K,
}

/// An application event, ordered by the carrying rumor's origin ordinal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAnnouncement<E> {
    pub event: E,
    /// Trigger events start a round on arrival.
    pub is_trigger: bool,
}

/// Canonically encode a rumor payload.
pub fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, ConsensusError> {
    Ok(canonical_bytes(value)?)
}

/// Decode a rumor payload received from the network.
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ConsensusError> {
    bincode::deserialize(bytes)
        .map_err(|e| ConsensusError::Codec(CodecError::Decode(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::PeerId;

    #[test]
    fn test_facility_payload_roundtrip() {
        let mut upper_bound = Bound::new();
        upper_bound.insert(PeerId::from_verifying_key_bytes([1; 32]), 4);
        let announcement = FacilityAnnouncement {
            key: 6u64,
            upper_bound,
        };
        let bytes = encode_payload(&announcement).unwrap();
        let decoded: FacilityAnnouncement<u64> = decode_payload(&bytes).unwrap();
        assert_eq!(decoded, announcement);
    }

    #[test]
    fn test_signature_payload_roundtrip() {
        let announcement = SignatureAnnouncement {
            key: 6u64,
            signature: [7; 64],
        };
        let bytes = encode_payload(&announcement).unwrap();
        let decoded: SignatureAnnouncement<u64> = decode_payload(&bytes).unwrap();
        assert_eq!(decoded, announcement);
    }

    #[test]
    fn test_artifact_payload_roundtrip() {
        let announcement = ArtifactAnnouncement {
            key: 6u64,
            artifact: vec![1u8, 2, 3],
            proofs: vec![],
        };
        let bytes = encode_payload(&announcement).unwrap();
        let decoded: ArtifactAnnouncement<u64, Vec<u8>> = decode_payload(&bytes).unwrap();
        assert_eq!(decoded, announcement);
    }

    #[test]
    fn test_garbage_payload_rejected() {
        let result: Result<FacilityAnnouncement<u64>, _> = decode_payload(&[0xFF, 0x01]);
        assert!(result.is_err());
    }
}
