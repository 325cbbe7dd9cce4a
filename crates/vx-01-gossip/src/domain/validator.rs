//! # Rumor Envelope Validation
//!
//! The single authoritative validation path for inbound rumors. Checks are
//! accumulated, not short-circuited: a report lists every fault so operators
//! see the full picture for a rejected rumor.
//!
//! ## Checks
//!
//! 1. Advertised hash matches the canonical content hash of the value.
//! 2. A peer rumor's origin contributed one of the proofs.
//! 3. Every proof verifies over the content hash under its signer's key.
//! 4. With a whitelist enabled, every signer is whitelisted.

use shared_crypto::{verify_proof, CryptoError};
use shared_types::{content_hash, Hash, PeerId, RumorBatch, SignedRumor};
use std::collections::HashSet;
use thiserror::Error;

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFault {
    #[error("advertised hash does not match content hash")]
    HashMismatch { advertised: Hash, computed: Hash },

    #[error("rumor could not be canonically encoded: {0}")]
    Unencodable(String),

    #[error("no signature proofs present")]
    EmptyProofs,

    #[error("origin {origin} did not sign its own rumor")]
    MissingOriginProof { origin: PeerId },

    #[error("signer {signer} id is malformed")]
    MalformedSigner { signer: PeerId },

    #[error("signature from {signer} does not verify")]
    InvalidSignature { signer: PeerId },

    #[error("signers not on the whitelist: {signers:?}")]
    NotWhitelisted { signers: Vec<PeerId> },
}

/// Accumulated validation outcome for one rumor.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub faults: Vec<ValidationFault>,
}

impl ValidationReport {
    /// True when no fault was recorded.
    pub fn is_valid(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Validates inbound rumors against hash, origin, signature, and whitelist
/// rules.
#[derive(Clone, Default)]
pub struct RumorValidator {
    whitelist: Option<HashSet<PeerId>>,
}

impl RumorValidator {
    /// Create a validator; `whitelist = None` disables the whitelist check.
    pub fn new(whitelist: Option<HashSet<PeerId>>) -> Self {
        Self { whitelist }
    }

    /// Check only the hash binding of an advertised rumor.
    pub fn check_hash(&self, advertised: &Hash, rumor: &SignedRumor) -> Option<ValidationFault> {
        match content_hash(&rumor.value) {
            Ok(computed) if computed == *advertised => None,
            Ok(computed) => Some(ValidationFault::HashMismatch {
                advertised: *advertised,
                computed,
            }),
            Err(e) => Some(ValidationFault::Unencodable(e.to_string())),
        }
    }

    /// Check origin proof, signature validity, and whitelist membership.
    pub fn check_signatures(&self, rumor: &SignedRumor) -> Vec<ValidationFault> {
        let mut faults = Vec::new();

        if rumor.proofs.is_empty() {
            faults.push(ValidationFault::EmptyProofs);
        }

        if let Some(origin) = rumor.value.origin() {
            if !rumor.is_signed_by(origin) {
                faults.push(ValidationFault::MissingOriginProof { origin: *origin });
            }
        }

        match content_hash(&rumor.value) {
            Ok(digest) => {
                for proof in &rumor.proofs {
                    match verify_proof(&digest, proof) {
                        Ok(()) => {}
                        Err(CryptoError::MalformedPeerId) => {
                            faults.push(ValidationFault::MalformedSigner {
                                signer: proof.signer,
                            });
                        }
                        Err(_) => {
                            faults.push(ValidationFault::InvalidSignature {
                                signer: proof.signer,
                            });
                        }
                    }
                }
            }
            Err(e) => faults.push(ValidationFault::Unencodable(e.to_string())),
        }

        if let Some(whitelist) = &self.whitelist {
            let offenders: Vec<PeerId> = rumor
                .signers()
                .filter(|s| !whitelist.contains(*s))
                .copied()
                .collect();
            if !offenders.is_empty() {
                faults.push(ValidationFault::NotWhitelisted { signers: offenders });
            }
        }

        faults
    }

    /// Full validation: hash binding plus signature rules, all faults
    /// accumulated.
    pub fn validate(&self, advertised: &Hash, rumor: &SignedRumor) -> ValidationReport {
        let mut faults = Vec::new();
        if let Some(fault) = self.check_hash(advertised, rumor) {
            faults.push(fault);
        }
        faults.extend(self.check_signatures(rumor));
        ValidationReport { faults }
    }

    /// Validate a batch; returns the accepted subset in input order and the
    /// rejected entries with their reports.
    pub fn validate_batch(
        &self,
        batch: RumorBatch,
    ) -> (RumorBatch, Vec<(Hash, ValidationReport)>) {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for (hash, rumor) in batch {
            let report = self.validate(&hash, &rumor);
            if report.is_valid() {
                accepted.push((hash, rumor));
            } else {
                rejected.push((hash, report));
            }
        }
        (accepted, rejected)
    }
}
