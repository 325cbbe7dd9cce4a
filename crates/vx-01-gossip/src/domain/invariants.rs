//! Storage invariant auditing.
//!
//! Cheap structural checks over a [`RumorStorage`](super::RumorStorage)
//! snapshot. Used by tests and debug sweeps; violations indicate a bug, not
//! bad network input.

use super::storage::RumorStorage;
use shared_types::Hash;
use std::collections::HashSet;

/// A violated storage invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A hash is active but not seen.
    ActiveNotSeen(Hash),
    /// A tracked hash has no backing content.
    MissingContent(Hash),
    /// Content exists for a hash no tier references.
    OrphanContent(Hash),
}

/// Audit all storage invariants; empty result means healthy.
pub fn check_all_invariants(storage: &RumorStorage) -> Vec<InvariantViolation> {
    let audit = storage.audit();
    let active: HashSet<Hash> = audit.active.iter().copied().collect();
    let seen: HashSet<Hash> = audit.seen.iter().copied().collect();
    let content: HashSet<Hash> = audit.content.iter().copied().collect();

    let mut violations = Vec::new();
    for hash in &active {
        if !seen.contains(hash) {
            violations.push(InvariantViolation::ActiveNotSeen(*hash));
        }
    }
    for hash in active.union(&seen) {
        if !content.contains(hash) {
            violations.push(InvariantViolation::MissingContent(*hash));
        }
    }
    for hash in &content {
        if !active.contains(hash) && !seen.contains(hash) {
            violations.push(InvariantViolation::OrphanContent(*hash));
        }
    }
    violations
}
