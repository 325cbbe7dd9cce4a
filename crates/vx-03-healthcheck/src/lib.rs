//! # VX-03 Health Check - Per-Peer Liveness Consensus
//!
//! **Subsystem ID:** 3
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Runs a lightweight parallel mini-consensus over a single peer's
//! liveness. Each round is keyed by the `(subject peer, round id)` pair,
//! collects one status proposal per participant, and resolves through a
//! pluggable outcome driver once every remaining participant has spoken.
//!
//! ## Scope
//!
//! The outcome-selection policy lives entirely behind the
//! [`HealthOutcomeDriver`] port; this crate ships no default policy, only
//! the collection, pruning, and completion mechanics.

pub mod domain;
pub mod events;
pub mod ports;
pub mod service;

// Re-export main types
pub use domain::{
    HealthCheckError, HealthCheckKey, HealthCheckResult, HealthCheckRound, HealthDecision, RoundId,
};
pub use events::PeerDeclarationRequest;
pub use ports::{HealthCheckApi, HealthCheckTransport, HealthOutcomeDriver};
pub use service::HealthCheckService;
