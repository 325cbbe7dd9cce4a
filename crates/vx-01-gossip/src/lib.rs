//! # VX-01 Gossip - Epidemic Rumor Dissemination Subsystem
//!
//! **Subsystem ID:** 1
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Propagates signed rumors across a dynamic peer set using a pull-then-push
//! anti-entropy protocol, and routes validated inbound rumors to the other
//! subsystems of the node.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Advertised hash matches canonical content hash | `domain/validator.rs` |
//! | INVARIANT-2 | A peer rumor carries its origin's own proof | `domain/validator.rs` |
//! | INVARIANT-3 | Every active rumor is also a seen rumor | `domain/storage.rs`, audited in `domain/invariants.rs` |
//! | INVARIANT-4 | A hash leaves `active` strictly before it leaves `seen` | `domain/storage.rs` sweep ordering |
//! | INVARIANT-5 | Handler dispatch preserves canonical order within a batch | `service.rs` consumer |
//!
//! ## Protocol
//!
//! ```text
//! spreader ──StartGossipRound{offer}──────────→ peer
//!          ←─{offer, inquiry}───────────────────
//!          ──EndGossipRound{answer, inquiry}───→
//!          ←─{answer}────────────────────────────
//! ```
//!
//! Every `interval` the spreader advertises the active set to `fanout`
//! uniformly chosen peers. Failures abort only the affected peer's round;
//! the next interval retries naturally.
//!
//! ## Outbound Dependencies
//!
//! | Concern | Trait | Purpose |
//! |---------|-------|---------|
//! | Transport | `GossipTransport` | Round RPCs (HTTP binding lives outside this crate) |
//! | Cluster | `PeerProvider` | Current peer set for fanout selection |
//! | Routing | `RumorRouter` | Dispatch validated rumors to subsystems |

pub mod domain;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export main types
pub use domain::{
    GossipConfig, GossipError, GossipResult, GossipStatus, RumorStorage, RumorValidator,
    ValidationFault, ValidationReport,
};
pub use ports::{GossipApi, GossipTransport, PeerProvider, RumorRouter};
pub use service::GossipService;
