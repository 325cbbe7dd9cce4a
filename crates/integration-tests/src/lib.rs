//! # Integration Tests Crate
//!
//! Cross-subsystem tests wiring real gossip daemons and consensus managers
//! over in-memory transports.
//!
//! ## Structure
//!
//! ```text
//! integration-tests/
//! ├── src/
//! │   ├── lib.rs               # This file
//! │   ├── harness.rs           # In-memory networks and node assembly
//! │   ├── gossip_convergence.rs # Two-node anti-entropy scenarios
//! │   ├── epoch_consensus.rs   # Multi-node epoch rounds and observer join
//! │   └── liveness_rounds.rs   # Health-check rounds over a direct wire
//! ```
//!
//! ## Scenarios
//!
//! 1. **Gossip convergence**: rumors added on one node reach the other
//!    within a few spreader intervals, dispatched exactly once each.
//! 2. **Three-node epoch**: facilitators drive one epoch from buffered
//!    events to a fully signed, consumed artifact on every node.
//! 3. **Observer join**: a fourth node observes the round without ever
//!    declaring, adopts the signed artifact, and is promoted to Ready.

#![allow(dead_code)]

pub mod harness;

mod epoch_consensus;
mod gossip_convergence;
mod liveness_rounds;
