//! # Shared Types Crate
//!
//! Cross-subsystem domain types for the Vertex coordination layer: peer
//! identities, content hashes, the `Signed<T>` proof envelope, and the rumor
//! model carried by the gossip subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a subsystem
//!   boundary is defined here.
//! - **Canonical Encoding**: hashing and signing operate on one fixed binary
//!   encoding ([`codec::canonical_bytes`]); a value whose re-serialization
//!   hashes differently than advertised is invalid, full stop.
//! - **Self-Describing Identity**: a [`PeerId`] embeds the peer's verifying
//!   key, so origin proofs are checkable without a key registry.

pub mod codec;
pub mod entities;
pub mod errors;
pub mod rumor;
pub mod signed;

pub use codec::{canonical_bytes, content_hash};
pub use entities::{Hash, PeerId, Signature};
pub use errors::CodecError;
pub use rumor::{Rumor, RumorBatch, SignedRumor};
pub use signed::{Signed, SignatureProof};
