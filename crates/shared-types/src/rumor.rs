//! # Rumor Model
//!
//! The unit of gossip dissemination. A rumor is either attributed to an
//! origin peer (and must carry that origin's signature) or common (no origin
//! constraint). Content is an opaque payload routed by a dotted string tag,
//! e.g. `consensus.facility`; the gossip subsystem never interprets it.

use crate::entities::{Hash, PeerId};
use crate::signed::Signed;
use serde::{Deserialize, Serialize};

/// A gossiped message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rumor {
    /// Attributed to an origin peer; `ordinal` is the origin's monotonic
    /// sequence number and gives per-origin replay ordering.
    Peer {
        origin: PeerId,
        ordinal: u64,
        tag: String,
        payload: Vec<u8>,
    },
    /// Unattributed content, e.g. a consensus artifact that any holder may
    /// re-serve.
    Common { tag: String, payload: Vec<u8> },
}

impl Rumor {
    /// The origin peer, when attributed.
    pub fn origin(&self) -> Option<&PeerId> {
        match self {
            Rumor::Peer { origin, .. } => Some(origin),
            Rumor::Common { .. } => None,
        }
    }

    /// The origin ordinal, when attributed.
    pub fn ordinal(&self) -> Option<u64> {
        match self {
            Rumor::Peer { ordinal, .. } => Some(*ordinal),
            Rumor::Common { .. } => None,
        }
    }

    /// The content-type tag.
    pub fn tag(&self) -> &str {
        match self {
            Rumor::Peer { tag, .. } | Rumor::Common { tag, .. } => tag,
        }
    }

    /// The opaque payload bytes.
    pub fn payload(&self) -> &[u8] {
        match self {
            Rumor::Peer { payload, .. } | Rumor::Common { payload, .. } => payload,
        }
    }
}

/// A rumor plus its signature proofs.
pub type SignedRumor = Signed<Rumor>;

/// An ordered sequence of `(hash, signed rumor)` pairs.
///
/// Ordering is preserved for deterministic handler dispatch; membership is
/// set-like (duplicates are ignored on insertion).
pub type RumorBatch = Vec<(Hash, SignedRumor)>;
