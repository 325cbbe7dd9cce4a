//! Error types for the gossip subsystem.

use shared_types::{CodecError, PeerId};
use thiserror::Error;

/// Gossip error types.
#[derive(Debug, Clone, Error)]
pub enum GossipError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("transport error for peer {peer}: {reason}")]
    Transport { peer: PeerId, reason: String },

    #[error("inbound rumor queue is closed")]
    QueueClosed,

    #[error("daemon already started")]
    AlreadyStarted,

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Result type for gossip operations.
pub type GossipResult<T> = Result<T, GossipError>;
