//! Error types for the consensus subsystem.

use shared_crypto::CryptoError;
use shared_types::{CodecError, PeerId};
use thiserror::Error;

/// Consensus error types.
#[derive(Debug, Clone, Error)]
pub enum ConsensusError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("consensus not started: no last key and artifact recorded")]
    NotStarted,

    #[error("manager already started")]
    AlreadyStarted,

    #[error("proposal creation failed: {0}")]
    CreateProposal(String),

    #[error("signed artifact consumption failed: {0}")]
    Consume(String),

    #[error("rumor publication failed: {0}")]
    Publish(String),

    #[error("registration exchange with {peer} failed: {reason}")]
    Registration { peer: PeerId, reason: String },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Result type for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
