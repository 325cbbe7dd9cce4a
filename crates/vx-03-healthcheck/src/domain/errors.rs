//! Error types for the health-check subsystem.

use shared_types::PeerId;
use thiserror::Error;

/// Health-check error types.
#[derive(Debug, Clone, Error)]
pub enum HealthCheckError {
    #[error("transport error for peer {peer}: {reason}")]
    Transport { peer: PeerId, reason: String },

    #[error("no round matches the declaration")]
    UnknownRound,
}

/// Result type for health-check operations.
pub type HealthCheckResult<T> = Result<T, HealthCheckError>;
