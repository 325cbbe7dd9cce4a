//! Shared error types.

use thiserror::Error;

/// Canonical-encoding failures.
///
/// An encode failure on a value we built ourselves is a logic error and is
/// treated as fatal by callers; a decode failure on network input is a
/// validation failure and is dropped with a warning.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    #[error("canonical encode failed: {0}")]
    Encode(String),

    #[error("canonical decode failed: {0}")]
    Decode(String),
}
