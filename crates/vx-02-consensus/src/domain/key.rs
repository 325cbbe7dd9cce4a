//! Capability traits the consensus engine is generic over.
//!
//! The engine never inspects artifacts or events; it only needs keys that
//! advance, artifacts that serialize (for hashing and dissemination), and
//! events that serialize (for buffering and replay).

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::hash::Hash as StdHash;

/// A monotonic epoch identifier with a total order and a successor.
pub trait EpochKey:
    Clone + Ord + StdHash + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// The next epoch key.
    fn next(&self) -> Self;
}

impl EpochKey for u64 {
    fn next(&self) -> Self {
        self.saturating_add(1)
    }
}

/// The opaque value facilitators agree upon (a block, a snapshot).
pub trait Artifact:
    Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
}

impl<T: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static> Artifact for T {}

/// An application event ingested into proposal artifacts.
pub trait ConsensusEvent:
    Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
}

impl<T: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static> ConsensusEvent for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u64_successor() {
        assert_eq!(5u64.next(), 6);
        assert_eq!(u64::MAX.next(), u64::MAX);
    }
}
