//! Adapters binding the consensus subsystem to its neighbors.

pub mod rumor_router;

pub use rumor_router::ConsensusRumorRouter;
