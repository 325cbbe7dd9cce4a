//! Event and message types for the gossip subsystem.

pub mod p2p;

pub use p2p::{
    EndGossipRoundRequest, EndGossipRoundResponse, StartGossipRoundRequest,
    StartGossipRoundResponse,
};
