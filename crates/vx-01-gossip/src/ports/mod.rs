//! Ports (API/SPI) for the gossip subsystem.

pub mod inbound;
pub mod outbound;

pub use inbound::GossipApi;
pub use outbound::{GossipTransport, PeerProvider, RumorRouter};
