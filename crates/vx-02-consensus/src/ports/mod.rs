//! Ports (API/SPI) for the consensus subsystem.

pub mod inbound;
pub mod outbound;

pub use inbound::RegistrationApi;
pub use outbound::{ClusterView, ConsensusFunctions, GossipPublisher, RegistrationTransport};
