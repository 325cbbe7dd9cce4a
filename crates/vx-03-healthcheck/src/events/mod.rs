//! Message types for the health-check subsystem.

pub mod p2p;

pub use p2p::PeerDeclarationRequest;
