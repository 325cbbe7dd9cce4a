//! Ports (API/SPI) for the health-check subsystem.

pub mod inbound;
pub mod outbound;

pub use inbound::HealthCheckApi;
pub use outbound::{HealthCheckTransport, HealthOutcomeDriver};
