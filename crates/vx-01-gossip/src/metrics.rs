//! # Gossip Metrics
//!
//! Prometheus metrics for the gossip daemon.
//!
//! Enable with the `metrics` feature:
//! ```toml
//! vx-01-gossip = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `vertex_gossip_rumors_validated_total` - Counter of accepted rumors
//! - `vertex_gossip_rumors_rejected_total` - Counter of rejected rumors (by reason)
//! - `vertex_gossip_rounds_total` - Counter of spreader rounds (by outcome)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_counter_vec, register_int_counter, CounterVec, IntCounter};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total rumors that passed validation
    pub static ref RUMORS_VALIDATED: IntCounter = register_int_counter!(
        "vertex_gossip_rumors_validated_total",
        "Total number of rumors that passed validation"
    )
    .expect("Failed to create RUMORS_VALIDATED metric");

    /// Total rumors rejected, labeled by rejection reason
    pub static ref RUMORS_REJECTED: CounterVec = register_counter_vec!(
        "vertex_gossip_rumors_rejected_total",
        "Total number of rumors rejected by validation",
        &["reason"]
    )
    .expect("Failed to create RUMORS_REJECTED metric");

    /// Total spreader rounds, labeled by outcome
    pub static ref ROUNDS: CounterVec = register_counter_vec!(
        "vertex_gossip_rounds_total",
        "Total number of spreader rounds",
        &["outcome"]
    )
    .expect("Failed to create ROUNDS metric");
}

/// Record an accepted rumor
#[cfg(feature = "metrics")]
pub fn record_rumor_validated() {
    RUMORS_VALIDATED.inc();
}

/// Record a rejected rumor with reason
#[cfg(feature = "metrics")]
pub fn record_rumor_rejected(reason: &str) {
    RUMORS_REJECTED.with_label_values(&[reason]).inc();
}

/// Record a spreader round outcome
#[cfg(feature = "metrics")]
pub fn record_round(outcome: &str) {
    ROUNDS.with_label_values(&[outcome]).inc();
}

// No-op implementations when metrics feature is disabled

#[cfg(not(feature = "metrics"))]
pub fn record_rumor_validated() {}

#[cfg(not(feature = "metrics"))]
pub fn record_rumor_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_round(_outcome: &str) {}
