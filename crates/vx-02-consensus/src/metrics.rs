//! # Consensus Metrics
//!
//! Prometheus metrics for monitoring consensus progress.
//!
//! Enable with the `metrics` feature:
//! ```toml
//! vx-02-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `vertex_consensus_round_duration_seconds` - Histogram of locally finished round durations
//! - `vertex_consensus_rounds_finished_total` - Counter of finished rounds (by trigger)
//! - `vertex_consensus_registrations_total` - Counter of recorded peer registrations

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, CounterVec, Histogram,
    IntCounter,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Histogram of round durations from installation to local finish
    pub static ref ROUND_DURATION: Histogram = register_histogram!(
        "vertex_consensus_round_duration_seconds",
        "Duration of locally finished consensus rounds in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to create ROUND_DURATION metric");

    /// Total finished rounds, labeled by starting trigger
    pub static ref ROUNDS_FINISHED: CounterVec = register_counter_vec!(
        "vertex_consensus_rounds_finished_total",
        "Total number of locally finished consensus rounds",
        &["trigger"]
    )
    .expect("Failed to create ROUNDS_FINISHED metric");

    /// Total peer registrations recorded
    pub static ref REGISTRATIONS: IntCounter = register_int_counter!(
        "vertex_consensus_registrations_total",
        "Total number of peer registrations recorded"
    )
    .expect("Failed to create REGISTRATIONS metric");
}

/// Record the duration of a locally finished round
#[cfg(feature = "metrics")]
pub fn record_round_duration(seconds: f64) {
    ROUND_DURATION.observe(seconds);
}

/// Record a finished round with its starting trigger
#[cfg(feature = "metrics")]
pub fn record_round_finished(trigger: &str) {
    ROUNDS_FINISHED.with_label_values(&[trigger]).inc();
}

/// Record a recorded peer registration
#[cfg(feature = "metrics")]
pub fn record_registration() {
    REGISTRATIONS.inc();
}

// No-op implementations when metrics feature is disabled

#[cfg(not(feature = "metrics"))]
pub fn record_round_duration(_seconds: f64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_round_finished(_trigger: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_registration() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop_when_disabled() {
        record_round_duration(0.5);
        record_round_finished("time");
        record_registration();
    }
}
