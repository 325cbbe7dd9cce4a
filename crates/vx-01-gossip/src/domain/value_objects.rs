//! Value objects for gossip configuration and status reporting.

use super::errors::GossipError;
use shared_types::PeerId;
use std::collections::HashSet;
use std::time::Duration;

/// Gossip daemon configuration.
#[derive(Clone, Debug)]
pub struct GossipConfig {
    /// Interval between spreader rounds.
    pub interval: Duration,
    /// Number of peers contacted per round (fan-out).
    pub fanout: usize,
    /// Maximum rumor handlers running concurrently.
    pub max_concurrent_handlers: usize,
    /// How long a rumor stays advertised in gossip offers.
    pub active_retention: Duration,
    /// How long a rumor hash is remembered for deduplication.
    pub seen_retention: Duration,
    /// Interval between storage expiry sweeps.
    pub sweep_interval: Duration,
    /// When set, every signer of every rumor must be in this set.
    pub whitelist: Option<HashSet<PeerId>>,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            fanout: 2,
            max_concurrent_handlers: 20,
            active_retention: Duration::from_secs(2),
            seen_retention: Duration::from_secs(120),
            sweep_interval: Duration::from_millis(500),
            whitelist: None,
        }
    }
}

impl GossipConfig {
    /// Validate configuration bounds.
    pub fn validate(&self) -> Result<(), GossipError> {
        if self.fanout == 0 {
            return Err(GossipError::Config("fanout must be nonzero".into()));
        }
        if self.max_concurrent_handlers == 0 {
            return Err(GossipError::Config(
                "max_concurrent_handlers must be nonzero".into(),
            ));
        }
        if self.interval.is_zero() {
            return Err(GossipError::Config("interval must be nonzero".into()));
        }
        if self.active_retention >= self.seen_retention {
            return Err(GossipError::Config(
                "active_retention must be shorter than seen_retention".into(),
            ));
        }
        Ok(())
    }
}

/// Point-in-time status snapshot of the gossip daemon.
#[derive(Clone, Debug, Default)]
pub struct GossipStatus {
    /// Rumors currently advertised in offers.
    pub active_rumors: usize,
    /// Rumor hashes remembered for deduplication.
    pub seen_rumors: usize,
    /// Rumors dispatched to handlers since startup.
    pub rumors_dispatched: u64,
    /// Spreader rounds that completed since startup.
    pub rounds_completed: u64,
    /// Spreader rounds that failed since startup.
    pub rounds_failed: u64,
}
