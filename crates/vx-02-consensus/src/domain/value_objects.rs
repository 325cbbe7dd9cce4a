//! Value objects for consensus configuration and status reporting.

use super::errors::ConsensusError;
use std::time::Duration;

/// Consensus manager configuration.
#[derive(Clone, Debug)]
pub struct ConsensusConfig {
    /// Interval between time-triggered rounds. Environment-specific;
    /// deployments override the default.
    pub time_trigger_interval: Duration,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            time_trigger_interval: Duration::from_secs(5),
        }
    }
}

impl ConsensusConfig {
    /// Validate configuration bounds.
    pub fn validate(&self) -> Result<(), ConsensusError> {
        if self.time_trigger_interval.is_zero() {
            return Err(ConsensusError::Config(
                "time_trigger_interval must be nonzero".into(),
            ));
        }
        Ok(())
    }
}

/// Point-in-time status snapshot of the consensus manager.
#[derive(Clone, Debug, Default)]
pub struct ConsensusStatusReport {
    /// Epoch rounds currently tracked in memory.
    pub in_flight_rounds: usize,
    /// Events buffered across all peers.
    pub buffered_events: usize,
    /// Remote peers with a recorded registration.
    pub registered_peers: usize,
    /// Rounds finished locally since startup.
    pub rounds_finished: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConsensusConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = ConsensusConfig {
            time_trigger_interval: Duration::ZERO,
        };
        assert!(config.validate().is_err());
    }
}
