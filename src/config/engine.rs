//! Event loop configuration.

use serde::Deserialize;

/// Dispatcher settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Run against simulated execution; cleared events are synthesized on close.
    #[serde(default)]
    pub simulated: bool,
    /// Re-raise unexpected strategy and middleware errors instead of logging them.
    #[serde(default)]
    pub raise_errors: bool,
    /// Capacity of the inbound event queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Seconds a closed market is kept before eviction.
    #[serde(default = "default_closed_market_retention_secs")]
    pub closed_market_retention_secs: u64,
    /// Publish lag above which a market book logs a warning.
    #[serde(default = "default_max_publish_latency_secs")]
    pub max_publish_latency_secs: f64,
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_closed_market_retention_secs() -> u64 {
    3600 // 1 hour
}

fn default_max_publish_latency_secs() -> f64 {
    2.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            simulated: false,
            raise_errors: false,
            queue_capacity: default_queue_capacity(),
            closed_market_retention_secs: default_closed_market_retention_secs(),
            max_publish_latency_secs: default_max_publish_latency_secs(),
        }
    }
}
