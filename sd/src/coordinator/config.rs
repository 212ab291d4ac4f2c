//! Coordinator configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings for the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Ceiling on a trigger round trip in milliseconds. When it passes
    /// without a completion, the debounce entry is released so the target
    /// stays responsive to later triggers.
    #[serde(rename = "round-trip-timeout-ms", default = "default_round_trip_timeout_ms")]
    pub round_trip_timeout_ms: u64,

    /// Command channel buffer size
    #[serde(rename = "channel-buffer", default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

fn default_round_trip_timeout_ms() -> u64 {
    2000
}

fn default_channel_buffer() -> usize {
    256
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            round_trip_timeout_ms: default_round_trip_timeout_ms(),
            channel_buffer: default_channel_buffer(),
        }
    }
}

impl CoordinatorConfig {
    /// Round-trip ceiling as a Duration.
    pub fn round_trip_timeout(&self) -> Duration {
        debug!(
            round_trip_timeout_ms = %self.round_trip_timeout_ms,
            "CoordinatorConfig::round_trip_timeout: called"
        );
        Duration::from_millis(self.round_trip_timeout_ms)
    }
}
