//! Page synchronizer configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for page synchronizers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Delay before applying speed to newly observed media, in milliseconds.
    /// Lets player scaffolding finish before the rate lands.
    #[serde(rename = "settle-delay-ms", default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Mailbox capacity for page requests
    #[serde(rename = "channel-buffer", default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

fn default_settle_delay_ms() -> u64 {
    120
}

fn default_channel_buffer() -> usize {
    64
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            channel_buffer: default_channel_buffer(),
        }
    }
}

impl PageConfig {
    /// Settle delay as a Duration.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
