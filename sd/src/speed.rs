//! Speed domain vocabulary shared across the coordinator and pages
//!
//! The scalar itself ([`SpeedValue`]) lives in the speedstore crate; this
//! module adds the trigger names and the step arithmetic the coordinator
//! performs on top of it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use speedstore::{DEFAULT_SPEED, MAX_SPEED, MIN_SPEED, SPEED_STEP, SpeedValue};

/// Preset speeds offered by control surfaces, in display order.
pub const PRESET_SPEEDS: [f64; 4] = [0.5, 1.0, 1.5, 2.0];

/// Named trigger events the coordinator resolves into round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerKind {
    /// Step the active page's speed up by one increment
    IncreaseSpeed,
    /// Step the active page's speed down by one increment
    DecreaseSpeed,
    /// Snap the active page's speed back to the default
    ResetSpeed,
}

impl TriggerKind {
    /// Compute the speed a round trip should set, given the value it read
    /// from the target.
    pub fn next_speed(self, current: SpeedValue) -> SpeedValue {
        match self {
            TriggerKind::IncreaseSpeed => current.increased(),
            TriggerKind::DecreaseSpeed => current.decreased(),
            TriggerKind::ResetSpeed => SpeedValue::DEFAULT,
        }
    }

    /// Canonical trigger name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerKind::IncreaseSpeed => "increase-speed",
            TriggerKind::DecreaseSpeed => "decrease-speed",
            TriggerKind::ResetSpeed => "reset-speed",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "increase-speed" | "increase" | "+" => Ok(TriggerKind::IncreaseSpeed),
            "decrease-speed" | "decrease" | "-" => Ok(TriggerKind::DecreaseSpeed),
            "reset-speed" | "reset" | "0" => Ok(TriggerKind::ResetSpeed),
            other => Err(eyre::eyre!("Unknown trigger: {}", other)),
        }
    }
}
