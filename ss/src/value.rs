//! Bounded playback-speed value

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Lower bound of the speed domain
pub const MIN_SPEED: f64 = 0.25;

/// Upper bound of the speed domain
pub const MAX_SPEED: f64 = 3.0;

/// Speed used when nothing has been committed
pub const DEFAULT_SPEED: f64 = 1.0;

/// Step applied by relative adjustments
pub const SPEED_STEP: f64 = 0.25;

/// Added before rounding an increase so binary-fraction droop cannot pull
/// e.g. `0.30 + 0.25` down to `0.549999...` before the two-decimal round.
const STEP_EPSILON: f64 = 0.001;

/// A playback speed, always inside `[0.25, 3.0]` and rounded to two decimals.
///
/// Every constructor normalizes, so two values reached along different
/// arithmetic paths compare equal exactly when their two-decimal
/// representations match.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SpeedValue(f64);

impl SpeedValue {
    /// The default speed (`1.0`).
    pub const DEFAULT: SpeedValue = SpeedValue(DEFAULT_SPEED);

    /// The slowest representable speed.
    pub const MIN: SpeedValue = SpeedValue(MIN_SPEED);

    /// The fastest representable speed.
    pub const MAX: SpeedValue = SpeedValue(MAX_SPEED);

    /// Normalize a raw number into the domain.
    ///
    /// Non-finite input falls back to the default; numeric input is rounded
    /// to two decimals and clamped to the domain bounds.
    pub fn from_f64(raw: f64) -> Self {
        if !raw.is_finite() {
            return Self::DEFAULT;
        }
        SpeedValue(round2(raw).clamp(MIN_SPEED, MAX_SPEED))
    }

    /// The inner value. Guaranteed in-domain and two-decimal by construction.
    pub fn get(self) -> f64 {
        self.0
    }

    /// One step up, capped at the upper bound.
    pub fn increased(self) -> Self {
        SpeedValue(MAX_SPEED.min(round2(self.0 + STEP_EPSILON + SPEED_STEP)))
    }

    /// One step down, capped at the lower bound.
    pub fn decreased(self) -> Self {
        SpeedValue(MIN_SPEED.max(round2(self.0 - SPEED_STEP)))
    }

    /// Compact rendering with trailing zeros trimmed: `1.5` not `1.50`,
    /// `1` not `1.00`. Used for badge-style displays.
    pub fn badge_text(self) -> String {
        let text = format!("{:.2}", self.0);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

impl Default for SpeedValue {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for SpeedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for SpeedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

// Deserialization normalizes, so a hand-edited record file cannot smuggle an
// out-of-domain speed into the system.
impl<'de> Deserialize<'de> for SpeedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        Ok(SpeedValue::from_f64(raw))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
