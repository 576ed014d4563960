// Scoring configuration
// Tolerances and channel subsets used when matching automatic events to a reference

use serde::{Deserialize, Serialize};

use crate::scoring::types::ScoringError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Largest representative-time difference (s) at which two events are the same
    pub max_diff: f64,

    /// Channels compared pick by pick within matched events
    pub compare_channels: Vec<u32>,

    /// Channels whose picks are averaged into the representative time
    pub averaging_channels: Vec<u32>,

    /// Per-channel difference (s) counted as on target
    pub aim_tolerance: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            max_diff: 0.01,
            compare_channels: vec![4, 5, 6, 16, 17, 18, 19, 20, 21, 22, 23, 25, 26, 27],
            averaging_channels: (16..=22).collect(),
            aim_tolerance: 0.0001,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), ScoringError> {
        if !(self.max_diff.is_finite() && self.max_diff >= 0.0) {
            return Err(ScoringError::InvalidConfig(format!(
                "max_diff must be a non-negative number of seconds, got {}",
                self.max_diff
            )));
        }
        if !(self.aim_tolerance.is_finite() && self.aim_tolerance >= 0.0) {
            return Err(ScoringError::InvalidConfig(format!(
                "aim_tolerance must be a non-negative number of seconds, got {}",
                self.aim_tolerance
            )));
        }
        if self.averaging_channels.is_empty() {
            return Err(ScoringError::InvalidConfig(
                "averaging_channels must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
