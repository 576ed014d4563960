// Picker configuration
// Parameters of the filter-bank kurtosis picker, validated before any channel runs

use serde::{Deserialize, Serialize};

use crate::executor::ExecutorError;
use crate::picker::types::PickerError;

/// Configuration for the filter-bank kurtosis picker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    /// Basis of the lowest octave band in Hz
    /// Band j spans [0.75, 1.5] * freqmin * 2^j
    pub freqmin: f64,

    /// Butterworth order of each band filter
    pub corners: usize,

    /// Fraction of the trace tapered by the cosine window (split over both ends)
    pub taper_percent: f64,

    /// Kurtosis window length in seconds
    pub t_win: f64,

    /// Threshold multiplier applied to the moving average of the summary CF
    pub nsigma: f64,

    /// Moving-average window of the threshold in seconds
    pub t_ma: f64,

    /// Guard offset in seconds; no trigger is accepted before it
    pub t_tr: f64,

    /// Samples before the trigger included in the refinement window
    pub ncum0: usize,

    /// Samples after the trigger included in the refinement window
    pub ncum1: usize,

    /// Number of channels picked concurrently (1 = serial)
    pub parallel_jobs: i64,
}

impl Default for PickerConfig {
    fn default() -> Self {
        PickerConfig {
            freqmin: 1000.0,
            corners: 4,
            taper_percent: 0.05,
            t_win: 0.001,
            nsigma: 7.0,
            t_ma: 0.02,
            t_tr: 0.01,
            ncum0: 20,
            ncum1: 200,
            parallel_jobs: 1,
        }
    }
}

impl PickerConfig {
    /// Reject configurations no trace could be picked with
    pub fn validate(&self) -> Result<(), PickerError> {
        if !(self.freqmin.is_finite() && self.freqmin > 0.0) {
            return Err(invalid(format!("freqmin must be positive, got {}", self.freqmin)));
        }
        if self.corners == 0 {
            return Err(invalid("corners must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.taper_percent) {
            return Err(invalid(format!(
                "taper_percent must lie in [0, 1], got {}",
                self.taper_percent
            )));
        }
        if !(self.t_win.is_finite() && self.t_win > 0.0) {
            return Err(invalid(format!("t_win must be positive, got {}", self.t_win)));
        }
        if !self.nsigma.is_finite() {
            return Err(invalid(format!("nsigma must be finite, got {}", self.nsigma)));
        }
        if !(self.t_ma.is_finite() && self.t_ma > 0.0) {
            return Err(invalid(format!("t_ma must be positive, got {}", self.t_ma)));
        }
        if !(self.t_tr.is_finite() && self.t_tr >= 0.0) {
            return Err(invalid(format!("t_tr must not be negative, got {}", self.t_tr)));
        }
        if self.ncum1 == 0 {
            return Err(invalid("ncum1 must be at least 1".to_string()));
        }
        if self.parallel_jobs < 1 {
            return Err(ExecutorError::InvalidParallelism(self.parallel_jobs).into());
        }

        Ok(())
    }

    /// Kurtosis window in samples for a trace sampled every `delta` seconds
    pub fn kurtosis_window(&self, delta: f64) -> usize {
        ((self.t_win / delta) as usize).saturating_add(1)
    }

    /// Threshold moving-average window in samples (npts_Tma)
    pub fn moving_average_samples(&self, delta: f64) -> usize {
        (self.t_ma / delta).round() as usize
    }

    /// Guard offset in samples (npts_Tr)
    pub fn guard_samples(&self, delta: f64) -> usize {
        (self.t_tr / delta).round() as usize
    }
}

fn invalid(message: String) -> PickerError {
    PickerError::InvalidConfig(message)
}
