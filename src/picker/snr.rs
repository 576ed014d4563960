// SNR gate
// Mean absolute amplitude after the onset over the one before it

use std::ops::RangeInclusive;

/// Window bounds relative to the onset, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateWindow {
    pub start: f64,
    pub end: f64,
}

pub const NOISE_WINDOW: GateWindow = GateWindow {
    start: -0.01,
    end: -0.0005,
};

pub const SIGNAL_WINDOW: GateWindow = GateWindow {
    start: -0.0004,
    end: 0.01,
};

/// Smallest signal-to-noise ratio that still produces a pick
pub const MIN_SNR: f64 = 1.3;

impl GateWindow {
    /// Sample range covered around `onset`, bounds rounded to the nearest
    /// sample and clamped to `len`. `None` if nothing is left.
    pub fn samples(
        &self,
        onset: usize,
        sampling_rate: f64,
        len: usize,
    ) -> Option<RangeInclusive<usize>> {
        if len == 0 {
            return None;
        }

        let onset = onset as i64;
        let first = (onset + (self.start * sampling_rate).round() as i64).max(0);
        let last = (onset + (self.end * sampling_rate).round() as i64).min(len as i64 - 1);

        if first > last {
            None
        } else {
            Some(first as usize..=last as usize)
        }
    }
}

fn mean_abs(samples: &[f64], range: Option<RangeInclusive<usize>>) -> f64 {
    match range {
        Some(range) => {
            let window = &samples[range];
            window.iter().map(|v| v.abs()).sum::<f64>() / window.len() as f64
        }
        None => f64::NAN,
    }
}

/// Signal-to-noise ratio around the onset sample
///
/// NaN when either window falls entirely outside the trace. A silent noise
/// window under a non-zero signal gives `+inf`.
pub fn snr_at(samples: &[f64], sampling_rate: f64, onset: usize) -> f64 {
    let len = samples.len();
    let noise = mean_abs(samples, NOISE_WINDOW.samples(onset, sampling_rate, len));
    let signal = mean_abs(samples, SIGNAL_WINDOW.samples(onset, sampling_rate, len));

    signal / noise
}

/// Whether a ratio clears the gate; NaN never does
pub fn passes(snr: f64) -> bool {
    snr >= MIN_SNR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(onset: usize, noise: f64, signal: f64) -> Vec<f64> {
        (0..1000)
            .map(|i| {
                let amplitude = if i < onset { noise } else { signal };
                if i % 2 == 0 {
                    amplitude
                } else {
                    -amplitude
                }
            })
            .collect()
    }

    #[test]
    fn test_window_bounds() {
        // 10 kHz: noise [-100, -5], signal [-4, +100]
        assert_eq!(NOISE_WINDOW.samples(500, 10_000.0, 1000), Some(400..=495));
        assert_eq!(SIGNAL_WINDOW.samples(500, 10_000.0, 1000), Some(496..=600));
    }

    #[test]
    fn test_window_clamped_to_trace() {
        assert_eq!(NOISE_WINDOW.samples(50, 10_000.0, 1000), Some(0..=45));
        assert_eq!(SIGNAL_WINDOW.samples(950, 10_000.0, 1000), Some(946..=999));
        assert_eq!(NOISE_WINDOW.samples(2, 10_000.0, 1000), None);
    }

    #[test]
    fn test_ratio_at_boundary_is_accepted() {
        // Signal window starts 4 samples early, so put the step there
        let samples = step(496, 10.0, 13.0);
        let snr = snr_at(&samples, 10_000.0, 500);

        assert!((snr - 1.3).abs() < 1e-12);
        assert!(passes(snr));
    }

    #[test]
    fn test_ratio_below_boundary_is_rejected() {
        let samples = step(496, 10.0, 12.999);
        assert!(!passes(snr_at(&samples, 10_000.0, 500)));
    }

    #[test]
    fn test_silent_noise_accepts() {
        let samples = step(496, 0.0, 1.0);
        let snr = snr_at(&samples, 10_000.0, 500);
        assert!(snr.is_infinite());
        assert!(passes(snr));
    }

    #[test]
    fn test_missing_noise_window_rejects() {
        let samples = step(0, 1.0, 5.0);
        let snr = snr_at(&samples, 10_000.0, 0);
        assert!(snr.is_nan());
        assert!(!passes(snr));
    }
}
