// Characteristic-function aggregation
// Collapses per-band kurtosis into one summary trace and an adaptive threshold

use serde::Serialize;

use crate::picker::window::trailing_mean;

/// Summary characteristic function and the threshold it is compared against
#[derive(Debug, Clone, Serialize)]
pub struct CharacteristicFunction {
    /// Per-sample maximum over all bands
    pub summary: Vec<f64>,

    /// `nsigma` times the moving average of `summary` over the preceding
    /// `npts_tma` samples; zero during the warm-up
    pub threshold: Vec<f64>,
}

impl CharacteristicFunction {
    pub fn len(&self) -> usize {
        self.summary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
    }
}

/// Element-wise maximum over bands
///
/// NaN wins over any number, so an undefined band makes the instant undefined.
pub fn summarize(bands_cf: &[Vec<f64>]) -> Vec<f64> {
    let len = bands_cf.first().map(Vec::len).unwrap_or(0);

    (0..len)
        .map(|i| {
            bands_cf
                .iter()
                .map(|band| band[i])
                .fold(f64::NEG_INFINITY, |acc, v| {
                    if acc.is_nan() || v.is_nan() {
                        f64::NAN
                    } else {
                        acc.max(v)
                    }
                })
        })
        .collect()
}

/// Adaptive threshold over the summary
///
/// Samples `[0, npts_tma)` stay at zero; later samples get
/// `nsigma * mean(summary[i - npts_tma .. i])`.
pub fn threshold(summary: &[f64], npts_tma: usize, nsigma: f64) -> Vec<f64> {
    let mut out = vec![0.0; summary.len()];
    if npts_tma == 0 || npts_tma >= summary.len() {
        return out;
    }

    let mean = trailing_mean(summary, npts_tma);
    for i in npts_tma..summary.len() {
        out[i] = nsigma * mean[i - 1];
    }

    out
}

/// Summary CF and threshold for a set of band CFs
pub fn aggregate(bands_cf: &[Vec<f64>], npts_tma: usize, nsigma: f64) -> CharacteristicFunction {
    let summary = summarize(bands_cf);
    let threshold = threshold(&summary, npts_tma, nsigma);
    CharacteristicFunction { summary, threshold }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loudest_band_wins() {
        let bands = vec![vec![1.0, 5.0, 2.0], vec![3.0, 1.0, 2.5], vec![0.0, 4.0, 9.0]];
        assert_eq!(summarize(&bands), vec![3.0, 5.0, 9.0]);
    }

    #[test]
    fn test_nan_band_propagates() {
        let bands = vec![vec![1.0, f64::NAN], vec![2.0, 7.0]];
        let summary = summarize(&bands);

        assert_eq!(summary[0], 2.0);
        assert!(summary[1].is_nan());
    }

    #[test]
    fn test_no_bands_gives_empty_summary() {
        assert!(summarize(&[]).is_empty());
    }

    #[test]
    fn test_threshold_warm_up_is_zero() {
        let summary = vec![2.0; 10];
        let thr = threshold(&summary, 4, 3.0);

        assert_eq!(&thr[..4], &[0.0; 4]);
        assert!(thr[4..].iter().all(|&v| v == 6.0));
    }

    #[test]
    fn test_threshold_uses_preceding_samples_only() {
        let summary = vec![1.0, 1.0, 1.0, 100.0, 1.0];
        let thr = threshold(&summary, 3, 2.0);

        // Sample 3 is compared against the mean of samples 0..3
        assert_eq!(thr[3], 2.0);
        assert_eq!(thr[4], 2.0 * 102.0 / 3.0);
    }

    #[test]
    fn test_threshold_window_longer_than_trace() {
        let thr = threshold(&[1.0, 2.0, 3.0], 5, 2.0);
        assert_eq!(thr, vec![0.0; 3]);
    }

    #[test]
    fn test_aggregate() {
        let bands = vec![vec![1.0; 6], vec![2.0; 6]];
        let cf = aggregate(&bands, 2, 1.5);

        assert_eq!(cf.len(), 6);
        assert_eq!(cf.summary, vec![2.0; 6]);
        assert_eq!(cf.threshold[1], 0.0);
        assert_eq!(cf.threshold[2], 3.0);
    }
}
