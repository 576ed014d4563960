// Windowed kurtosis
// Rolling fourth standardized moment of a band signal, used as characteristic function

use crate::picker::filter::BandSignal;
use crate::picker::window::trailing_mean;

/// Rolling kurtosis over a trailing window of `window_samples`
///
/// Works on the finite span `[a, b]` of the input. The moving mean, second
/// and fourth central moments come from causal moving averages; the output
/// at sample `i` is `m4 / m2^2` of the window ending at `i`. Samples before
/// the first complete window and outside the finite span are zero, so the
/// result lines up with the input sample by sample.
///
/// A flat window gives `0 / 0`; the NaN is returned as is.
pub fn kurtosis(signal: &[f64], window_samples: usize) -> Vec<f64> {
    let window = if window_samples < 2 {
        log::warn!(
            "Kurtosis window of {} sample(s) is degenerate, using 2",
            window_samples
        );
        2
    } else {
        window_samples
    };

    let mut out = vec![0.0; signal.len()];

    let first = signal.iter().position(|v| v.is_finite());
    let last = signal.iter().rposition(|v| v.is_finite());
    let (a, b) = match (first, last) {
        (Some(a), Some(b)) => (a, b),
        _ => return out,
    };

    let span = &signal[a..=b];
    if span.len() < window {
        return out;
    }

    let mean = trailing_mean(span, window);
    let dev2: Vec<f64> = span
        .iter()
        .zip(mean.iter())
        .map(|(x, m)| (x - m).powi(2))
        .collect();
    let dev4: Vec<f64> = dev2.iter().map(|d| d * d).collect();

    let m2 = trailing_mean(&dev2, window);
    let m4 = trailing_mean(&dev4, window);

    for i in (window - 1)..span.len() {
        out[a + i] = m4[i] / (m2[i] * m2[i]);
    }

    out
}

/// Kurtosis characteristic function of every band
pub fn band_kurtosis(bands: &[BandSignal], window_samples: usize) -> Vec<Vec<f64>> {
    bands
        .iter()
        .map(|band| kurtosis(&band.samples, window_samples))
        .collect()
}
