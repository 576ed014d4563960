// Trigger and onset refinement
// Threshold crossings gated by the globally detrended cumulative CF, refined locally

/// Running sum of `x`
pub fn cumulative_sum(x: &[f64]) -> Vec<f64> {
    x.iter()
        .scan(0.0, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Remove the least-squares straight line from `y`
///
/// The fit is over the sample index. A single sample detrends to zero.
pub fn detrend_linear(y: &[f64]) -> Vec<f64> {
    let n = y.len();
    if n == 0 {
        return Vec::new();
    }

    let t_mean = (n as f64 - 1.0) / 2.0;
    let y_mean = y.iter().sum::<f64>() / n as f64;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &v) in y.iter().enumerate() {
        let dt = i as f64 - t_mean;
        sxy += dt * (v - y_mean);
        sxx += dt * dt;
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };

    y.iter()
        .enumerate()
        .map(|(i, &v)| v - y_mean - slope * (i as f64 - t_mean))
        .collect()
}

/// Indices at or after `guard` where the summary exceeds the threshold and
/// the detrended cumulative summary of the whole trace is negative
///
/// The cumulative sum is detrended once over the full trace. Any NaN in the
/// summary poisons the fit, which leaves no candidates.
pub fn trigger_candidates(summary: &[f64], threshold: &[f64], guard: usize) -> Vec<usize> {
    let detrended = detrend_linear(&cumulative_sum(summary));

    (guard..summary.len().min(threshold.len()))
        .filter(|&i| summary[i] > threshold[i] && detrended[i] < 0.0)
        .collect()
}

/// Refined onset sample for the trigger at `t0`
///
/// Looks at `summary[t0 - ncum0 .. t0 + ncum1)`, clamped to the trace, and
/// returns the absolute index where the detrended cumulative sum of that
/// window is lowest (first one on ties). `None` when the window is empty.
pub fn refine_onset(summary: &[f64], t0: usize, ncum0: usize, ncum1: usize) -> Option<usize> {
    let start = t0.saturating_sub(ncum0);
    let end = t0.saturating_add(ncum1).min(summary.len());
    if start >= end {
        return None;
    }

    let detrended = detrend_linear(&cumulative_sum(&summary[start..end]));

    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in detrended.iter().enumerate() {
        match best {
            Some((_, min)) if v >= min => {}
            _ => best = Some((i, v)),
        }
    }

    best.map(|(i, _)| start + i)
}
