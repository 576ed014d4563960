// Sliding-window statistics
// Causal moving average shared by the kurtosis estimator and the threshold trace

/// Compensated running sum over a sliding window
///
/// Finite values are summed with Neumaier compensation so a large value
/// leaving the window does not leave a rounding residue behind. Non-finite
/// values are counted instead and decide the result while inside the window.
#[derive(Debug, Default, Clone)]
struct RollingSum {
    sum: f64,
    compensation: f64,
    nan: usize,
    pos_inf: usize,
    neg_inf: usize,
}

impl RollingSum {
    fn add(&mut self, value: f64) {
        if value.is_nan() {
            self.nan += 1;
        } else if value == f64::INFINITY {
            self.pos_inf += 1;
        } else if value == f64::NEG_INFINITY {
            self.neg_inf += 1;
        } else {
            self.accumulate(value);
        }
    }

    fn remove(&mut self, value: f64) {
        if value.is_nan() {
            self.nan -= 1;
        } else if value == f64::INFINITY {
            self.pos_inf -= 1;
        } else if value == f64::NEG_INFINITY {
            self.neg_inf -= 1;
        } else {
            self.accumulate(-value);
        }
    }

    fn accumulate(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    fn value(&self) -> f64 {
        if self.nan > 0 || (self.pos_inf > 0 && self.neg_inf > 0) {
            f64::NAN
        } else if self.pos_inf > 0 {
            f64::INFINITY
        } else if self.neg_inf > 0 {
            f64::NEG_INFINITY
        } else {
            self.sum + self.compensation
        }
    }
}

/// Causal moving average with a rectangular window of `window` samples
///
/// `out[i] = (x[i] + x[i-1] + ... + x[i-window+1]) / window`, with samples
/// before the start of `x` taken as zero. This is the response of the FIR
/// filter `ones(window) / window` started from rest.
pub fn trailing_mean(x: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![f64::NAN; x.len()];
    }

    let mut out = Vec::with_capacity(x.len());
    let mut acc = RollingSum::default();
    let scale = window as f64;

    for i in 0..x.len() {
        acc.add(x[i]);
        if i >= window {
            acc.remove(x[i - window]);
        }
        out.push(acc.value() / scale);
    }

    out
}
