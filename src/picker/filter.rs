// Octave band filter bank
// Butterworth design from the analog prototype, causal second-order-section
// filtering, and the cosine taper applied to every band

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::picker::types::PickerError;
use crate::waveform::ChannelTrace;

/// Imaginary parts below this are treated as real roots when forming sections
const REAL_ROOT_TOLERANCE: f64 = 1e-10;

/// One second-order section, normalised so that a0 == 1
///
/// H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 2],
}

impl Biquad {
    /// Poles inside the unit circle
    pub fn is_stable(&self) -> bool {
        let [a1, a2] = self.a;
        a2.abs() < 1.0 && a1.abs() < 1.0 + a2
    }
}

/// Cascade of second-order sections
#[derive(Debug, Clone, PartialEq)]
pub struct SosFilter {
    sections: Vec<Biquad>,
}

impl SosFilter {
    /// Butterworth band-pass with `order` poles per edge (2 * order in total)
    ///
    /// Corners are in Hz. The design pre-warps both corners, maps the
    /// low-pass prototype to a band-pass around their geometric mean and
    /// moves to the z-plane with the bilinear transform.
    pub fn butterworth_bandpass(
        order: usize,
        low_hz: f64,
        high_hz: f64,
        sampling_rate: f64,
    ) -> Self {
        let nyquist = sampling_rate / 2.0;
        let w1 = prewarp(low_hz / nyquist);
        let w2 = prewarp(high_hz / nyquist);
        let bw = w2 - w1;
        let wo = (w1 * w2).sqrt();

        let mut poles = Vec::with_capacity(2 * order);
        for p in butterworth_prototype(order) {
            let p_lp = p * (bw / 2.0);
            let disc = (p_lp * p_lp - wo * wo).sqrt();
            poles.push(p_lp + disc);
            poles.push(p_lp - disc);
        }
        let zeros = vec![Complex64::new(0.0, 0.0); order];
        let gain = bw.powi(order as i32);

        let (zeros, poles, gain) = bilinear(zeros, poles, gain);
        SosFilter {
            sections: to_sections(&zeros, &poles, gain),
        }
    }

    /// Butterworth high-pass of the given order
    pub fn butterworth_highpass(order: usize, cutoff_hz: f64, sampling_rate: f64) -> Self {
        let nyquist = sampling_rate / 2.0;
        let wo = prewarp(cutoff_hz / nyquist);

        let prototype = butterworth_prototype(order);
        let denom: Complex64 = prototype.iter().map(|&p| -p).product();
        let poles: Vec<Complex64> = prototype.iter().map(|&p| wo / p).collect();
        let zeros = vec![Complex64::new(0.0, 0.0); order];
        let gain = 1.0 / denom.re;

        let (zeros, poles, gain) = bilinear(zeros, poles, gain);
        SosFilter {
            sections: to_sections(&zeros, &poles, gain),
        }
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(Biquad::is_stable)
    }

    /// Filter `input` causally, starting from rest (transposed direct form II)
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        let mut signal = input.to_vec();

        for section in &self.sections {
            let [b0, b1, b2] = section.b;
            let [a1, a2] = section.a;
            let (mut z1, mut z2) = (0.0, 0.0);

            for x in signal.iter_mut() {
                let input = *x;
                let y = b0 * input + z1;
                z1 = b1 * input - a1 * y + z2;
                z2 = b2 * input - a2 * y;
                *x = y;
            }
        }

        signal
    }

    /// Complex response at `freq_hz`
    pub fn frequency_response(&self, freq_hz: f64, sampling_rate: f64) -> Complex64 {
        let omega = 2.0 * PI * freq_hz / sampling_rate;
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;

        self.sections
            .iter()
            .map(|s| {
                let num = s.b[0] + s.b[1] * z1 + s.b[2] * z2;
                let den = 1.0 + s.a[0] * z1 + s.a[1] * z2;
                num / den
            })
            .product()
    }
}

/// Analog Butterworth prototype poles (unit cutoff)
fn butterworth_prototype(order: usize) -> Vec<Complex64> {
    let n = order as f64;
    (0..order)
        .map(|k| {
            let m = -n + 1.0 + 2.0 * k as f64;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n))
        })
        .collect()
}

/// Pre-warp a normalised frequency (1.0 == Nyquist) for the bilinear transform
fn prewarp(normalized: f64) -> f64 {
    4.0 * (PI * normalized / 2.0).tan()
}

/// Bilinear transform of an analog zpk system (fs = 2 after normalisation)
fn bilinear(
    zeros: Vec<Complex64>,
    poles: Vec<Complex64>,
    gain: f64,
) -> (Vec<Complex64>, Vec<Complex64>, f64) {
    let fs2 = Complex64::new(4.0, 0.0);
    let degree = poles.len().saturating_sub(zeros.len());

    let num: Complex64 = zeros.iter().map(|z| fs2 - z).product();
    let den: Complex64 = poles.iter().map(|p| fs2 - p).product();

    let mut zeros_z: Vec<Complex64> = zeros.iter().map(|z| (fs2 + z) / (fs2 - z)).collect();
    zeros_z.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));
    let poles_z = poles.iter().map(|p| (fs2 + p) / (fs2 - p)).collect();

    (zeros_z, poles_z, gain * (num / den).re)
}

/// Monic quadratics covering a set of roots closed under conjugation
///
/// Conjugate pairs form one quadratic each; real roots are paired smallest
/// with largest, and a leftover real root becomes a first-order factor.
fn root_quadratics(roots: &[Complex64]) -> Vec<[f64; 3]> {
    let mut quads = Vec::new();
    let mut reals = Vec::new();

    for r in roots {
        if r.im > REAL_ROOT_TOLERANCE {
            quads.push([1.0, -2.0 * r.re, r.norm_sqr()]);
        } else if r.im.abs() <= REAL_ROOT_TOLERANCE {
            reals.push(r.re);
        }
    }

    reals.sort_by(|a, b| a.total_cmp(b));
    let (mut lo, mut hi) = (0, reals.len());
    while hi - lo >= 2 {
        let (x, y) = (reals[lo], reals[hi - 1]);
        quads.push([1.0, -(x + y), x * y]);
        lo += 1;
        hi -= 1;
    }
    if hi - lo == 1 {
        quads.push([1.0, -reals[lo], 0.0]);
    }

    quads
}

fn to_sections(zeros: &[Complex64], poles: &[Complex64], gain: f64) -> Vec<Biquad> {
    let numerators = root_quadratics(zeros);
    let denominators = root_quadratics(poles);
    let count = numerators.len().max(denominators.len()).max(1);
    let unity = [1.0, 0.0, 0.0];

    (0..count)
        .map(|i| {
            let mut b = numerators.get(i).copied().unwrap_or(unity);
            let a = denominators.get(i).copied().unwrap_or(unity);
            if i == 0 {
                b.iter_mut().for_each(|c| *c *= gain);
            }
            Biquad { b, a: [a[1], a[2]] }
        })
        .collect()
}

/// Half-cosine taper window of `npts` samples
///
/// `fraction` of the samples (split between both ends) ramp from 0 to 1.
pub fn cosine_taper(npts: usize, fraction: f64) -> Vec<f64> {
    if npts == 0 {
        return Vec::new();
    }

    let frac = if fraction == 0.0 || fraction == 1.0 {
        (npts as f64 * fraction / 2.0) as i64
    } else {
        (npts as f64 * fraction / 2.0 + 0.5) as i64
    };

    let n = npts as i64;
    let idx1 = 0i64;
    let mut idx2 = frac - 1;
    let mut idx3 = n - frac;
    let idx4 = n - 1;
    if idx1 == idx2 {
        idx2 += 1;
    }
    if idx3 == idx4 {
        idx3 -= 1;
    }

    let mut window = vec![0.0; npts];
    for i in 0..n {
        let value = if i >= idx3 {
            0.5 * (1.0 + (PI * (idx3 - i) as f64 / (idx4 - idx3) as f64).cos())
        } else if i <= idx2 {
            0.5 * (1.0 - (PI * (i - idx1) as f64 / (idx2 - idx1) as f64).cos())
        } else {
            1.0
        };
        window[i as usize] = value;
    }

    if idx1 == idx2 {
        window[idx1 as usize] = 0.0;
    }
    if idx3 == idx4 && idx3 >= 0 {
        window[idx3 as usize] = 0.0;
    }

    window
}

/// Frequency limits of one octave band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub index: usize,
    pub low_freq: f64,
    pub high_freq: f64,
    pub center_freq: f64,
}

/// A band-limited copy of a trace
#[derive(Debug, Clone)]
pub struct BandSignal {
    pub band: Band,
    pub samples: Vec<f64>,
}

/// Number of octave bands that fit below Nyquist
pub fn band_count(sampling_rate: f64, freqmin: f64) -> Result<usize, PickerError> {
    let nyquist = sampling_rate / 2.0;
    let octaves = (nyquist / 1.5 / freqmin).log2();
    let count = if octaves.is_finite() {
        octaves.trunc() as i64 + 1
    } else {
        0
    };

    if count < 1 {
        return Err(PickerError::NoBands { freqmin, nyquist });
    }
    Ok(count as usize)
}

/// Octave bands for a sampling rate; band j tops out at 1.5 * freqmin * 2^j
pub fn band_layout(sampling_rate: f64, freqmin: f64) -> Result<Vec<Band>, PickerError> {
    let count = band_count(sampling_rate, freqmin)?;

    Ok((0..count)
        .map(|j| {
            let high_freq = 1.5 * freqmin * 2f64.powi(j as i32);
            let low_freq = high_freq / 2.0;
            Band {
                index: j,
                low_freq,
                high_freq,
                center_freq: (low_freq + high_freq) / 2.0,
            }
        })
        .collect())
}

/// Split a trace into tapered octave bands
///
/// A band whose upper corner reaches Nyquist degrades to a high-pass at its
/// lower corner. Each band keeps the input length.
pub fn decompose(
    trace: &ChannelTrace,
    freqmin: f64,
    corners: usize,
    taper_percent: f64,
) -> Result<Vec<BandSignal>, PickerError> {
    let bands = band_layout(trace.sampling_rate, freqmin)?;
    let nyquist = trace.nyquist();
    let taper = cosine_taper(trace.len(), taper_percent);

    let mut signals = Vec::with_capacity(bands.len());
    for band in bands {
        if band.low_freq / nyquist > 1.0 {
            return Err(PickerError::CornerAboveNyquist {
                low: band.low_freq,
                nyquist,
            });
        }

        let filter = if band.high_freq / nyquist - 1.0 > -1e-6 {
            log::warn!(
                "Band {} upper corner {} Hz reaches Nyquist ({} Hz), using high-pass at {} Hz",
                band.index,
                band.high_freq,
                nyquist,
                band.low_freq
            );
            SosFilter::butterworth_highpass(corners, band.low_freq, trace.sampling_rate)
        } else {
            SosFilter::butterworth_bandpass(
                corners,
                band.low_freq,
                band.high_freq,
                trace.sampling_rate,
            )
        };

        let mut samples = filter.filter(&trace.samples);
        for (s, w) in samples.iter_mut().zip(taper.iter()) {
            *s *= w;
        }

        signals.push(BandSignal { band, samples });
    }

    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::ChannelId;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn trace(samples: Vec<f64>, sampling_rate: f64) -> ChannelTrace {
        let start = Utc.with_ymd_and_hms(2022, 3, 23, 10, 0, 0).unwrap();
        ChannelTrace::new(ChannelId::new("8R", "V", "", "001"), samples, sampling_rate, start)
            .unwrap()
    }

    #[test]
    fn test_band_count() {
        // Nyquist 1.5 Hz, freqmin 1.5 Hz
        assert_eq!(band_count(3.0, 1.5).unwrap(), 1);
        // Nyquist 24 Hz: log2(24 / 1.5 / 1.5) = 3.4
        assert_eq!(band_count(48.0, 1.5).unwrap(), 4);
        assert_eq!(band_count(10_000.0, 500.0).unwrap(), 3);
    }

    #[test]
    fn test_band_count_rejects_high_freqmin() {
        assert!(matches!(
            band_count(3.0, 3.0),
            Err(PickerError::NoBands { .. })
        ));
    }

    #[test]
    fn test_band_layout_doubles() {
        let bands = band_layout(48.0, 1.5).unwrap();

        assert_eq!(bands.len(), 4);
        assert_eq!(bands[0].low_freq, 1.125);
        assert_eq!(bands[0].high_freq, 2.25);
        assert_eq!(bands[0].center_freq, 1.6875);
        assert_eq!(bands[3].high_freq, 18.0);
        for pair in bands.windows(2) {
            assert_eq!(pair[1].low_freq, pair[0].low_freq * 2.0);
        }
    }

    #[test]
    fn test_bandpass_response() {
        let fs = 10_000.0;
        let filter = SosFilter::butterworth_bandpass(4, 750.0, 1500.0, fs);

        assert_eq!(filter.sections().len(), 4);
        assert!(filter.is_stable());

        // Passband
        assert!(filter.frequency_response(1050.0, fs).norm() > 0.9);
        // Stopbands
        assert!(filter.frequency_response(90.0, fs).norm() < 0.01);
        assert!(filter.frequency_response(4500.0, fs).norm() < 0.01);
        // Zeros at DC and Nyquist
        assert!(filter.frequency_response(0.0, fs).norm() < 1e-9);
    }

    #[test]
    fn test_bandpass_odd_order() {
        let fs = 10_000.0;
        let filter = SosFilter::butterworth_bandpass(3, 750.0, 1500.0, fs);

        assert_eq!(filter.sections().len(), 3);
        assert!(filter.is_stable());
        assert!(filter.frequency_response(1050.0, fs).norm() > 0.9);
    }

    #[test]
    fn test_highpass_response() {
        let fs = 3.0;
        let filter = SosFilter::butterworth_highpass(4, 1.125, fs);

        assert!(filter.is_stable());
        assert_relative_eq!(filter.frequency_response(1.5, fs).norm(), 1.0, epsilon = 1e-9);
        assert!(filter.frequency_response(0.1, fs).norm() < 0.01);
    }

    #[test]
    fn test_filter_removes_dc() {
        let fs = 10_000.0;
        let filter = SosFilter::butterworth_bandpass(4, 750.0, 1500.0, fs);
        let out = filter.filter(&vec![1.0; 5000]);

        assert_eq!(out.len(), 5000);
        assert!(out[4999].abs() < 1e-6);
    }

    #[test]
    fn test_cosine_taper() {
        let w = cosine_taper(100, 0.1);

        assert_eq!(w.len(), 100);
        assert!(w[0].abs() < 1e-12);
        assert!(w[99].abs() < 1e-12);
        assert_relative_eq!(w[4], 1.0, epsilon = 1e-12);
        assert_relative_eq!(w[2], 0.5, epsilon = 1e-12);
        assert!(w[5..95].iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_zero_taper_is_flat() {
        assert!(cosine_taper(50, 0.0).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_decompose_keeps_length() {
        let samples: Vec<f64> = (0..480).map(|i| (i as f64 * 0.7).sin()).collect();
        let bands = decompose(&trace(samples, 48.0), 1.5, 4, 0.05).unwrap();

        assert_eq!(bands.len(), 4);
        assert!(bands.iter().all(|b| b.samples.len() == 480));
        assert!(bands.iter().all(|b| b.samples.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_decompose_single_band_at_nyquist() {
        // The only band overshoots Nyquist and falls back to a high-pass
        let samples: Vec<f64> = (0..300).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let bands = decompose(&trace(samples, 3.0), 1.5, 2, 0.0).unwrap();

        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].band.low_freq, 1.125);
        assert!(bands[0].samples[299].abs() > 0.5);
    }

    #[test]
    fn test_decompose_rejects_high_freqmin() {
        let result = decompose(&trace(vec![0.0; 100], 3.0), 3.0, 4, 0.05);
        assert!(matches!(result, Err(PickerError::NoBands { .. })));
    }
}
