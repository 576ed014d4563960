// Channel traces
// One channel's time-ordered samples with sampling rate, start time and identity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::waveform::WaveformError;

/// SEED-style channel identity (network, station, location, channel)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
}

impl ChannelId {
    pub fn new(
        network: impl Into<String>,
        station: impl Into<String>,
        location: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        ChannelId {
            network: network.into(),
            station: station.into(),
            location: location.into(),
            channel: channel.into(),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }
}

/// A single channel's waveform
///
/// Sample `i` lies at `start_time + i / sampling_rate`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTrace {
    pub id: ChannelId,

    /// Raw samples, in whatever unit the recorder produced
    pub samples: Vec<f64>,

    /// Sampling rate in Hz
    pub sampling_rate: f64,

    /// Absolute time of the first sample
    pub start_time: DateTime<Utc>,
}

impl ChannelTrace {
    /// Create a trace, rejecting non-positive or non-finite sampling rates
    pub fn new(
        id: ChannelId,
        samples: Vec<f64>,
        sampling_rate: f64,
        start_time: DateTime<Utc>,
    ) -> Result<Self, WaveformError> {
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(WaveformError::InvalidSamplingRate(sampling_rate));
        }

        Ok(ChannelTrace {
            id,
            samples,
            sampling_rate,
            start_time,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample spacing in seconds
    pub fn delta(&self) -> f64 {
        1.0 / self.sampling_rate
    }

    pub fn nyquist(&self) -> f64 {
        self.sampling_rate / 2.0
    }

    /// Offset of sample `index` from the start of the trace, in seconds
    pub fn offset_of(&self, index: usize) -> f64 {
        index as f64 / self.sampling_rate
    }

    /// Absolute time of sample `index`
    pub fn time_at(&self, index: usize) -> DateTime<Utc> {
        self.start_time + offset_duration(self.offset_of(index))
    }

    /// Time spanned from the first to the last sample, in seconds
    pub fn duration_secs(&self) -> f64 {
        self.offset_of(self.len().saturating_sub(1))
    }
}

/// Convert a (possibly fractional) second offset to a nanosecond-resolution duration
pub fn offset_duration(seconds: f64) -> Duration {
    Duration::nanoseconds((seconds * 1e9).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 2, 9, 13, 24, 0).unwrap()
    }

    #[test]
    fn test_channel_id_display() {
        let id = ChannelId::new("GR", "GRM", "00", "001");
        assert_eq!(id.to_string(), "GR.GRM.00.001");
    }

    #[test]
    fn test_rejects_bad_sampling_rate() {
        let id = ChannelId::new("GR", "GRM", "", "001");
        assert!(ChannelTrace::new(id.clone(), vec![0.0; 4], 0.0, start()).is_err());
        assert!(ChannelTrace::new(id.clone(), vec![0.0; 4], f64::NAN, start()).is_err());
        assert!(ChannelTrace::new(id, vec![0.0; 4], 200_000.0, start()).is_ok());
    }

    #[test]
    fn test_time_at_sub_millisecond() {
        let id = ChannelId::new("GR", "GRM", "", "001");
        let trace = ChannelTrace::new(id, vec![0.0; 1000], 200_000.0, start()).unwrap();

        // 1 sample at 200 kHz is 5 microseconds
        let t = trace.time_at(3);
        assert_eq!((t - start()).num_nanoseconds(), Some(15_000));
        assert_eq!(trace.delta(), 5e-6);
        assert_eq!(trace.nyquist(), 100_000.0);
    }

    #[test]
    fn test_duration_secs() {
        let id = ChannelId::new("GR", "GRM", "", "001");
        let trace = ChannelTrace::new(id, vec![0.0; 101], 100.0, start()).unwrap();
        assert!((trace.duration_secs() - 1.0).abs() < 1e-12);
    }
}
