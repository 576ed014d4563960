// Waveform ingestion
// Reads interleaved multichannel WAV recordings into per-channel traces

use chrono::{DateTime, Utc};
use hound::{SampleFormat, WavReader};
use std::io::Cursor;
use thiserror::Error;

use crate::waveform::{ChannelId, ChannelTrace};

#[derive(Debug, Error)]
pub enum WaveformError {
    #[error("Failed to read WAV file: {0}")]
    WavReadError(#[from] hound::Error),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid sampling rate: {0} Hz")]
    InvalidSamplingRate(f64),

    #[error("Invalid waveform data")]
    InvalidData,
}

/// Ingest a WAV recording from raw bytes
///
/// Every WAV channel becomes one trace; channel codes are the 1-based
/// channel index zero-padded to three digits (`001`, `002`, ...).
/// Integer samples are scaled to [-1.0, 1.0].
pub fn ingest_wav(
    data: &[u8],
    network: &str,
    station: &str,
    start_time: DateTime<Utc>,
) -> Result<Vec<ChannelTrace>, WaveformError> {
    let mut reader = WavReader::new(Cursor::new(data))?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(WaveformError::InvalidData);
    }

    let interleaved: Vec<f64> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|s| s as f64 / 32768.0)
            .collect(),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|s| s as f64 / 8388608.0)
            .collect(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|s| s as f64 / 2147483648.0)
            .collect(),
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(f64::from)
            .collect(),
        (format, bits) => {
            return Err(WaveformError::UnsupportedFormat(format!(
                "{:?} {}-bit",
                format, bits
            )));
        }
    };

    if interleaved.len() % channels != 0 {
        return Err(WaveformError::InvalidData);
    }
    let frame_count = interleaved.len() / channels;

    let mut traces = Vec::with_capacity(channels);
    for ch in 0..channels {
        let samples: Vec<f64> = (0..frame_count)
            .map(|frame| interleaved[frame * channels + ch])
            .collect();

        let id = ChannelId::new(network, station, "", format!("{:03}", ch + 1));
        traces.push(ChannelTrace::new(
            id,
            samples,
            spec.sample_rate as f64,
            start_time,
        )?);
    }

    log::debug!(
        "Ingested {} channels x {} samples at {} Hz ({:.3} s)",
        channels,
        frame_count,
        spec.sample_rate,
        traces.first().map_or(0.0, ChannelTrace::duration_secs)
    );

    Ok(traces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hound::{WavSpec, WavWriter};
    use std::fs;
    use tempfile::TempDir;

    fn write_wav(spec: WavSpec, frames: &[[i16; 2]]) -> Vec<u8> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("input.wav");

        let mut writer = WavWriter::create(&path, spec).unwrap();
        for frame in frames {
            for &s in frame {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();

        fs::read(&path).unwrap()
    }

    #[test]
    fn test_ingest_deinterleaves_channels() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let bytes = write_wav(spec, &[[16384, -16384], [0, 8192], [-32768, 0]]);
        let start = Utc.with_ymd_and_hms(2022, 3, 23, 10, 0, 0).unwrap();

        let traces = ingest_wav(&bytes, "8R", "V", start).unwrap();

        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].samples, vec![0.5, 0.0, -1.0]);
        assert_eq!(traces[1].samples, vec![-0.5, 0.25, 0.0]);
        assert_eq!(traces[1].id.to_string(), "8R.V..002");
        assert_eq!(traces[0].sampling_rate, 48000.0);
        assert_eq!(traces[0].start_time, start);
    }

    #[test]
    fn test_ingest_rejects_garbage() {
        let start = Utc.with_ymd_and_hms(2022, 3, 23, 10, 0, 0).unwrap();
        let result = ingest_wav(b"not a wav file", "8R", "V", start);
        assert!(matches!(result, Err(WaveformError::WavReadError(_))));
    }
}
