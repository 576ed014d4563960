// Picker types
// Pick records emitted by the picker and the errors a channel pipeline can raise

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::executor::ExecutorError;
use crate::waveform::ChannelId;

/// Method identity written into every pick (filter-bank kurtosis)
pub const METHOD_ID: &str = "FBKT";

/// Phase label of every pick; the picker only looks for first arrivals
pub const PHASE_HINT: &str = "P";

#[derive(Debug, Error)]
pub enum PickerError {
    #[error("Invalid picker configuration: {0}")]
    InvalidConfig(String),

    #[error("No octave band fits below Nyquist ({nyquist} Hz) for freqmin {freqmin} Hz")]
    NoBands { freqmin: f64, nyquist: f64 },

    #[error("Band corner {low} Hz is not below Nyquist ({nyquist} Hz)")]
    CornerAboveNyquist { low: f64, nyquist: f64 },

    #[error("Trace too short: {needed} samples needed, {available} available")]
    InsufficientSamples { needed: usize, available: usize },

    #[error("Trace has no samples")]
    EmptyTrace,

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// How a pick was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    Automatic,
}

/// A P-wave onset on one channel
///
/// Only built once a candidate has passed the SNR gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    /// Resource id, derived from channel and time so reruns reproduce it
    pub id: Uuid,

    /// Absolute onset time
    pub time: DateTime<Utc>,

    /// Channel the onset was picked on
    pub waveform_id: ChannelId,

    pub method_id: String,

    pub phase_hint: String,

    pub evaluation_mode: EvaluationMode,

    /// Signal-to-noise ratio measured by the gate
    pub snr: f64,
}

impl Pick {
    /// Create an automatic P pick
    pub fn automatic(waveform_id: ChannelId, time: DateTime<Utc>, snr: f64) -> Self {
        let name = format!("{}/{}/{}", METHOD_ID, waveform_id, time.to_rfc3339());
        Pick {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()),
            time,
            waveform_id,
            method_id: METHOD_ID.to_string(),
            phase_hint: PHASE_HINT.to_string(),
            evaluation_mode: EvaluationMode::Automatic,
            snr,
        }
    }
}
