// Scoring types
// Events keyed by representative time, match records and the scorer's errors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::picker::Pick;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Invalid scoring configuration: {0}")]
    InvalidConfig(String),

    #[error("{collection} events are not sorted by representative time at index {index}")]
    UnsortedEvents {
        collection: &'static str,
        index: usize,
    },

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Seconds since the Unix epoch, keeping sub-second precision
pub fn epoch_seconds(time: &DateTime<Utc>) -> f64 {
    time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9
}

/// `later - earlier` in seconds, exact to the nanosecond for spans under ~292 years
pub fn seconds_between(later: &DateTime<Utc>, earlier: &DateTime<Utc>) -> f64 {
    match (*later - *earlier).num_nanoseconds() {
        Some(ns) => ns as f64 * 1e-9,
        None => epoch_seconds(later) - epoch_seconds(earlier),
    }
}

/// One seismic event with its per-channel P picks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,

    /// Mean epoch time of the picks on the averaging channels
    pub representative_time: f64,

    /// Pick time per channel number
    pub picks: BTreeMap<u32, DateTime<Utc>>,
}

impl Event {
    /// Event with an externally chosen representative time
    pub fn with_time(
        id: impl Into<String>,
        representative_time: f64,
        picks: BTreeMap<u32, DateTime<Utc>>,
    ) -> Self {
        Event {
            id: id.into(),
            representative_time,
            picks,
        }
    }

    /// Event whose representative time is the mean of its picks on
    /// `averaging` channels; `None` if it has no pick on any of them
    pub fn from_picks(
        id: impl Into<String>,
        picks: BTreeMap<u32, DateTime<Utc>>,
        averaging: &[u32],
    ) -> Option<Self> {
        let representative_time = average_time(&picks, averaging)?;
        Some(Event::with_time(id, representative_time, picks))
    }

    /// Event built from picker output; channel codes must be channel numbers
    /// (`"016"`, `"16"`), anything else is left out
    pub fn from_detections(
        id: impl Into<String>,
        detections: &[Pick],
        averaging: &[u32],
    ) -> Option<Self> {
        let mut picks = BTreeMap::new();
        for pick in detections {
            match pick.waveform_id.channel.parse::<u32>() {
                Ok(ch) => {
                    picks.insert(ch, pick.time);
                }
                Err(_) => log::debug!(
                    "Skipping pick on {}: channel code is not a number",
                    pick.waveform_id
                ),
            }
        }

        Event::from_picks(id, picks, averaging)
    }
}

/// Mean epoch time of the picks on `averaging` channels
pub fn average_time(picks: &BTreeMap<u32, DateTime<Utc>>, averaging: &[u32]) -> Option<f64> {
    let times: Vec<f64> = picks
        .iter()
        .filter(|(ch, _)| averaging.contains(ch))
        .map(|(_, t)| epoch_seconds(t))
        .collect();

    if times.is_empty() {
        None
    } else {
        Some(times.iter().sum::<f64>() / times.len() as f64)
    }
}

/// Classification of one step of the matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Automatic event within tolerance of a reference event
    #[serde(rename = "OK")]
    Matched,

    /// Reference event with no automatic counterpart
    #[serde(rename = "missed")]
    Missed,

    /// Automatic event with no reference counterpart
    #[serde(rename = "false")]
    FalsePositive,
}

/// Timing error of one channel present in both events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDiff {
    pub ch: u32,

    /// Reference pick time, epoch seconds
    pub ref_time: f64,

    /// Automatic minus reference pick time, seconds
    pub diff: f64,
}

/// Channel-level comparison of two matched events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickComparison {
    /// Channels picked in both
    #[serde(rename = "OK")]
    pub ok: usize,

    /// Channels picked only in the reference
    pub missed: Vec<u32>,

    /// Channels picked only automatically
    #[serde(rename = "false")]
    pub false_positive: Vec<u32>,

    pub diffs: Vec<ChannelDiff>,
}

/// One entry of the match details listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(rename = "i")]
    pub index: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_time: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dug_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dug_avrg: Option<f64>,

    #[serde(rename = "match")]
    pub status: MatchStatus,

    /// Automatic minus reference representative time, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_diff: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub picks: Option<PickComparison>,
}

impl MatchRecord {
    pub fn matched(
        index: usize,
        reference: &Event,
        automatic: &Event,
        picks: PickComparison,
    ) -> Self {
        MatchRecord {
            index,
            ref_id: Some(reference.id.clone()),
            ref_time: Some(reference.representative_time),
            dug_id: Some(automatic.id.clone()),
            dug_avrg: Some(automatic.representative_time),
            status: MatchStatus::Matched,
            time_diff: Some(automatic.representative_time - reference.representative_time),
            picks: Some(picks),
        }
    }

    pub fn missed(index: usize, reference: &Event) -> Self {
        MatchRecord {
            index,
            ref_id: Some(reference.id.clone()),
            ref_time: Some(reference.representative_time),
            dug_id: None,
            dug_avrg: None,
            status: MatchStatus::Missed,
            time_diff: None,
            picks: None,
        }
    }

    pub fn false_positive(index: usize, automatic: &Event) -> Self {
        MatchRecord {
            index,
            ref_id: None,
            ref_time: None,
            dug_id: Some(automatic.id.clone()),
            dug_avrg: Some(automatic.representative_time),
            status: MatchStatus::FalsePositive,
            time_diff: None,
            picks: None,
        }
    }
}
