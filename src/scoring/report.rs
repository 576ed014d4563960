// Scoring report
// Aggregate counts, per-channel timing errors and on-target rates over match records

use serde::Serialize;
use std::collections::BTreeMap;

use crate::scoring::config::MatchConfig;
use crate::scoring::matcher::match_events;
use crate::scoring::types::{Event, MatchRecord, MatchStatus, ScoringError};

/// Per-channel count of timing differences within the aim tolerance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PicksInAim {
    pub sum: usize,

    #[serde(flatten)]
    pub per_channel: BTreeMap<u32, usize>,
}

/// Summary statistics of one scoring run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchStatistics {
    pub max_diff: f64,

    #[serde(rename = "OK")]
    pub matched: usize,

    pub missed: usize,

    #[serde(rename = "false")]
    pub false_positive: usize,

    /// Automatic minus reference pick time of every matched pick, per channel
    pub diffs: BTreeMap<u32, Vec<f64>>,

    /// Matched events over reference events, percent, one decimal
    pub ok_percentage: f64,

    /// Number of matched individual picks
    pub sum_picks: usize,

    pub picks_in_aim: PicksInAim,

    /// `picks_in_aim.sum` over `sum_picks`, percent, one decimal
    pub picks_in_aim_percentage: f64,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl MatchStatistics {
    pub fn from_records(
        records: &[MatchRecord],
        reference_count: usize,
        config: &MatchConfig,
    ) -> Self {
        let mut diffs: BTreeMap<u32, Vec<f64>> = config
            .compare_channels
            .iter()
            .map(|&ch| (ch, Vec::new()))
            .collect();

        let mut matched = 0;
        let mut missed = 0;
        let mut false_positive = 0;

        for record in records {
            match record.status {
                MatchStatus::Matched => {
                    matched += 1;
                    if let Some(picks) = &record.picks {
                        for d in &picks.diffs {
                            diffs.entry(d.ch).or_default().push(d.diff);
                        }
                    }
                }
                MatchStatus::Missed => missed += 1,
                MatchStatus::FalsePositive => false_positive += 1,
            }
        }

        let sum_picks = diffs.values().map(Vec::len).sum();

        let mut picks_in_aim = PicksInAim::default();
        for (&ch, values) in &diffs {
            let in_aim = values
                .iter()
                .filter(|d| d.abs() <= config.aim_tolerance)
                .count();
            picks_in_aim.per_channel.insert(ch, in_aim);
            picks_in_aim.sum += in_aim;
        }

        MatchStatistics {
            max_diff: config.max_diff,
            matched,
            missed,
            false_positive,
            diffs,
            ok_percentage: round_one_decimal(percent(matched, reference_count)),
            sum_picks,
            picks_in_aim_percentage: round_one_decimal(percent(picks_in_aim.sum, sum_picks)),
            picks_in_aim,
        }
    }
}

/// Statistics plus the per-event details they were computed from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub statistics: MatchStatistics,
    pub details: Vec<MatchRecord>,
    reference_count: usize,
}

impl ScoreReport {
    /// Matched over reference events, percent, unrounded; 0 without reference events
    pub fn match_rate(&self) -> f64 {
        percent(self.statistics.matched, self.reference_count)
    }

    pub fn reference_count(&self) -> usize {
        self.reference_count
    }
}

/// Match automatic events against a reference and summarize the result
pub fn score(
    reference: &[Event],
    automatic: &[Event],
    config: &MatchConfig,
) -> Result<ScoreReport, ScoringError> {
    let details = match_events(reference, automatic, config)?;
    let statistics = MatchStatistics::from_records(&details, reference.len(), config);

    log::info!(
        "Scored {} automatic against {} reference events: {} OK, {} missed, {} false ({}%)",
        automatic.len(),
        reference.len(),
        statistics.matched,
        statistics.missed,
        statistics.false_positive,
        statistics.ok_percentage
    );

    Ok(ScoreReport {
        statistics,
        details,
        reference_count: reference.len(),
    })
}
