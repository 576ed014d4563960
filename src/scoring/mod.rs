// Scoring module
// Matches automatic events against a manually picked reference and reports timing accuracy

pub mod catalog;
pub mod config;
pub mod export;
pub mod matcher;
pub mod report;
pub mod types;

pub use catalog::{parse_automatic, parse_reference, parse_time};
pub use config::MatchConfig;
pub use export::{read_details, ReportWriter};
pub use matcher::{check_order, compare_picks, match_events};
pub use report::{score, MatchStatistics, PicksInAim, ScoreReport};
pub use types::{
    average_time, epoch_seconds, seconds_between, ChannelDiff, Event, MatchRecord, MatchStatus,
    PickComparison, ScoringError,
};
