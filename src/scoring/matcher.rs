// Event matcher
// Two-cursor walk over reference and automatic events sorted by representative time

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::scoring::config::MatchConfig;
use crate::scoring::types::{
    epoch_seconds, seconds_between, ChannelDiff, Event, MatchRecord, PickComparison, ScoringError,
};

/// Compare the picks of two matched events on the `compare` channels
pub fn compare_picks(
    reference: &BTreeMap<u32, DateTime<Utc>>,
    automatic: &BTreeMap<u32, DateTime<Utc>>,
    compare: &[u32],
) -> PickComparison {
    let mut comparison = PickComparison::default();

    for (&ch, ref_time) in reference.iter().filter(|(ch, _)| compare.contains(ch)) {
        match automatic.get(&ch) {
            Some(auto_time) => {
                comparison.ok += 1;
                comparison.diffs.push(ChannelDiff {
                    ch,
                    ref_time: epoch_seconds(ref_time),
                    diff: seconds_between(auto_time, ref_time),
                });
            }
            None => comparison.missed.push(ch),
        }
    }

    comparison.false_positive = automatic
        .keys()
        .filter(|ch| compare.contains(ch) && !reference.contains_key(ch))
        .copied()
        .collect();

    comparison
}

/// Fail unless representative times never decrease
pub fn check_order(events: &[Event], collection: &'static str) -> Result<(), ScoringError> {
    for (index, pair) in events.windows(2).enumerate() {
        let (prev, cur) = (pair[0].representative_time, pair[1].representative_time);
        if matches!(prev.partial_cmp(&cur), Some(Ordering::Greater) | None) {
            return Err(ScoringError::UnsortedEvents {
                collection,
                index: index + 1,
            });
        }
    }
    Ok(())
}

/// Align automatic events with reference events
///
/// Each step compares the next event of both sequences. Events whose
/// representative times differ by at most `max_diff` are matched and both
/// cursors advance; otherwise the earlier one is reported alone (an early
/// automatic event as false, an early reference event as missed). Every
/// event appears in exactly one record.
pub fn match_events(
    reference: &[Event],
    automatic: &[Event],
    config: &MatchConfig,
) -> Result<Vec<MatchRecord>, ScoringError> {
    config.validate()?;
    check_order(reference, "reference")?;
    check_order(automatic, "automatic")?;

    let mut records = Vec::with_capacity(reference.len().max(automatic.len()));
    let (mut i_ref, mut i_auto) = (0, 0);

    while i_ref < reference.len() || i_auto < automatic.len() {
        let index = records.len();

        let diff = match (reference.get(i_ref), automatic.get(i_auto)) {
            (Some(r), Some(a)) => a.representative_time - r.representative_time,
            (None, Some(_)) => f64::NEG_INFINITY,
            (Some(_), None) => f64::INFINITY,
            (None, None) => break,
        };

        if diff.abs() <= config.max_diff {
            let (r, a) = (&reference[i_ref], &automatic[i_auto]);
            let picks = compare_picks(&r.picks, &a.picks, &config.compare_channels);
            records.push(MatchRecord::matched(index, r, a, picks));
            i_ref += 1;
            i_auto += 1;
        } else if diff < 0.0 {
            records.push(MatchRecord::false_positive(index, &automatic[i_auto]));
            i_auto += 1;
        } else {
            records.push(MatchRecord::missed(index, &reference[i_ref]));
            i_ref += 1;
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::types::MatchStatus;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn at(secs: f64) -> DateTime<Utc> {
        Utc.timestamp_nanos((secs * 1e9).round() as i64)
    }

    fn event(id: &str, t: f64) -> Event {
        Event::with_time(id, t, BTreeMap::new())
    }

    fn count(records: &[MatchRecord], status: MatchStatus) -> usize {
        records.iter().filter(|r| r.status == status).count()
    }

    #[test]
    fn test_match_within_tolerance() {
        let records = match_events(
            &[event("R1", 100.0)],
            &[event("A1", 100.005)],
            &MatchConfig::default(),
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, MatchStatus::Matched);
        assert_eq!(records[0].ref_id.as_deref(), Some("R1"));
        assert_eq!(records[0].dug_id.as_deref(), Some("A1"));
        assert_relative_eq!(records[0].time_diff.unwrap(), 0.005, epsilon = 1e-9);
    }

    #[test]
    fn test_miss_and_false_positive() {
        let records = match_events(
            &[event("R1", 100.0)],
            &[event("A1", 500.0)],
            &MatchConfig::default(),
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, MatchStatus::Missed);
        assert_eq!(records[0].ref_id.as_deref(), Some("R1"));
        assert_eq!(records[1].status, MatchStatus::FalsePositive);
        assert_eq!(records[1].dug_id.as_deref(), Some("A1"));
        assert_eq!(records[1].index, 1);
    }

    #[test]
    fn test_exact_tolerance_is_a_match() {
        let config = MatchConfig {
            max_diff: 0.5,
            ..Default::default()
        };
        let records = match_events(&[event("R1", 10.0)], &[event("A1", 10.5)], &config).unwrap();
        assert_eq!(records[0].status, MatchStatus::Matched);
    }

    #[test]
    fn test_early_automatic_event_is_false() {
        let records = match_events(
            &[event("R1", 100.0)],
            &[event("A0", 50.0), event("A1", 100.001)],
            &MatchConfig::default(),
        )
        .unwrap();

        let statuses: Vec<_> = records.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![MatchStatus::FalsePositive, MatchStatus::Matched]);
    }

    #[test]
    fn test_every_event_visited_once() {
        let reference: Vec<Event> = [1.0, 2.0, 3.0, 7.0, 9.0, 9.004]
            .iter()
            .enumerate()
            .map(|(i, &t)| event(&format!("R{}", i), t))
            .collect();
        let automatic: Vec<Event> = [0.5, 2.003, 3.5, 7.0, 8.0, 9.005, 12.0]
            .iter()
            .enumerate()
            .map(|(i, &t)| event(&format!("A{}", i), t))
            .collect();

        let records = match_events(&reference, &automatic, &MatchConfig::default()).unwrap();
        let matched = count(&records, MatchStatus::Matched);
        let missed = count(&records, MatchStatus::Missed);
        let false_positive = count(&records, MatchStatus::FalsePositive);

        assert_eq!(matched + missed, reference.len());
        assert_eq!(matched + false_positive, automatic.len());
        assert_eq!(matched, 3);
        assert!(records.iter().enumerate().all(|(i, r)| r.index == i));
    }

    #[test]
    fn test_empty_inputs() {
        let config = MatchConfig::default();
        assert!(match_events(&[], &[], &config).unwrap().is_empty());

        let only_auto = match_events(&[], &[event("A1", 1.0)], &config).unwrap();
        assert_eq!(only_auto[0].status, MatchStatus::FalsePositive);

        let only_ref = match_events(&[event("R1", 1.0)], &[], &config).unwrap();
        assert_eq!(only_ref[0].status, MatchStatus::Missed);
    }

    #[test]
    fn test_unsorted_input_is_reported() {
        let result = match_events(
            &[event("R1", 5.0), event("R2", 4.0)],
            &[],
            &MatchConfig::default(),
        );
        assert!(matches!(
            result,
            Err(ScoringError::UnsortedEvents {
                collection: "reference",
                index: 1,
            })
        ));

        let result = match_events(
            &[],
            &[event("A1", f64::NAN), event("A2", 1.0)],
            &MatchConfig::default(),
        );
        assert!(matches!(
            result,
            Err(ScoringError::UnsortedEvents {
                collection: "automatic",
                ..
            })
        ));
    }

    #[test]
    fn test_compare_picks() {
        let mut reference = BTreeMap::new();
        reference.insert(4, at(100.0));
        reference.insert(16, at(100.0002));
        reference.insert(17, at(100.0004));
        reference.insert(30, at(100.0));

        let mut automatic = BTreeMap::new();
        automatic.insert(16, at(100.0003));
        automatic.insert(17, at(100.0004));
        automatic.insert(25, at(100.0));
        automatic.insert(31, at(100.0));

        let comparison = compare_picks(&reference, &automatic, &[4, 16, 17, 25]);

        assert_eq!(comparison.ok, 2);
        assert_eq!(comparison.missed, vec![4]);
        assert_eq!(comparison.false_positive, vec![25]);
        assert_eq!(comparison.diffs[0].ch, 16);
        assert_relative_eq!(comparison.diffs[0].diff, 0.0001, epsilon = 1e-9);
        assert_eq!(comparison.diffs[1].diff, 0.0);
    }
}
