// Pick catalogues
// Parsers for the manually picked reference listing and the automatic pick listing

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;

use crate::scoring::types::{Event, ScoringError};

const EVENT_ID_PREFIX: &str = "smi:local/event/";

/// Parse an ISO 8601 timestamp; a missing offset means UTC
pub fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Some(time.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

fn parse_error(line: usize, message: impl Into<String>) -> ScoringError {
    ScoringError::Parse {
        line,
        message: message.into(),
    }
}

fn field<'a>(fields: &[&'a str], index: usize, line: usize) -> Result<&'a str, ScoringError> {
    fields
        .get(index)
        .copied()
        .map(str::trim)
        .ok_or_else(|| parse_error(line, format!("missing column {}", index + 1)))
}

fn time_field(fields: &[&str], index: usize, line: usize) -> Result<DateTime<Utc>, ScoringError> {
    let text = field(fields, index, line)?;
    parse_time(text).ok_or_else(|| parse_error(line, format!("invalid time '{}'", text)))
}

/// Events whose picks touch no averaging channel get no representative time
/// and are dropped
fn finish(
    id: String,
    picks: BTreeMap<u32, DateTime<Utc>>,
    averaging: &[u32],
    events: &mut Vec<Event>,
) {
    match Event::from_picks(id.clone(), picks, averaging) {
        Some(event) => events.push(event),
        None => log::warn!("Event {} has no pick on an averaging channel, skipped", id),
    }
}

/// Parse the tab-separated reference listing
///
/// A row whose second column is not `P` opens an event: its id is the
/// seventh column without the `smi:local/event/` prefix. Each following `P`
/// row adds a pick, time in the third column and channel in the fifth
/// (`R<n>`).
pub fn parse_reference(text: &str, averaging: &[u32]) -> Result<Vec<Event>, ScoringError> {
    let mut events = Vec::new();
    let mut current: Option<(String, BTreeMap<u32, DateTime<Utc>>)> = None;

    for (n, raw) in text.lines().enumerate() {
        let line = n + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = raw.split('\t').collect();

        if field(&fields, 1, line)? == "P" {
            let time = time_field(&fields, 2, line)?;
            let channel = field(&fields, 4, line)?;
            let ch = channel
                .trim_start_matches('R')
                .parse::<u32>()
                .map_err(|_| parse_error(line, format!("invalid channel '{}'", channel)))?;

            match current.as_mut() {
                Some((_, picks)) => {
                    picks.insert(ch, time);
                }
                None => return Err(parse_error(line, "pick before the first event")),
            }
        } else {
            // Validates the origin time even though matching only uses picks
            time_field(&fields, 1, line)?;
            let id = field(&fields, 6, line)?;
            let id = id.strip_prefix(EVENT_ID_PREFIX).unwrap_or(id).to_string();

            if let Some((id, picks)) = current.replace((id, BTreeMap::new())) {
                finish(id, picks, averaging, &mut events);
            }
        }
    }

    if let Some((id, picks)) = current {
        finish(id, picks, averaging, &mut events);
    }

    Ok(events)
}

/// Parse the comma-separated automatic listing: `id,ch,time,ch,time,...`
pub fn parse_automatic(text: &str, averaging: &[u32]) -> Result<Vec<Event>, ScoringError> {
    let mut events = Vec::new();

    for (n, raw) in text.lines().enumerate() {
        let line = n + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
        let id = fields[0].to_string();
        let pairs = &fields[1..];
        if pairs.len() % 2 != 0 {
            return Err(parse_error(line, "channel without a pick time"));
        }

        let mut picks = BTreeMap::new();
        for pair in pairs.chunks(2) {
            let ch = pair[0]
                .parse::<u32>()
                .map_err(|_| parse_error(line, format!("invalid channel '{}'", pair[0])))?;
            let time = parse_time(pair[1])
                .ok_or_else(|| parse_error(line, format!("invalid time '{}'", pair[1])))?;
            picks.insert(ch, time);
        }

        match Event::from_picks(id.clone(), picks, averaging) {
            Some(event) => events.push(event),
            None => log::debug!("Automatic event {} has no pick on an averaging channel", id),
        }
    }

    Ok(events)
}
