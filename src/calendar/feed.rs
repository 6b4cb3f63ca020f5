//! iCalendar feed parsing.
//!
//! Booking platforms export one feed per property containing concrete
//! reservation blocks as `VEVENT`s. The parser tolerates the mess real feeds
//! carry: folded lines, missing `DTEND`, date-time stamps on what are really
//! whole-night blocks. A malformed event is skipped and recorded as a
//! warning; only a feed with no calendar envelope at all is an error.
//!
//! Recurrence expansion is out of scope: exported reservation feeds contain
//! single concrete occurrences, not recurrence rules. An `RRULE` is noted as
//! a warning and the base occurrence kept.

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::error::{CalendarError, Result};

/// A single occupied span on one property's calendar.
///
/// Derived from the feed on each check, never persisted. `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub all_day: bool,
    /// Reservation title, when the feed carries one.
    pub summary: Option<String>,
}

/// Result of parsing one feed.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub events: Vec<CalendarEvent>,
    /// Per-event parse problems. Accumulated, never fatal.
    pub warnings: Vec<String>,
}

/// Parse a raw iCalendar feed into events.
///
/// Fails with `FeedUnreadable` only when the text has no `BEGIN:VCALENDAR`
/// envelope; individual corrupt events are skipped with a warning.
pub fn parse_feed(feed_text: &str) -> Result<ParsedFeed> {
    let lines = unfold_lines(feed_text);

    if !lines.iter().any(|l| l.trim() == "BEGIN:VCALENDAR") {
        return Err(CalendarError::FeedUnreadable(
            "no BEGIN:VCALENDAR envelope found".to_string(),
        )
        .into());
    }

    let mut events = Vec::new();
    let mut warnings = Vec::new();
    let mut current: Option<EventBuilder> = None;

    for line in &lines {
        let line = line.trim_end();
        if line == "BEGIN:VEVENT" {
            current = Some(EventBuilder::default());
            continue;
        }
        if line == "END:VEVENT" {
            if let Some(builder) = current.take() {
                match builder.finish() {
                    Ok(event) => events.push(event),
                    Err(reason) => warnings.push(reason),
                }
            }
            continue;
        }

        let Some(builder) = current.as_mut() else {
            continue;
        };
        let Some((name, params, value)) = split_content_line(line) else {
            continue;
        };

        match name {
            "DTSTART" => match parse_ical_date(value) {
                Some((date, date_only)) => {
                    builder.start = Some(date);
                    builder.all_day = date_only;
                }
                None => builder.bad_field = Some(format!("unparseable DTSTART: {value}")),
            },
            "DTEND" => match parse_ical_date(value) {
                Some((date, _)) => builder.end = Some(date),
                None => builder.bad_field = Some(format!("unparseable DTEND: {value}")),
            },
            "SUMMARY" => builder.summary = Some(value.to_string()),
            "RRULE" => {
                warnings.push(format!(
                    "recurrence rule not expanded, keeping base occurrence: {value}"
                ));
            }
            _ => {}
        }
        let _ = params;
    }

    debug!(
        events = events.len(),
        warnings = warnings.len(),
        "parsed calendar feed"
    );
    Ok(ParsedFeed { events, warnings })
}

#[derive(Default)]
struct EventBuilder {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    all_day: bool,
    summary: Option<String>,
    bad_field: Option<String>,
}

impl EventBuilder {
    fn finish(self) -> std::result::Result<CalendarEvent, String> {
        if let Some(reason) = self.bad_field {
            return Err(reason);
        }
        let start = self.start.ok_or_else(|| "event without DTSTART".to_string())?;
        // Missing DTEND means a one-day block.
        let end = self.end.unwrap_or(start + Duration::days(1));
        if end <= start {
            return Err(format!("event with non-positive span: {start}..{end}"));
        }
        Ok(CalendarEvent {
            start,
            end,
            all_day: self.all_day,
            summary: self.summary,
        })
    }
}

/// Undo RFC 5545 line folding: a line starting with space or tab continues
/// the previous line.
fn unfold_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        if (raw.starts_with(' ') || raw.starts_with('\t')) && !lines.is_empty() {
            if let Some(last) = lines.last_mut() {
                last.push_str(&raw[1..]);
            }
        } else {
            lines.push(raw.to_string());
        }
    }
    lines
}

/// Split `NAME;PARAM=X;PARAM=Y:VALUE` into (name, params, value).
fn split_content_line(line: &str) -> Option<(&str, Option<&str>, &str)> {
    let (head, value) = line.split_once(':')?;
    match head.split_once(';') {
        Some((name, params)) => Some((name, Some(params), value)),
        None => Some((head, None, value)),
    }
}

/// Parse an iCalendar date or date-time value to a calendar date.
///
/// Date-times (`20250310T140000Z`, with or without zone suffix) are truncated
/// to their date: reservation feeds block whole nights, and availability is
/// answered at day granularity. Returns the date and whether the value was
/// date-only.
fn parse_ical_date(value: &str) -> Option<(NaiveDate, bool)> {
    let value = value.trim();
    let (date_part, date_only) = match value.split_once('T') {
        Some((d, _)) => (d, false),
        None => (value, true),
    };
    NaiveDate::parse_from_str(date_part, "%Y%m%d")
        .ok()
        .map(|d| (d, date_only))
}
