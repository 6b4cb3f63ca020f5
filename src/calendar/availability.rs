//! Date-range occupancy over a property's calendar.
//!
//! Events from the feed are reduced to a [`BusySet`] — a minimal ordered
//! sequence of disjoint intervals — and a requested stay is tested against it
//! with half-open overlap arithmetic. The engine wraps feed retrieval with a
//! caller-boundable timeout; when the feed cannot be fetched or parsed, the
//! caller gets an error, never a guessed verdict.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CalendarError, Result};

use super::feed::{parse_feed, CalendarEvent};

// ============================================================================
// Date ranges
// ============================================================================

/// A half-open date range `[start, end)`.
///
/// Used both for the guest's requested stay and for busy intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Construct a range, enforcing `start < end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(CalendarError::InvalidRange { start, end }.into())
        }
    }

    /// Number of nights covered by the range.
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Standard half-open overlap test. Touching endpoints do not overlap:
    /// a checkout date equal to the next check-in is not a conflict.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The overlap of two ranges, clipped to both, if any.
    pub fn intersection(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end {
            Some(DateRange { start, end })
        } else {
            None
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Busy set
// ============================================================================

/// A property's occupied intervals, reduced to minimal form.
///
/// Invariant after reduction: sorted ascending by start, pairwise disjoint
/// with a strictly positive gap between consecutive intervals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BusySet {
    intervals: Vec<DateRange>,
}

impl BusySet {
    /// Reduce raw events to the minimal disjoint sequence.
    ///
    /// Sort by start, then sweep: `next.start <= current.end` merges — the
    /// boundary is inclusive so back-to-back reservations coalesce into one
    /// span instead of leaving a zero-length gap.
    pub fn from_events(events: &[CalendarEvent]) -> Self {
        let mut spans: Vec<DateRange> = events
            .iter()
            .map(|e| DateRange {
                start: e.start,
                end: e.end,
            })
            .collect();
        spans.sort_by_key(|r| (r.start, r.end));

        let mut intervals: Vec<DateRange> = Vec::with_capacity(spans.len());
        for span in spans {
            match intervals.last_mut() {
                Some(last) if span.start <= last.end => {
                    last.end = last.end.max(span.end);
                }
                _ => intervals.push(span),
            }
        }

        Self { intervals }
    }

    /// The reduced intervals, ascending.
    pub fn intervals(&self) -> &[DateRange] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Test a requested stay against the busy intervals.
    ///
    /// Occupied when any interval overlaps the range; conflicts are the
    /// overlapping intervals clipped to the range's bounds, ascending.
    pub fn check(&self, range: &DateRange) -> Verdict {
        let conflicts: Vec<DateRange> = self
            .intervals
            .iter()
            .filter_map(|iv| iv.intersection(range))
            .collect();

        if conflicts.is_empty() {
            Verdict::Free
        } else {
            Verdict::Occupied { conflicts }
        }
    }
}

/// The availability engine's answer for a requested range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Free,
    Occupied { conflicts: Vec<DateRange> },
}

// ============================================================================
// Feed sources and the engine
// ============================================================================

/// Transport seam for retrieving a property's raw feed text.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// HTTP feed source.
pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFeedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CalendarError::FeedFetch(e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| CalendarError::FeedFetch(e.to_string()))?;
        response
            .text()
            .await
            .map_err(|e| CalendarError::FeedFetch(e.to_string()).into())
    }
}

/// Outcome of a full fetch-parse-check cycle.
#[derive(Debug, Clone)]
pub struct AvailabilityCheck {
    pub verdict: Verdict,
    /// Per-event feed parse warnings encountered along the way.
    pub warnings: Vec<String>,
}

/// Fetches a property's feed, reduces it, and answers range queries.
pub struct AvailabilityEngine {
    source: Box<dyn FeedSource>,
    timeout: std::time::Duration,
}

impl AvailabilityEngine {
    pub fn new(source: Box<dyn FeedSource>, timeout: std::time::Duration) -> Self {
        Self { source, timeout }
    }

    /// Fetch the feed at `url` and test `range` against it.
    ///
    /// The fetch is bounded by the engine's timeout; on expiry this fails
    /// with `FeedTimeout` — distinct from `FeedUnreadable` — so the caller
    /// can report inability to verify instead of guessing.
    pub async fn check(&self, url: &str, range: &DateRange) -> Result<AvailabilityCheck> {
        let feed_text = tokio::time::timeout(self.timeout, self.source.fetch(url))
            .await
            .map_err(|_| {
                warn!(url, "calendar feed fetch timed out");
                CalendarError::FeedTimeout(self.timeout.as_millis() as u64)
            })??;

        let parsed = parse_feed(&feed_text)?;
        for warning in &parsed.warnings {
            warn!(url, warning = %warning, "calendar feed event warning");
        }

        let busy = BusySet::from_events(&parsed.events);
        let verdict = busy.check(range);
        debug!(url, %range, free = matches!(verdict, Verdict::Free), "availability check");

        Ok(AvailabilityCheck {
            verdict,
            warnings: parsed.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn range(s: (i32, u32, u32), e: (i32, u32, u32)) -> DateRange {
        DateRange::new(date(s.0, s.1, s.2), date(e.0, e.1, e.2)).unwrap()
    }

    fn event(s: (i32, u32, u32), e: (i32, u32, u32)) -> CalendarEvent {
        CalendarEvent {
            start: date(s.0, s.1, s.2),
            end: date(e.0, e.1, e.2),
            all_day: true,
            summary: None,
        }
    }

    #[test]
    fn test_range_rejects_inverted() {
        assert!(DateRange::new(date(2025, 3, 12), date(2025, 3, 10)).is_err());
        assert!(DateRange::new(date(2025, 3, 10), date(2025, 3, 10)).is_err());
    }

    #[test]
    fn test_adjacent_events_merge() {
        let busy = BusySet::from_events(&[
            event((2025, 3, 10), (2025, 3, 12)),
            event((2025, 3, 12), (2025, 3, 14)),
        ]);
        assert_eq!(busy.intervals(), &[range((2025, 3, 10), (2025, 3, 14))]);
    }

    #[test]
    fn test_overlapping_and_contained_events_merge() {
        let busy = BusySet::from_events(&[
            event((2025, 3, 10), (2025, 3, 15)),
            event((2025, 3, 12), (2025, 3, 13)),
            event((2025, 3, 14), (2025, 3, 20)),
            event((2025, 4, 1), (2025, 4, 2)),
        ]);
        assert_eq!(
            busy.intervals(),
            &[
                range((2025, 3, 10), (2025, 3, 20)),
                range((2025, 4, 1), (2025, 4, 2)),
            ]
        );
    }

    #[test]
    fn test_reduction_is_idempotent() {
        let busy = BusySet::from_events(&[
            event((2025, 3, 10), (2025, 3, 12)),
            event((2025, 3, 12), (2025, 3, 14)),
            event((2025, 5, 1), (2025, 5, 3)),
        ]);
        let events: Vec<CalendarEvent> = busy
            .intervals()
            .iter()
            .map(|r| CalendarEvent {
                start: r.start,
                end: r.end,
                all_day: true,
                summary: None,
            })
            .collect();
        assert_eq!(BusySet::from_events(&events), busy);
    }

    #[test]
    fn test_partial_overlap_right() {
        // busy [Mar 10, Mar 12); range [Mar 11, Mar 13) -> conflict clipped
        let busy = BusySet::from_events(&[event((2025, 3, 10), (2025, 3, 12))]);
        let verdict = busy.check(&range((2025, 3, 11), (2025, 3, 13)));
        assert_eq!(
            verdict,
            Verdict::Occupied {
                conflicts: vec![range((2025, 3, 11), (2025, 3, 12))]
            }
        );
    }

    #[test]
    fn test_partial_overlap_left() {
        // busy [Mar 10, Mar 12); range [Mar 9, Mar 11) -> conflict clipped
        let busy = BusySet::from_events(&[event((2025, 3, 10), (2025, 3, 12))]);
        let verdict = busy.check(&range((2025, 3, 9), (2025, 3, 11)));
        assert_eq!(
            verdict,
            Verdict::Occupied {
                conflicts: vec![range((2025, 3, 10), (2025, 3, 11))]
            }
        );
    }

    #[test]
    fn test_touching_end_is_free() {
        let busy = BusySet::from_events(&[event((2025, 3, 10), (2025, 3, 12))]);
        assert_eq!(busy.check(&range((2025, 3, 12), (2025, 3, 15))), Verdict::Free);
    }

    #[test]
    fn test_disjoint_before_is_free() {
        let busy = BusySet::from_events(&[event((2025, 3, 10), (2025, 3, 12))]);
        assert_eq!(busy.check(&range((2025, 3, 8), (2025, 3, 9))), Verdict::Free);
    }

    #[test]
    fn test_range_containing_busy_reports_full_interval() {
        let busy = BusySet::from_events(&[event((2025, 3, 10), (2025, 3, 12))]);
        let verdict = busy.check(&range((2025, 3, 9), (2025, 3, 13)));
        assert_eq!(
            verdict,
            Verdict::Occupied {
                conflicts: vec![range((2025, 3, 10), (2025, 3, 12))]
            }
        );
    }

    #[test]
    fn test_range_inside_busy() {
        let busy = BusySet::from_events(&[event((2025, 3, 10), (2025, 3, 20))]);
        let verdict = busy.check(&range((2025, 3, 12), (2025, 3, 14)));
        assert_eq!(
            verdict,
            Verdict::Occupied {
                conflicts: vec![range((2025, 3, 12), (2025, 3, 14))]
            }
        );
    }

    #[test]
    fn test_conflicts_ascending_across_intervals() {
        let busy = BusySet::from_events(&[
            event((2025, 3, 10), (2025, 3, 12)),
            event((2025, 3, 15), (2025, 3, 17)),
        ]);
        let verdict = busy.check(&range((2025, 3, 11), (2025, 3, 16)));
        assert_eq!(
            verdict,
            Verdict::Occupied {
                conflicts: vec![
                    range((2025, 3, 11), (2025, 3, 12)),
                    range((2025, 3, 15), (2025, 3, 16)),
                ]
            }
        );
    }

    struct StaticFeed(&'static str);

    #[async_trait]
    impl FeedSource for StaticFeed {
        async fn fetch(&self, _url: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct HangingFeed;

    #[async_trait]
    impl FeedSource for HangingFeed {
        async fn fetch(&self, _url: &str) -> Result<String> {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    const FEED: &str = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\n\
DTSTART;VALUE=DATE:20250310\n\
DTEND;VALUE=DATE:20250312\n\
END:VEVENT\n\
END:VCALENDAR\n";

    #[tokio::test]
    async fn test_engine_end_to_end() {
        let engine = AvailabilityEngine::new(
            Box::new(StaticFeed(FEED)),
            std::time::Duration::from_secs(5),
        );

        let check = engine
            .check("https://example.test/feed.ics", &range((2025, 3, 11), (2025, 3, 13)))
            .await
            .unwrap();
        assert!(matches!(check.verdict, Verdict::Occupied { .. }));

        let check = engine
            .check("https://example.test/feed.ics", &range((2025, 3, 12), (2025, 3, 14)))
            .await
            .unwrap();
        assert_eq!(check.verdict, Verdict::Free);
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_timeout_is_feed_timeout() {
        let engine = AvailabilityEngine::new(
            Box::new(HangingFeed),
            std::time::Duration::from_millis(100),
        );

        let err = engine
            .check("https://example.test/feed.ics", &range((2025, 3, 11), (2025, 3, 13)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::InnkeepError::Calendar(CalendarError::FeedTimeout(_))
        ));
    }
}
