//! Stay-date normalization from guest text.
//!
//! Guests describe stays loosely: "next weekend", "from the 10th to the
//! 15th", "March 10 for 3 nights". This module extracts date mentions and
//! resolves them to concrete half-open [`DateRange`]s against a caller-
//! supplied reference date, supporting:
//! - Absolute dates: "2025-03-10", "March 10", "10th of March"
//! - Numeric day/month: "10/3", "10/3 to 15/3"
//! - Explicit ranges: "from the 10th to the 15th", "March 10-15"
//! - Night counts: "from March 10 for 3 nights"
//! - Relative terms: "tomorrow", "this weekend", "next weekend",
//!   weekday names, "in 2 weeks"
//!
//! Ambiguous mentions without a year or month resolve to the nearest future
//! occurrence: guests describe future stays, never past ones. That policy is
//! configurable per deployment.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;

use super::availability::DateRange;

/// Outcome of date normalization.
///
/// `NoDateFound` is a normal, expected outcome for messages with no
/// date-bearing phrase — distinct from a parse failure, which does not exist
/// here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateResolution {
    Ranges(Vec<DateRange>),
    NoDateFound,
}

impl DateResolution {
    /// First resolved range, if any.
    pub fn first(&self) -> Option<&DateRange> {
        match self {
            DateResolution::Ranges(ranges) => ranges.first(),
            DateResolution::NoDateFound => None,
        }
    }
}

/// Resolves loosely specified stay dates against a reference "today".
pub struct StayDateParser {
    reference_date: NaiveDate,
    /// Resolve ambiguous day/month mentions to the nearest future
    /// occurrence. Policy choice, not a universal truth.
    prefer_future: bool,
}

const MONTH_NAMES: [(&str, u32); 23] = [
    ("january", 1),
    ("jan", 1),
    ("february", 2),
    ("feb", 2),
    ("march", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("may", 5),
    ("june", 6),
    ("jun", 6),
    ("july", 7),
    ("jul", 7),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sep", 9),
    ("october", 10),
    ("oct", 10),
    ("november", 11),
    ("nov", 11),
    ("december", 12),
    ("dec", 12),
];

const WEEKDAY_NAMES: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

impl StayDateParser {
    /// Create a parser anchored at `reference_date`, preferring future dates.
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            prefer_future: true,
        }
    }

    /// Create a parser with an explicit ambiguity policy.
    pub fn with_policy(reference_date: NaiveDate, prefer_future: bool) -> Self {
        Self {
            reference_date,
            prefer_future,
        }
    }

    /// Extract and resolve date mentions from guest text.
    ///
    /// Passes run in specificity order — explicit ranges, absolute dates,
    /// numeric dates, relative terms — and the first pass that resolves
    /// anything wins. A single date resolves to a one-night range; a trailing
    /// night count ("for 3 nights") extends it.
    pub fn resolve(&self, text: &str) -> DateResolution {
        let t = normalize(text);

        let ranges = self
            .parse_explicit_ranges(&t)
            .or_else(|| self.parse_absolute_dates(&t))
            .or_else(|| self.parse_numeric_dates(&t))
            .or_else(|| self.parse_relative_dates(&t));

        match ranges {
            Some(ranges) => DateResolution::Ranges(self.apply_night_count(&t, ranges)),
            None => DateResolution::NoDateFound,
        }
    }

    // ========================================================================
    // Pass 1: explicit ranges
    // ========================================================================

    fn parse_explicit_ranges(&self, t: &str) -> Option<Vec<DateRange>> {
        // ISO pair: "2025-03-10 to 2025-03-15"
        let iso_pair = Regex::new(
            r"\b(\d{4}-\d{1,2}-\d{1,2})\s*(?:to|until|through|till|-)\s*(\d{4}-\d{1,2}-\d{1,2})\b",
        )
        .expect("Invalid regex");
        if let Some(cap) = iso_pair.captures(t) {
            let start = NaiveDate::parse_from_str(&cap[1], "%Y-%m-%d").ok();
            let end = NaiveDate::parse_from_str(&cap[2], "%Y-%m-%d").ok();
            if let (Some(start), Some(end)) = (start, end) {
                if let Ok(range) = DateRange::new(start, end) {
                    return Some(vec![range]);
                }
            }
        }

        // "from the 10th to the 15th (of march)" / "from 10 march to 15 march"
        let day_pair = Regex::new(
            r"(?x)
            \bfrom\s+(?:the\s+)?(\d{1,2})(?:st|nd|rd|th)?
            (?:\s+(?:of\s+)?([a-z]+))?
            \s+(?:to|until|through|till)\s+(?:the\s+)?(\d{1,2})(?:st|nd|rd|th)?
            (?:\s+(?:of\s+)?([a-z]+))?\b",
        )
        .expect("Invalid regex");
        if let Some(cap) = day_pair.captures(t) {
            let day1: u32 = cap[1].parse().ok()?;
            let day2: u32 = cap[3].parse().ok()?;
            let month1 = cap.get(2).and_then(|m| month_number(m.as_str()));
            let month2 = cap.get(4).and_then(|m| month_number(m.as_str()));

            if let Some(range) = self.range_from_day_pair(day1, month1, day2, month2) {
                return Some(vec![range]);
            }
        }

        // "march 10-15" / "march 10 to 15"
        let month_first = Regex::new(
            r"\b([a-z]+)\s+(\d{1,2})(?:st|nd|rd|th)?\s*(?:-|to|until|through|till)\s*(\d{1,2})(?:st|nd|rd|th)?\b",
        )
        .expect("Invalid regex");
        if let Some(cap) = month_first.captures(t) {
            if let Some(month) = month_number(&cap[1]) {
                let day1: u32 = cap[2].parse().ok()?;
                let day2: u32 = cap[3].parse().ok()?;
                if let Some(range) = self.range_from_day_pair(day1, Some(month), day2, Some(month))
                {
                    return Some(vec![range]);
                }
            }
        }

        // "10/3 to 15/3" — day-first, as guests outside the US write dates
        let numeric_pair = Regex::new(
            r"\b(\d{1,2})/(\d{1,2})\s*(?:to|until|through|till|-)\s*(\d{1,2})/(\d{1,2})\b",
        )
        .expect("Invalid regex");
        if let Some(cap) = numeric_pair.captures(t) {
            let (d1, m1): (u32, u32) = (cap[1].parse().ok()?, cap[2].parse().ok()?);
            let (d2, m2): (u32, u32) = (cap[3].parse().ok()?, cap[4].parse().ok()?);
            if valid_day_month(d1, m1) && valid_day_month(d2, m2) {
                if let Some(range) = self.range_from_day_pair(d1, Some(m1), d2, Some(m2)) {
                    return Some(vec![range]);
                }
            }
        }

        None
    }

    /// Build a range from two day mentions with optional month names,
    /// inferring missing months and years toward the future.
    fn range_from_day_pair(
        &self,
        day1: u32,
        month1: Option<u32>,
        day2: u32,
        month2: Option<u32>,
    ) -> Option<DateRange> {
        // "from the 10th to the 15th of march": the check-in inherits the
        // checkout's month when only one is named.
        let month1 = month1.or(month2);
        let (year1, month1) = self.infer_year_and_month(day1, month1);
        let start = NaiveDate::from_ymd_opt(year1, month1, day1)?;

        // An absent second month inherits the first; a checkout before the
        // check-in within the same month rolls into the next month.
        let month2 = month2.unwrap_or(month1);
        let mut year2 = if month2 < month1 { year1 + 1 } else { year1 };
        let mut end = NaiveDate::from_ymd_opt(year2, month2, day2)?;
        if end <= start && month2 == month1 {
            let (y, m) = next_month(year2, month2);
            year2 = y;
            end = NaiveDate::from_ymd_opt(year2, m, day2)?;
        }

        DateRange::new(start, end).ok()
    }

    // ========================================================================
    // Pass 2: absolute single dates
    // ========================================================================

    fn parse_absolute_dates(&self, t: &str) -> Option<Vec<DateRange>> {
        // An impossible mention ("june 31") skips to the next match instead
        // of abandoning the pass, so a later valid date still resolves.

        // ISO format: explicit year, taken literally
        let iso = Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("Invalid regex");
        for cap in iso.captures_iter(t) {
            let (Ok(year), Ok(month), Ok(day)) =
                (cap[1].parse(), cap[2].parse(), cap[3].parse())
            else {
                continue;
            };
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                continue;
            };
            return self.one_night(date).map(|r| vec![r]);
        }

        // "march 10(th)(, 2025)" or "10(th) (of) march(, 2025)"
        let month_day = Regex::new(
            r"\b([a-z]+)\s+(\d{1,2})(?:st|nd|rd|th)?(?:,?\s+(\d{4}))?\b",
        )
        .expect("Invalid regex");
        for cap in month_day.captures_iter(t) {
            let Some(month) = month_number(&cap[1]) else { continue };
            let Ok(day) = cap[2].parse::<u32>() else { continue };
            let Some(date) = self.absolute_date(day, month, cap.get(3).map(|y| y.as_str()))
            else {
                continue;
            };
            return self.one_night(date).map(|r| vec![r]);
        }

        let day_month = Regex::new(
            r"\b(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?([a-z]+)(?:,?\s+(\d{4}))?\b",
        )
        .expect("Invalid regex");
        for cap in day_month.captures_iter(t) {
            let Some(month) = month_number(&cap[2]) else { continue };
            let Ok(day) = cap[1].parse::<u32>() else { continue };
            let Some(date) = self.absolute_date(day, month, cap.get(3).map(|y| y.as_str()))
            else {
                continue;
            };
            return self.one_night(date).map(|r| vec![r]);
        }

        // Bare ordinal day: "on the 10th" — nearest future day-of-month
        let bare_day =
            Regex::new(r"\b(?:on\s+)?the\s+(\d{1,2})(?:st|nd|rd|th)\b").expect("Invalid regex");
        for cap in bare_day.captures_iter(t) {
            let Ok(day) = cap[1].parse::<u32>() else { continue };
            let (year, month) = self.infer_year_and_month(day, None);
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                continue;
            };
            return self.one_night(date).map(|r| vec![r]);
        }

        None
    }

    fn absolute_date(&self, day: u32, month: u32, year: Option<&str>) -> Option<NaiveDate> {
        match year {
            Some(y) => NaiveDate::from_ymd_opt(y.parse().ok()?, month, day),
            None => {
                let (year, month) = self.infer_year_and_month(day, Some(month));
                NaiveDate::from_ymd_opt(year, month, day)
            }
        }
    }

    // ========================================================================
    // Pass 3: numeric day/month dates
    // ========================================================================

    fn parse_numeric_dates(&self, t: &str) -> Option<Vec<DateRange>> {
        let pattern = Regex::new(r"\b(\d{1,2})/(\d{1,2})\b").expect("Invalid regex");

        let mut found: Vec<NaiveDate> = Vec::new();
        for cap in pattern.captures_iter(t) {
            let (day, month): (u32, u32) = (cap[1].parse().ok()?, cap[2].parse().ok()?);
            if !valid_day_month(day, month) {
                continue;
            }
            let (year, month) = self.infer_year_and_month(day, Some(month));
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                found.push(date);
            }
        }

        match found.len() {
            0 => None,
            1 => self.one_night(found[0]).map(|r| vec![r]),
            _ => {
                found.sort();
                DateRange::new(found[0], found[found.len() - 1])
                    .ok()
                    .map(|r| vec![r])
            }
        }
    }

    // ========================================================================
    // Pass 4: relative terms
    // ========================================================================

    fn parse_relative_dates(&self, t: &str) -> Option<Vec<DateRange>> {
        let reference = self.reference_date;

        if t.contains("day after tomorrow") {
            return self.one_night(reference + Duration::days(2)).map(|r| vec![r]);
        }
        if t.contains("tomorrow") {
            return self.one_night(reference + Duration::days(1)).map(|r| vec![r]);
        }
        if t.contains("tonight") || t.contains("today") {
            return self.one_night(reference).map(|r| vec![r]);
        }

        // Weekend = Saturday and Sunday nights
        if Regex::new(r"\bnext\s+weekend\b")
            .expect("Invalid regex")
            .is_match(t)
        {
            let saturday = self.upcoming_weekday(Weekday::Sat) + Duration::days(7);
            return DateRange::new(saturday, saturday + Duration::days(2))
                .ok()
                .map(|r| vec![r]);
        }
        if Regex::new(r"\b(?:this\s+|the\s+)?weekend\b")
            .expect("Invalid regex")
            .is_match(t)
        {
            let saturday = self.upcoming_weekday(Weekday::Sat);
            return DateRange::new(saturday, saturday + Duration::days(2))
                .ok()
                .map(|r| vec![r]);
        }

        // "the next 3 nights", anchored at the reference date
        let next_nights =
            Regex::new(r"\b(?:the\s+)?next\s+(\d+)\s+nights?\b").expect("Invalid regex");
        if let Some(cap) = next_nights.captures(t) {
            let n: i64 = cap[1].parse().ok()?;
            return DateRange::new(reference, reference + Duration::days(n.max(1)))
                .ok()
                .map(|r| vec![r]);
        }

        if Regex::new(r"\bnext\s+week\b")
            .expect("Invalid regex")
            .is_match(t)
        {
            let monday = self.next_weekday(Weekday::Mon, true);
            return DateRange::new(monday, monday + Duration::days(2))
                .ok()
                .map(|r| vec![r]);
        }

        for (name, weekday) in &WEEKDAY_NAMES {
            let next = Regex::new(&format!(r"\bnext\s+{name}\b")).expect("Invalid regex");
            if next.is_match(t) {
                return self.one_night(self.next_weekday(*weekday, true)).map(|r| vec![r]);
            }
            let this_or_bare =
                Regex::new(&format!(r"\b(?:this\s+|on\s+)?{name}\b")).expect("Invalid regex");
            if this_or_bare.is_match(t) {
                return self.one_night(self.next_weekday(*weekday, false)).map(|r| vec![r]);
            }
        }

        // "in N days/weeks"
        let in_n = Regex::new(r"\bin\s+(\d+)\s+(day|days|week|weeks)\b").expect("Invalid regex");
        if let Some(cap) = in_n.captures(t) {
            let n: i64 = cap[1].parse().ok()?;
            let date = match &cap[2] {
                unit if unit.starts_with("week") => reference + Duration::weeks(n),
                _ => reference + Duration::days(n),
            };
            return self.one_night(date).map(|r| vec![r]);
        }

        None
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Extend a single default one-night range when the text names a night
    /// count ("for 3 nights").
    fn apply_night_count(&self, t: &str, mut ranges: Vec<DateRange>) -> Vec<DateRange> {
        let nights = Regex::new(r"\b(\d+)\s*nights?\b").expect("Invalid regex");
        if let Some(cap) = nights.captures(t) {
            if let Ok(n) = cap[1].parse::<i64>() {
                if n >= 1 && ranges.len() == 1 && ranges[0].nights() == 1 {
                    let start = ranges[0].start;
                    if let Ok(extended) = DateRange::new(start, start + Duration::days(n)) {
                        ranges[0] = extended;
                    }
                }
            }
        }
        ranges
    }

    fn one_night(&self, date: NaiveDate) -> Option<DateRange> {
        DateRange::new(date, date + Duration::days(1)).ok()
    }

    /// Infer year (and month, when absent) for a day-of-month mention,
    /// preferring the nearest future occurrence over any past date.
    fn infer_year_and_month(&self, day: u32, month: Option<u32>) -> (i32, u32) {
        let reference = self.reference_date;
        let mut year = reference.year();

        let month = match month {
            Some(m) => {
                if self.prefer_future {
                    if m < reference.month() || (m == reference.month() && day < reference.day()) {
                        year += 1;
                    }
                }
                m
            }
            None => {
                // Bare day: stay in the reference month unless it already
                // passed, then roll forward.
                if self.prefer_future && day < reference.day() {
                    let (y, m) = next_month(year, reference.month());
                    year = y;
                    m
                } else {
                    reference.month()
                }
            }
        };

        (year, month)
    }

    /// Next occurrence of `target`, optionally skipping the current week.
    fn next_weekday(&self, target: Weekday, skip_this_week: bool) -> NaiveDate {
        let current = self.reference_date.weekday().num_days_from_monday();
        let wanted = target.num_days_from_monday();

        let mut days_ahead = (wanted as i64 - current as i64).rem_euclid(7);
        if days_ahead == 0 && skip_this_week {
            days_ahead = 7;
        } else if skip_this_week && days_ahead < 7 {
            days_ahead += 7;
        }

        self.reference_date + Duration::days(days_ahead)
    }

    /// Upcoming occurrence of `target`, today included.
    fn upcoming_weekday(&self, target: Weekday) -> NaiveDate {
        let current = self.reference_date.weekday().num_days_from_monday();
        let wanted = target.num_days_from_monday();
        let days_ahead = (wanted as i64 - current as i64).rem_euclid(7);
        self.reference_date + Duration::days(days_ahead)
    }
}

fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn month_number(name: &str) -> Option<u32> {
    MONTH_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, m)| *m)
}

fn valid_day_month(day: u32, month: u32) -> bool {
    (1..=31).contains(&day) && (1..=12).contains(&month)
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}
