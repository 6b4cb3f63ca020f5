//! Calendar module for availability checking and stay-date intelligence.
//!
//! This module provides the calendar side of guest-message handling:
//!
//! - **Feed Parsing**: Tolerant iCalendar (ICS) parsing into busy events
//! - **Availability**: Interval arithmetic over merged busy periods
//! - **Date Normalization**: Resolving loose guest phrasing ("next
//!   weekend", "from the 10th to the 15th") into concrete date ranges
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Calendar Layer                             │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │              AvailabilityEngine                           │  │
//! │  │  - Fetches a property's ICS feed (with timeout)           │  │
//! │  │  - Merges busy intervals, answers Free/Occupied           │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                           │                                     │
//! │                           ▼                                     │
//! │  ┌─────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │  parse_feed / BusySet   │  │  StayDateParser             │  │
//! │  │  - ICS line unfolding   │  │  - Absolute & relative      │  │
//! │  │  - Event salvage        │  │    date mentions            │  │
//! │  │  - Interval merge       │  │  - Never-past inference     │  │
//! │  └─────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All ranges are half-open `[check_in, check_out)`: the checkout day is
//! never occupied by the departing stay.

pub mod availability;
pub mod dates;
pub mod feed;

pub use availability::{
    AvailabilityCheck, AvailabilityEngine, BusySet, DateRange, FeedSource, HttpFeedSource, Verdict,
};
pub use dates::{DateResolution, StayDateParser};
pub use feed::{parse_feed, CalendarEvent, ParsedFeed};
