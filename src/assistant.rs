//! Guest assistant coordinator that wires the full answering pipeline.
//!
//! The coordinator handles:
//! - Corpus rebuilds: chunking, embedding, atomic index + store swap
//! - Guest queries: per-property knowledge retrieval
//! - Stay-date resolution and calendar availability lookups
//!
//! Availability is reported, never guessed: when a feed cannot be fetched or
//! parsed the answer carries [`AvailabilityReport::Unknown`] with the reason,
//! so a host-facing layer can say "please check the calendar" instead of
//! inventing a vacancy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::calendar::{
    AvailabilityEngine, DateRange, DateResolution, FeedSource, HttpFeedSource, StayDateParser,
    Verdict,
};
use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::Result;
use crate::index::{IndexBuilder, SharedIndex, SkippedEntry};
use crate::knowledge::{chunk_text, EntryId, KnowledgeEntry, KnowledgeRecord, MetadataStore};
use crate::retrieval::{RankedEntry, Retriever};

/// Outcome of a corpus rebuild.
#[derive(Debug, Serialize)]
pub struct RebuildReport {
    /// Entries indexed and queryable.
    pub indexed: usize,
    /// Entries excluded from the index, with reasons.
    pub skipped: Vec<SkippedEntry>,
}

/// Availability as reported to the answering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AvailabilityReport {
    Free,
    Occupied { conflicts: Vec<DateRange> },
    /// The calendar could not be consulted; the reason is surfaced so the
    /// guest can be told to ask rather than being given a guess.
    Unknown { reason: String },
}

/// Everything the answering layer needs to respond to one guest message.
#[derive(Debug, Serialize)]
pub struct GuestContext {
    /// Knowledge entries ranked by relevance, all belonging to the
    /// queried property.
    pub entries: Vec<RankedEntry>,
    /// Stay dates resolved from the message, if any were mentioned.
    pub resolved_range: Option<DateRange>,
    /// Calendar verdict for the resolved range. `None` when the message
    /// mentioned no dates.
    pub availability: Option<AvailabilityReport>,
}

/// Coordinates retrieval and calendar lookups for guest messages.
pub struct GuestAssistant {
    config: Config,
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<SharedIndex>,
    store: Arc<MetadataStore>,
    retriever: Retriever,
    engine: AvailabilityEngine,
    /// Next entry identifier. Monotonic across rebuilds: an id is never
    /// reused, so a hit from a superseded index misses in the new store and
    /// is dropped instead of resolving to an unrelated entry.
    next_id: AtomicU64,
}

impl GuestAssistant {
    /// Create an assistant with an explicit embedding provider and feed
    /// source. Tests inject deterministic stubs through here.
    pub fn new(
        config: Config,
        provider: Arc<dyn EmbeddingProvider>,
        feed_source: Box<dyn FeedSource>,
    ) -> Self {
        let index = Arc::new(SharedIndex::new());
        let store = Arc::new(MetadataStore::new());
        let retriever = Retriever::new(provider.clone(), index.clone(), store.clone());
        let engine = AvailabilityEngine::new(
            feed_source,
            std::time::Duration::from_secs(config.calendar.fetch_timeout_secs),
        );

        Self {
            config,
            provider,
            index,
            store,
            retriever,
            engine,
            next_id: AtomicU64::new(0),
        }
    }

    /// Create an assistant backed by the configured local embedding model
    /// and HTTP calendar feeds.
    pub fn from_config(config: Config) -> Result<Self> {
        let provider: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(&config.embedding)?);
        Ok(Self::new(config, provider, Box::new(HttpFeedSource::new())))
    }

    /// Rebuild the knowledge index from decoded corpus records.
    ///
    /// Records are chunked, embedded, and installed as a new index snapshot
    /// together with a matching metadata store. In-flight queries finish
    /// against the old snapshot; queries started after the swap see only the
    /// new corpus.
    pub async fn rebuild(&self, records: &[KnowledgeRecord]) -> Result<RebuildReport> {
        let mut entries = Vec::new();

        for record in records {
            for chunk in chunk_text(&record.text) {
                entries.push(KnowledgeEntry {
                    id: EntryId(self.next_id.fetch_add(1, Ordering::Relaxed)),
                    property_id: record.property_id.clone(),
                    section: record.section.clone(),
                    lang: record.lang.clone(),
                    text: chunk,
                });
            }
        }

        let built = IndexBuilder::build(&entries, self.provider.as_ref()).await?;
        let indexed = built.index.len();

        // Store first, then index: a query racing the swap either sees the
        // old index (old hits, old store entries still present via its
        // snapshot) or the new index whose hits the new store can resolve.
        self.store.replace(entries);
        self.index.install(built.index);

        info!(
            indexed,
            skipped = built.skipped.len(),
            "knowledge index rebuilt"
        );

        Ok(RebuildReport {
            indexed,
            skipped: built.skipped,
        })
    }

    /// Answer context for one guest message, dated today.
    pub async fn answer(&self, message: &str, property_id: &str) -> Result<GuestContext> {
        self.answer_at(message, property_id, chrono::Local::now().date_naive())
            .await
    }

    /// Answer context with an explicit reference date for stay-date
    /// resolution.
    pub async fn answer_at(
        &self,
        message: &str,
        property_id: &str,
        reference_date: NaiveDate,
    ) -> Result<GuestContext> {
        let entries = self
            .retriever
            .query(message, property_id, self.config.retrieval.top_k, None)
            .await?;

        let parser = StayDateParser::with_policy(reference_date, self.config.dates.prefer_future);
        let resolved_range = match parser.resolve(message) {
            DateResolution::Ranges(ranges) => ranges.first().copied(),
            DateResolution::NoDateFound => None,
        };

        let availability = match resolved_range {
            Some(range) => Some(self.check_availability(property_id, &range).await),
            None => None,
        };

        Ok(GuestContext {
            entries,
            resolved_range,
            availability,
        })
    }

    /// Consult the property's calendar, degrading to `Unknown` on any
    /// failure.
    async fn check_availability(&self, property_id: &str, range: &DateRange) -> AvailabilityReport {
        let url = match self.config.calendar.feeds.get(property_id) {
            Some(url) => url,
            None => {
                let e = crate::error::CalendarError::NoFeedForProperty(property_id.to_string());
                return AvailabilityReport::Unknown {
                    reason: e.to_string(),
                };
            }
        };

        match self.engine.check(url, range).await {
            Ok(check) => match check.verdict {
                Verdict::Free => AvailabilityReport::Free,
                Verdict::Occupied { conflicts } => AvailabilityReport::Occupied { conflicts },
            },
            Err(e) => {
                warn!(property_id, error = %e, "availability check failed");
                AvailabilityReport::Unknown {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Section;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Deterministic bag-of-words embedding for tests.
    struct StubProvider;

    const STUB_DIM: usize = 16;

    fn hash_token(token: &str) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut vector = vec![0.0f32; STUB_DIM];
                    for token in text.to_lowercase().split_whitespace() {
                        vector[(hash_token(token) % STUB_DIM as u64) as usize] += 1.0;
                    }
                    vector
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            STUB_DIM
        }
    }

    struct StaticFeed(String);

    #[async_trait]
    impl FeedSource for StaticFeed {
        async fn fetch(&self, _url: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct BrokenFeed;

    #[async_trait]
    impl FeedSource for BrokenFeed {
        async fn fetch(&self, _url: &str) -> Result<String> {
            Err(crate::error::CalendarError::FeedFetch("connection refused".to_string()).into())
        }
    }

    fn config_with_feed(property_id: &str) -> Config {
        let mut config = Config::default();
        config.calendar.feeds = HashMap::from([(
            property_id.to_string(),
            "https://calendar.example.com/feed.ics".to_string(),
        )]);
        config
    }

    fn record(property_id: &str, section: Section, text: &str) -> KnowledgeRecord {
        KnowledgeRecord {
            property_id: property_id.to_string(),
            section,
            lang: "en".to_string(),
            text: text.to_string(),
        }
    }

    fn corpus() -> Vec<KnowledgeRecord> {
        vec![
            record(
                "villa-1",
                Section::Checkin,
                "Check-in is from 3pm using the lockbox by the door",
            ),
            record(
                "villa-1",
                Section::Amenities,
                "The pool is heated from May to September",
            ),
            record(
                "cabin-2",
                Section::Checkin,
                "Check-in is from 4pm, keys at the reception desk",
            ),
        ]
    }

    fn busy_feed(start: &str, end: &str) -> String {
        format!(
            "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nDTSTART;VALUE=DATE:{start}\r\nDTEND;VALUE=DATE:{end}\r\nSUMMARY:Reserved\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n"
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_rebuild_reports_indexed_count() {
        let assistant = GuestAssistant::new(
            Config::default(),
            Arc::new(StubProvider),
            Box::new(StaticFeed(String::new())),
        );
        let report = assistant.rebuild(&corpus()).await.unwrap();
        assert_eq!(report.indexed, 3);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_rebuild_never_reuses_ids() {
        let assistant = GuestAssistant::new(
            Config::default(),
            Arc::new(StubProvider),
            Box::new(StaticFeed(String::new())),
        );
        assistant.rebuild(&corpus()).await.unwrap();
        let first_ids: Vec<EntryId> = {
            let mut ids: Vec<EntryId> = assistant.store.snapshot().keys().copied().collect();
            ids.sort();
            ids
        };
        assistant.rebuild(&corpus()).await.unwrap();
        let second_ids: Vec<EntryId> = {
            let mut ids: Vec<EntryId> = assistant.store.snapshot().keys().copied().collect();
            ids.sort();
            ids
        };

        assert_eq!(first_ids, vec![EntryId(0), EntryId(1), EntryId(2)]);
        assert_eq!(second_ids, vec![EntryId(3), EntryId(4), EntryId(5)]);
    }

    #[tokio::test]
    async fn test_answer_is_property_scoped() {
        let assistant = GuestAssistant::new(
            Config::default(),
            Arc::new(StubProvider),
            Box::new(StaticFeed(String::new())),
        );
        assistant.rebuild(&corpus()).await.unwrap();

        let context = assistant
            .answer_at("What time is check-in?", "villa-1", date(2025, 6, 1))
            .await
            .unwrap();

        assert!(!context.entries.is_empty());
        for ranked in &context.entries {
            assert_eq!(ranked.entry.property_id, "villa-1");
        }
        assert!(context.resolved_range.is_none());
        assert!(context.availability.is_none());
    }

    #[tokio::test]
    async fn test_answer_with_dates_reports_occupied() {
        let assistant = GuestAssistant::new(
            config_with_feed("villa-1"),
            Arc::new(StubProvider),
            Box::new(StaticFeed(busy_feed("20250710", "20250715"))),
        );
        assistant.rebuild(&corpus()).await.unwrap();

        let context = assistant
            .answer_at(
                "Is the villa free from 2025-07-12 to 2025-07-14?",
                "villa-1",
                date(2025, 6, 1),
            )
            .await
            .unwrap();

        assert_eq!(
            context.resolved_range,
            Some(DateRange::new(date(2025, 7, 12), date(2025, 7, 14)).unwrap())
        );
        assert_eq!(
            context.availability,
            Some(AvailabilityReport::Occupied {
                conflicts: vec![DateRange::new(date(2025, 7, 12), date(2025, 7, 14)).unwrap()],
            })
        );
    }

    #[tokio::test]
    async fn test_answer_with_dates_reports_free() {
        let assistant = GuestAssistant::new(
            config_with_feed("villa-1"),
            Arc::new(StubProvider),
            Box::new(StaticFeed(busy_feed("20250710", "20250715"))),
        );
        assistant.rebuild(&corpus()).await.unwrap();

        let context = assistant
            .answer_at(
                "Can we come on 2025-08-01 for 3 nights?",
                "villa-1",
                date(2025, 6, 1),
            )
            .await
            .unwrap();

        assert_eq!(context.availability, Some(AvailabilityReport::Free));
    }

    #[tokio::test]
    async fn test_feed_failure_is_unknown_not_free() {
        let assistant = GuestAssistant::new(
            config_with_feed("villa-1"),
            Arc::new(StubProvider),
            Box::new(BrokenFeed),
        );
        assistant.rebuild(&corpus()).await.unwrap();

        let context = assistant
            .answer_at("Is 2025-08-01 available?", "villa-1", date(2025, 6, 1))
            .await
            .unwrap();

        match context.availability {
            Some(AvailabilityReport::Unknown { reason }) => {
                assert!(reason.contains("connection refused"));
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_feed_is_unknown() {
        let assistant = GuestAssistant::new(
            Config::default(),
            Arc::new(StubProvider),
            Box::new(StaticFeed(String::new())),
        );
        assistant.rebuild(&corpus()).await.unwrap();

        let context = assistant
            .answer_at("Is 2025-08-01 available?", "cabin-2", date(2025, 6, 1))
            .await
            .unwrap();

        match context.availability {
            Some(AvailabilityReport::Unknown { reason }) => {
                assert!(reason.contains("cabin-2"));
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
    }
}
