//! Innkeep: Guest-Message Answering Core for Short-Term Rentals
//!
//! Per-property knowledge retrieval over an embedded vector index, plus
//! calendar availability from iCalendar feeds with natural-language
//! stay-date resolution.

pub mod assistant;
pub mod calendar;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod knowledge;
pub mod retrieval;

pub use assistant::{AvailabilityReport, GuestAssistant, GuestContext, RebuildReport};
pub use calendar::{
    parse_feed, AvailabilityCheck, AvailabilityEngine, BusySet, CalendarEvent, DateRange,
    DateResolution, FeedSource, HttpFeedSource, ParsedFeed, StayDateParser, Verdict,
};
pub use config::Config;
pub use embedding::{create_provider, EmbeddingProvider, LocalEmbeddingProvider};
pub use error::{InnkeepError, Result};
pub use index::{BuiltIndex, IndexBuilder, SearchHit, SharedIndex, SkippedEntry, VectorIndex};
pub use knowledge::{
    chunk_text, decode_jsonl, decode_jsonl_file, EntryId, KnowledgeEntry, KnowledgeRecord,
    MetadataStore, Section,
};
pub use retrieval::{RankedEntry, Retriever};
