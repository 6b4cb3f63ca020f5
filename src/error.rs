//! Error types for the innkeep core.

use thiserror::Error;

/// Main error type for innkeep operations.
#[derive(Error, Debug)]
pub enum InnkeepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Knowledge-base ingestion errors.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid record on line {line}: {reason}")]
    InvalidRecord { line: usize, reason: String },

    #[error("Empty corpus: no records decoded")]
    EmptyCorpus,
}

/// Metadata store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Entry not found: {0}")]
    NotFound(u64),
}

/// Embedding-related errors.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Empty input text")]
    EmptyText,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Embedding backend error: {0}")]
    Backend(String),
}

/// Vector index errors.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Index is empty: no vectors have been built")]
    EmptyIndex,

    #[error("Query vector dimension {got} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Calendar feed and availability errors.
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Feed unreadable: {0}")]
    FeedUnreadable(String),

    #[error("Feed fetch timed out after {0}ms")]
    FeedTimeout(u64),

    #[error("Feed fetch failed: {0}")]
    FeedFetch(String),

    #[error("No calendar feed configured for property: {0}")]
    NoFeedForProperty(String),

    #[error("Invalid date range: start {start} is not before end {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}

/// Result type alias for innkeep operations.
pub type Result<T> = std::result::Result<T, InnkeepError>;
