//! Core types for the per-property knowledge base.

use serde::{Deserialize, Serialize};

/// Stable identifier for a knowledge entry.
///
/// Assigned at ingestion and never reused. Allocation is monotonic across
/// rebuilds, so an id minted for a previous corpus can never resolve to an
/// entry from a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Section tag classifying what a knowledge entry is about.
///
/// Unknown tags round-trip losslessly through `Other` so authored corpora can
/// introduce sections without a code change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Section {
    Checkin,
    Checkout,
    Amenities,
    Rules,
    Pricing,
    Recommendations,
    General,
    Other(String),
}

impl From<String> for Section {
    fn from(s: String) -> Self {
        match s.as_str() {
            "checkin" => Section::Checkin,
            "checkout" => Section::Checkout,
            "amenities" => Section::Amenities,
            "rules" => Section::Rules,
            "pricing" => Section::Pricing,
            "recommendations" => Section::Recommendations,
            "general" => Section::General,
            _ => Section::Other(s),
        }
    }
}

impl From<Section> for String {
    fn from(s: Section) -> Self {
        match s {
            Section::Checkin => "checkin".to_string(),
            Section::Checkout => "checkout".to_string(),
            Section::Amenities => "amenities".to_string(),
            Section::Rules => "rules".to_string(),
            Section::Pricing => "pricing".to_string(),
            Section::Recommendations => "recommendations".to_string(),
            Section::General => "general".to_string(),
            Section::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from(self.clone()))
    }
}

/// A single indexed knowledge entry.
///
/// Immutable once indexed: the store and the vector index are kept in 1:1
/// correspondence, and a full rebuild is the only mutation path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Stable entry identifier.
    pub id: EntryId,
    /// Property this entry belongs to.
    pub property_id: String,
    /// Section tag.
    pub section: Section,
    /// Language code of the text (e.g. "en", "es").
    pub lang: String,
    /// Entry text, as indexed.
    pub text: String,
}

/// A decoded knowledge-base record, as authored upstream.
///
/// One record per line in the ingestion format; the core is agnostic to the
/// on-disk encoding and consumes decoded records. A record may be split into
/// multiple entries during chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub property_id: String,
    #[serde(default = "default_section")]
    pub section: Section,
    #[serde(default = "default_lang")]
    pub lang: String,
    pub text: String,
}

fn default_section() -> Section {
    Section::General
}

fn default_lang() -> String {
    "en".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_round_trip() {
        let known: Section = serde_json::from_str("\"checkin\"").unwrap();
        assert_eq!(known, Section::Checkin);
        assert_eq!(serde_json::to_string(&known).unwrap(), "\"checkin\"");

        let custom: Section = serde_json::from_str("\"parking\"").unwrap();
        assert_eq!(custom, Section::Other("parking".to_string()));
        assert_eq!(serde_json::to_string(&custom).unwrap(), "\"parking\"");
    }

    #[test]
    fn test_record_defaults() {
        let record: KnowledgeRecord =
            serde_json::from_str(r#"{"property_id": "villa-1", "text": "Pool opens at 9am"}"#)
                .unwrap();
        assert_eq!(record.section, Section::General);
        assert_eq!(record.lang, "en");
    }
}
