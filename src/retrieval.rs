//! Knowledge retrieval: embed a guest query, search the active index, join
//! against the metadata store, and filter to the target property.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, IndexError, Result};
use crate::index::SharedIndex;
use crate::knowledge::{KnowledgeEntry, MetadataStore, Section};

/// Oversampling factor for the index search.
///
/// The index has no native per-property filter, so the search over-fetches
/// and filtering happens after the store join. Factor 3 survives typical
/// multi-property corpora without scanning everything twice.
pub const OVERSAMPLE_FACTOR: usize = 3;

/// A retrieved knowledge entry with its similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry {
    pub entry: KnowledgeEntry,
    /// Cosine similarity to the query.
    pub score: f32,
    /// Original index rank (0 = nearest), the tie-breaker for equal scores.
    pub rank: usize,
}

/// Read-only retriever over the active index snapshot and store.
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<SharedIndex>,
    store: Arc<MetadataStore>,
}

impl Retriever {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<SharedIndex>,
        store: Arc<MetadataStore>,
    ) -> Self {
        Self {
            provider,
            index,
            store,
        }
    }

    /// Retrieve up to `top_k` entries for `property_id` ranked by similarity
    /// to `text`.
    ///
    /// Results never include another property's entries; when fewer than
    /// `top_k` survive filtering, the shorter list is returned as-is.
    pub async fn query(
        &self,
        text: &str,
        property_id: &str,
        top_k: usize,
        section_filter: Option<&[Section]>,
    ) -> Result<Vec<RankedEntry>> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText.into());
        }

        let index = self
            .index
            .current()
            .ok_or(IndexError::EmptyIndex)
            .map_err(crate::error::InnkeepError::from)?;

        let embedded = self.provider.embed(&[text.to_string()]).await?;
        let query_vector = embedded
            .first()
            .ok_or_else(|| EmbeddingError::Backend("provider returned no vector".to_string()))?;

        let hits = index.search(query_vector, top_k.saturating_mul(OVERSAMPLE_FACTOR))?;

        let mut results = Vec::with_capacity(top_k);
        for hit in hits {
            let entry = match self.store.get(hit.id) {
                Ok(entry) => entry,
                Err(e) => {
                    // Index and store are swapped together; a miss here means
                    // the caller raced a rebuild with a stale handle.
                    warn!(id = %hit.id, error = %e, "index hit missing from store");
                    continue;
                }
            };

            if entry.property_id != property_id {
                continue;
            }
            if let Some(sections) = section_filter {
                if !sections.contains(&entry.section) {
                    continue;
                }
            }

            results.push(RankedEntry {
                entry,
                score: hit.score,
                rank: hit.rank,
            });
        }

        // Hits arrive ordered by descending score with index-rank tie-break;
        // re-assert it so filtering cannot disturb the contract.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.rank.cmp(&b.rank))
        });
        results.truncate(top_k);

        debug!(
            property_id,
            returned = results.len(),
            top_k,
            "retrieval query complete"
        );
        Ok(results)
    }
}
