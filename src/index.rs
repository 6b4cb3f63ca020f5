//! Nearest-neighbor vector index over the knowledge corpus.
//!
//! The index is an immutable snapshot: built in one pass from the full
//! corpus, then swapped in wholesale through [`SharedIndex`]. There is no
//! incremental update path; a corpus edit triggers a rebuild. Readers holding
//! the previous snapshot keep querying it until the swap lands, so a rebuild
//! never blocks in-flight searches.
//!
//! Vectors are L2-normalized at build and query time, so the inner-product
//! scan scores by cosine similarity — the same structure as a flat IP index
//! over a small corpus.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::{IndexError, Result};
use crate::knowledge::{EntryId, KnowledgeEntry};

/// A single nearest-neighbor hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Entry the matched vector belongs to.
    pub id: EntryId,
    /// Position in the result list (0 = best). Used downstream as the
    /// deterministic tie-breaker for identical scores.
    pub rank: usize,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// An entry excluded from the index during a build, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    pub id: EntryId,
    pub reason: String,
}

/// Immutable vector index snapshot.
pub struct VectorIndex {
    dimension: usize,
    /// Flattened row-major vector data, `len = slots * dimension`.
    vectors: Vec<f32>,
    /// Slot → entry identifier. Every vector corresponds to exactly one
    /// live entry in the store snapshot built alongside it.
    ids: Vec<EntryId>,
}

impl VectorIndex {
    /// Number of vectors in the index.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Search for the `k` nearest vectors by cosine similarity.
    ///
    /// Results are ordered by descending score; ties break on slot order, so
    /// identical queries against an unchanged index return identical ordered
    /// results regardless of iteration details.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.is_empty() {
            return Err(IndexError::EmptyIndex.into());
        }
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            }
            .into());
        }

        let query = normalize(query);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(slot, row)| (slot, dot(row, &query)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (slot, score))| SearchHit {
                id: self.ids[slot],
                rank,
                score,
            })
            .collect())
    }
}

/// Result of a one-pass index build.
pub struct BuiltIndex {
    pub index: VectorIndex,
    /// Entries excluded from the index, reported rather than silently
    /// indexed with a degenerate vector.
    pub skipped: Vec<SkippedEntry>,
}

/// Builds a [`VectorIndex`] from the full corpus.
pub struct IndexBuilder;

impl IndexBuilder {
    /// Embed every entry and construct the index in one pass.
    ///
    /// Entries with empty text, or whose embedding comes back non-finite or
    /// zero, are skipped and reported in the warning list; the build
    /// continues. Identical corpus + model version produces an index with
    /// identical retrieval behavior.
    pub async fn build(
        entries: &[KnowledgeEntry],
        provider: &dyn EmbeddingProvider,
    ) -> Result<BuiltIndex> {
        let dimension = provider.dimension();
        let mut skipped = Vec::new();

        let mut indexable: Vec<&KnowledgeEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.text.trim().is_empty() {
                warn!(id = %entry.id, "skipping entry with empty text");
                skipped.push(SkippedEntry {
                    id: entry.id,
                    reason: "empty text".to_string(),
                });
            } else {
                indexable.push(entry);
            }
        }

        let mut vectors = Vec::with_capacity(indexable.len() * dimension);
        let mut ids = Vec::with_capacity(indexable.len());

        let batch_size = provider.max_batch_size().max(1);
        for batch in indexable.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|e| e.text.clone()).collect();
            let embedded = provider.embed(&texts).await?;

            for (entry, vector) in batch.iter().zip(embedded) {
                match checked_normalize(&vector) {
                    Some(unit) => {
                        vectors.extend_from_slice(&unit);
                        ids.push(entry.id);
                    }
                    None => {
                        warn!(id = %entry.id, "skipping entry with degenerate embedding");
                        skipped.push(SkippedEntry {
                            id: entry.id,
                            reason: "non-finite or zero embedding".to_string(),
                        });
                    }
                }
            }
        }

        debug!(
            vectors = ids.len(),
            skipped = skipped.len(),
            "built vector index"
        );

        Ok(BuiltIndex {
            index: VectorIndex {
                dimension,
                vectors,
                ids,
            },
            skipped,
        })
    }
}

/// Process-wide handle to the active index snapshot.
///
/// Created empty; `install` replaces the snapshot atomically. Readers clone
/// the Arc and never observe a half-built index; the old snapshot is dropped
/// once its last reader releases it.
#[derive(Default)]
pub struct SharedIndex {
    current: RwLock<Option<Arc<VectorIndex>>>,
}

impl SharedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly built index.
    pub fn install(&self, index: VectorIndex) {
        let count = index.len();
        *self.current.write() = Some(Arc::new(index));
        debug!(vectors = count, "installed new index snapshot");
    }

    /// The active snapshot, if one has been built.
    pub fn current(&self) -> Option<Arc<VectorIndex>> {
        self.current.read().clone()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

/// Normalize, rejecting non-finite and zero vectors.
fn checked_normalize(v: &[f32]) -> Option<Vec<f32>> {
    if v.iter().any(|x| !x.is_finite()) {
        return None;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    Some(v.iter().map(|x| x / norm).collect())
}
