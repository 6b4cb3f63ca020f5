//! Metadata store for knowledge entries.
//!
//! Readers resolve entry identifiers against an immutable snapshot; the only
//! write path is a full transactional replace that swaps the snapshot
//! wholesale. Readers holding the previous snapshot keep a complete,
//! consistent corpus until they drop it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, StoreError};

use super::types::{EntryId, KnowledgeEntry};

type Snapshot = Arc<HashMap<EntryId, KnowledgeEntry>>;

/// In-memory metadata store, one record per knowledge entry.
#[derive(Default)]
pub struct MetadataStore {
    entries: RwLock<Snapshot>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire corpus. All-or-nothing: the new map is fully built
    /// before the swap, so readers never observe a partial corpus.
    pub fn replace(&self, entries: Vec<KnowledgeEntry>) {
        let map: HashMap<EntryId, KnowledgeEntry> =
            entries.into_iter().map(|e| (e.id, e)).collect();
        let count = map.len();
        *self.entries.write() = Arc::new(map);
        debug!(entries = count, "replaced metadata store corpus");
    }

    /// Look up a single entry by identifier.
    pub fn get(&self, id: EntryId) -> Result<KnowledgeEntry> {
        self.snapshot()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.0).into())
    }

    /// List all entries for a property, for diagnostics. Ordered by id.
    pub fn list_by_property(&self, property_id: &str) -> Vec<KnowledgeEntry> {
        let mut entries: Vec<KnowledgeEntry> = self
            .snapshot()
            .values()
            .filter(|e| e.property_id == property_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.id);
        entries
    }

    /// Number of entries in the current corpus.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Current corpus snapshot; cheap Arc clone.
    pub fn snapshot(&self) -> Snapshot {
        self.entries.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::types::Section;

    fn entry(id: u64, property_id: &str) -> KnowledgeEntry {
        KnowledgeEntry {
            id: EntryId(id),
            property_id: property_id.to_string(),
            section: Section::General,
            lang: "en".to_string(),
            text: format!("entry {id}"),
        }
    }

    #[test]
    fn test_get_after_replace() {
        let store = MetadataStore::new();
        store.replace(vec![entry(1, "villa-1"), entry(2, "villa-2")]);

        assert_eq!(store.get(EntryId(1)).unwrap().property_id, "villa-1");
        assert!(store.get(EntryId(99)).is_err());
    }

    #[test]
    fn test_replace_is_total() {
        let store = MetadataStore::new();
        store.replace(vec![entry(1, "villa-1")]);
        store.replace(vec![entry(2, "villa-2"), entry(3, "villa-2")]);

        assert!(store.get(EntryId(1)).is_err());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_old_snapshot_survives_replace() {
        let store = MetadataStore::new();
        store.replace(vec![entry(1, "villa-1")]);
        let old = store.snapshot();

        store.replace(vec![entry(2, "villa-2")]);

        assert!(old.contains_key(&EntryId(1)));
        assert!(store.get(EntryId(2)).is_ok());
    }

    #[test]
    fn test_list_by_property_ordered() {
        let store = MetadataStore::new();
        store.replace(vec![entry(3, "villa-1"), entry(1, "villa-1"), entry(2, "villa-2")]);

        let listed = store.list_by_property("villa-1");
        assert_eq!(
            listed.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![EntryId(1), EntryId(3)]
        );
    }
}
