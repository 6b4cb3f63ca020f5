//! Per-property knowledge base: entry types, corpus decoding, and the
//! metadata store that backs retrieval.

mod ingest;
mod store;
mod types;

pub use ingest::{chunk_text, decode_jsonl, decode_jsonl_file};
pub use store::MetadataStore;
pub use types::{EntryId, KnowledgeEntry, KnowledgeRecord, Section};
