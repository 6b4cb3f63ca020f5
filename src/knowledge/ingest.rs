//! Knowledge-base corpus decoding and chunking.
//!
//! The authoring source exports one JSON record per line. Blank lines and
//! `#` comments are skipped; a malformed line is a hard error with its line
//! number, since a silently dropped record would leave a hole in the corpus.

use tracing::debug;

use crate::error::{IngestError, Result};

use super::types::KnowledgeRecord;

/// Maximum characters per indexed chunk.
const MAX_CHUNK_CHARS: usize = 900;

/// Decode a JSONL corpus export into records.
pub fn decode_jsonl(input: &str) -> Result<Vec<KnowledgeRecord>> {
    let mut records = Vec::new();

    for (idx, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let record: KnowledgeRecord =
            serde_json::from_str(line).map_err(|e| IngestError::InvalidRecord {
                line: idx + 1,
                reason: e.to_string(),
            })?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(IngestError::EmptyCorpus.into());
    }

    debug!(records = records.len(), "decoded knowledge corpus");
    Ok(records)
}

/// Decode a JSONL corpus export from a file on disk.
pub fn decode_jsonl_file(path: impl AsRef<std::path::Path>) -> Result<Vec<KnowledgeRecord>> {
    let content = std::fs::read_to_string(path)?;
    decode_jsonl(&content)
}

/// Split a record's text into chunks of at most [`MAX_CHUNK_CHARS`],
/// breaking on word boundaries so no word is split mid-way.
pub fn chunk_text(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.len() <= MAX_CHUNK_CHARS {
        return if normalized.is_empty() {
            Vec::new()
        } else {
            vec![normalized]
        };
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let bytes = normalized.as_bytes();

    while start < normalized.len() {
        let mut end = (start + MAX_CHUNK_CHARS).min(normalized.len());
        if end < normalized.len() {
            // Back off to the last space so words stay intact.
            while end > start && bytes[end - 1] != b' ' {
                end -= 1;
            }
            if end == start {
                // A single word longer than the budget; hard split, backed
                // off to a char boundary so multibyte text cannot panic.
                end = (start + MAX_CHUNK_CHARS).min(normalized.len());
                while !normalized.is_char_boundary(end) {
                    end -= 1;
                }
            }
        }

        let chunk = normalized[start..end].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        start = end;
    }

    chunks
}
