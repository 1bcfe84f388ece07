//! Build-time configuration for the indexing pipeline

use serde::{Deserialize, Serialize};

/// Tunables for corpus parsing, run flushing, and merging.
///
/// Defaults match the engine's corpus contract: one million passages,
/// sixteen sorted runs, ~100 MB of buffered postings, a ~150 MB term
/// arena, and a ~100 MB merge output buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Expected corpus size in documents.
    pub dataset_size: u32,
    /// Number of sorted temp runs the parser aims to emit.
    pub temp_file_count: u32,
    /// Byte budget for the in-memory posting buffer.
    pub posting_buffer_bytes: usize,
    /// Byte budget for the term arena.
    pub term_arena_bytes: usize,
    /// Capacity of the merge output buffer.
    pub merge_buffer_bytes: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dataset_size: 1_000_000,
            temp_file_count: 16,
            posting_buffer_bytes: 100 * 1024 * 1024,
            term_arena_bytes: 150 * 1024 * 1024,
            merge_buffer_bytes: 100 * 1024 * 1024,
        }
    }
}

impl BuildConfig {
    /// Documents per flush batch. The parser flushes one run per batch,
    /// so `temp_file_count` runs cover `dataset_size` documents.
    pub fn docs_per_flush(&self) -> u32 {
        (self.dataset_size / self.temp_file_count).max(1)
    }

    /// Posting-buffer capacity in entries.
    pub fn posting_capacity(&self) -> usize {
        (self.posting_buffer_bytes / crate::parser::POSTING_ENTRY_SIZE).max(1)
    }
}
