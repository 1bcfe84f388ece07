//! Petrel - a batch-built, disk-resident BM25 search engine
//!
//! The library covers the full pipeline for a fixed passage corpus:
//! - Corpus parsing with bounded in-memory partial sorts (external merge sort)
//! - K-way merge of sorted posting runs into one globally sorted stream
//! - Block-compressed inverted index (delta + varbyte, 128-posting blocks)
//!   with a lexicon and per-block metadata
//! - Disjunctive Document-At-A-Time query evaluation with BM25 scoring and
//!   MaxScore-style pruning over a bounded top-k heap
//!
//! Every stage is single-threaded and hands off files to the next; the
//! compressed index is immutable once built.

pub mod config;
pub mod error;
pub mod index;
pub mod merge;
pub mod parser;
pub mod query;
pub mod structures;
pub mod tokenizer;

pub use config::BuildConfig;
pub use error::{Error, Result};
pub use index::{
    build_index, load_page_table, BuildStats, IndexReader, LexiconEntry, INDEX_FILE,
    LEXICON_FILE, METADATA_FILE, PAGE_TABLE_FILE,
};
pub use merge::merge_runs;
pub use parser::{write_page_table, PassageParser, ParserOutput};
pub use query::{evaluate, ScoredDoc, DEFAULT_TOP_K, TERMINATED};
pub use structures::{Block, BlockMetadata, BLOCK_SIZE};

pub type DocId = u32;
pub type TermFreq = u32;
pub type Score = f64;
