//! Query evaluation: BM25 scoring, posting-list cursors, DAAT traversal

pub mod bm25;
mod cursor;
mod daat;

pub use cursor::{ListCursor, TERMINATED};
pub use daat::{evaluate, ScoredDoc, DEFAULT_TOP_K};
