//! Corpus parser and partial sorter
//!
//! First stage of the external merge sort. Passages are tokenized into a
//! bounded workspace: terms are copied once per occurrence into an
//! append-only byte arena, and postings hold `(offset, len, docId)`
//! entries pointing into it. Every `docs_per_flush` documents (and at end
//! of input) the live postings are sorted by `(term bytes, docId)`,
//! equal pairs are collapsed into a frequency, and the run is written as
//! one sorted temp file.
//!
//! Buffer-pressure flushes happen on document boundaries only: a docId
//! must never be split across two runs, or the merged stream would carry
//! duplicate `(term, docId)` pairs.

use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::config::BuildConfig;
use crate::structures::write_record;
use crate::tokenizer::{clean_text, tokenize};
use crate::{DocId, Result};

/// A tokenized term occurrence. Offsets are stable until the next flush
/// resets the arena.
#[derive(Debug, Clone, Copy)]
struct ArenaPosting {
    term_offset: u32,
    term_len: u32,
    doc_id: DocId,
}

/// Bytes per posting-buffer entry, used to size the buffer from a byte
/// budget.
pub const POSTING_ENTRY_SIZE: usize = std::mem::size_of::<ArenaPosting>();

/// Everything the parse stage hands to its successors: the sorted runs
/// in flush order (the merger consumes exactly this list) and the page
/// table mapping docId to document length.
#[derive(Debug)]
pub struct ParserOutput {
    pub runs: Vec<PathBuf>,
    pub page_table: FxHashMap<DocId, u32>,
    pub docs: u64,
}

/// Write the page table as text lines `docId\tdocLength`. Order is not
/// significant.
pub fn write_page_table(table: &FxHashMap<DocId, u32>, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for (&doc_id, &len) in table {
        writeln!(writer, "{doc_id}\t{len}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Streaming passage parser with a fixed-size workspace.
pub struct PassageParser {
    config: BuildConfig,
    temp_dir: PathBuf,
    arena: Vec<u8>,
    postings: Vec<ArenaPosting>,
    posting_capacity: usize,
    page_table: FxHashMap<DocId, u32>,
    runs: Vec<PathBuf>,
    doc_count: u64,
}

impl PassageParser {
    pub fn new(temp_dir: impl Into<PathBuf>, config: BuildConfig) -> Self {
        let posting_capacity = config.posting_capacity();
        Self {
            arena: Vec::with_capacity(config.term_arena_bytes.min(1 << 20)),
            postings: Vec::new(),
            posting_capacity,
            page_table: FxHashMap::default(),
            runs: Vec::new(),
            doc_count: 0,
            temp_dir: temp_dir.into(),
            config,
        }
    }

    /// Consume the whole corpus, flushing runs along the way, then flush
    /// the leftover batch.
    ///
    /// Each input line is `<docId><ws><text...>`; lines whose first token
    /// does not parse as a docId are skipped.
    pub fn parse_corpus<R: BufRead>(mut self, reader: R) -> Result<ParserOutput> {
        for line in reader.lines() {
            self.ingest_line(&line?)?;
        }
        if !self.postings.is_empty() {
            self.flush_run()?;
        }
        log::info!(
            "parsed {} documents into {} runs",
            self.doc_count,
            self.runs.len()
        );
        Ok(ParserOutput {
            runs: self.runs,
            page_table: self.page_table,
            docs: self.doc_count,
        })
    }

    fn ingest_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim_start();
        let (id_token, text) = match line.split_once(|c: char| c == '\t' || c == ' ') {
            Some((id, rest)) => (id, rest),
            None => (line, ""),
        };
        let doc_id: DocId = match id_token.parse() {
            Ok(id) => id,
            Err(_) => {
                if !line.is_empty() {
                    log::debug!("skipping line with unparseable docId {id_token:?}");
                }
                return Ok(());
            }
        };

        let cleaned = clean_text(text);
        let token_count = tokenize(&cleaned).count();

        // Flush-before-overflow, on a document boundary. A single document
        // larger than the whole workspace is a programming error.
        if self.postings.len() + token_count > self.posting_capacity
            || self.arena.len() + cleaned.len() > self.config.term_arena_bytes
        {
            self.flush_run()?;
        }
        assert!(
            token_count <= self.posting_capacity
                && cleaned.len() <= self.config.term_arena_bytes,
            "document {doc_id} exceeds the parser workspace"
        );

        for term in tokenize(&cleaned) {
            let term_offset = self.arena.len() as u32;
            self.arena.extend_from_slice(term.as_bytes());
            self.postings.push(ArenaPosting {
                term_offset,
                term_len: term.len() as u32,
                doc_id,
            });
        }

        // Token count before deduplication; duplicate docIds overwrite.
        self.page_table.insert(doc_id, token_count as u32);

        self.doc_count += 1;
        if self.doc_count % u64::from(self.config.docs_per_flush()) == 0 {
            self.flush_run()?;
        }
        Ok(())
    }

    /// Sort the live postings, collapse duplicates into frequencies, and
    /// write one sorted run. No-op when the batch is empty.
    fn flush_run(&mut self) -> Result<()> {
        if self.postings.is_empty() {
            return Ok(());
        }

        let arena = &self.arena;
        self.postings.sort_unstable_by(|a, b| {
            term_bytes(arena, a)
                .cmp(term_bytes(arena, b))
                .then(a.doc_id.cmp(&b.doc_id))
        });

        let path = self.temp_dir.join(format!("run_{:02}.bin", self.runs.len()));
        let mut writer = BufWriter::new(File::create(&path)?);

        let mut last_term = term_bytes(arena, &self.postings[0]);
        let mut last_doc = self.postings[0].doc_id;
        let mut freq = 1u32;
        let mut written = 0u64;
        for posting in &self.postings[1..] {
            let term = term_bytes(arena, posting);
            if term == last_term && posting.doc_id == last_doc {
                freq += 1;
            } else {
                write_record(&mut writer, last_term, last_doc, freq)?;
                written += 1;
                last_term = term;
                last_doc = posting.doc_id;
                freq = 1;
            }
        }
        write_record(&mut writer, last_term, last_doc, freq)?;
        written += 1;
        writer.flush()?;

        log::debug!(
            "flushed run {} ({} postings collapsed to {} records)",
            self.runs.len(),
            self.postings.len(),
            written
        );

        self.postings.clear();
        self.arena.clear();
        self.runs.push(path);
        Ok(())
    }
}

fn term_bytes<'a>(arena: &'a [u8], posting: &ArenaPosting) -> &'a [u8] {
    let start = posting.term_offset as usize;
    &arena[start..start + posting.term_len as usize]
}
