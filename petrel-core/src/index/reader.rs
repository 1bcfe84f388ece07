//! Query-time index loading
//!
//! On startup the lexicon, block metadata, and page table are pulled
//! fully into memory and the block byte offsets are computed as a prefix
//! sum. The compressed index itself stays on disk; cursors read it
//! through the reader's shared file handle with an absolute seek per
//! block load.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use rustc_hash::FxHashMap;

use crate::query::{self, ScoredDoc};
use crate::structures::BlockMetadata;
use crate::tokenizer::{clean_text, tokenize};
use crate::{DocId, Error, Result};

use super::LexiconEntry;

pub const INDEX_FILE: &str = "inverted_index.bin";
pub const LEXICON_FILE: &str = "lexicon.bin";
pub const METADATA_FILE: &str = "metadata.bin";
pub const PAGE_TABLE_FILE: &str = "page_table.txt";

/// Load the text page table. Lines that fail to parse are skipped.
pub fn load_page_table(path: &Path) -> Result<FxHashMap<DocId, u32>> {
    let reader = BufReader::new(File::open(path)?);
    let mut table = FxHashMap::default();
    for line in reader.lines() {
        let line = line?;
        let mut fields = line.split_ascii_whitespace();
        let (Some(doc_id), Some(len)) = (fields.next(), fields.next()) else {
            continue;
        };
        let (Ok(doc_id), Ok(len)) = (doc_id.parse::<DocId>(), len.parse::<u32>()) else {
            continue;
        };
        table.insert(doc_id, len);
    }
    Ok(table)
}

/// Read lexicon records until EOF, returning the entry vector and the
/// term → slot map.
pub(crate) fn parse_lexicon<R: Read>(
    reader: &mut R,
) -> Result<(Vec<LexiconEntry>, FxHashMap<Vec<u8>, usize>)> {
    let mut entries = Vec::new();
    let mut slots = FxHashMap::default();
    loop {
        let term_len = match reader.read_u32::<LittleEndian>() {
            Ok(len) => len as usize,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };
        let mut term = vec![0u8; term_len];
        reader
            .read_exact(&mut term)
            .map_err(|_| Error::truncated("lexicon term"))?;
        let start_block = reader
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::truncated("lexicon entry"))?;
        let start_index = reader
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::truncated("lexicon entry"))?;
        let list_length = reader
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::truncated("lexicon entry"))?;

        slots.insert(term, entries.len());
        entries.push(LexiconEntry {
            start_block,
            start_index,
            list_length,
        });
    }
    Ok((entries, slots))
}

/// An opened, immutable index ready to answer queries.
pub struct IndexReader {
    lexicon: Vec<LexiconEntry>,
    term_slots: FxHashMap<Vec<u8>, usize>,
    metadata: Vec<BlockMetadata>,
    block_offsets: Vec<u64>,
    page_table: FxHashMap<DocId, u32>,
    avg_doc_length: f64,
    postings: File,
}

impl IndexReader {
    /// Open an index directory using the standard file names.
    pub fn open_dir(dir: &Path) -> Result<Self> {
        Self::open(
            &dir.join(INDEX_FILE),
            &dir.join(LEXICON_FILE),
            &dir.join(METADATA_FILE),
            &dir.join(PAGE_TABLE_FILE),
        )
    }

    pub fn open(
        index_path: &Path,
        lexicon_path: &Path,
        metadata_path: &Path,
        page_table_path: &Path,
    ) -> Result<Self> {
        let postings = File::open(index_path)?;

        let mut lexicon_reader = BufReader::new(File::open(lexicon_path)?);
        let (lexicon, term_slots) = parse_lexicon(&mut lexicon_reader)?;

        let mut metadata_reader = BufReader::new(File::open(metadata_path)?);
        let metadata = BlockMetadata::read_all(&mut metadata_reader)?;

        let page_table = load_page_table(page_table_path)?;
        let avg_doc_length = if page_table.is_empty() {
            0.0
        } else {
            page_table.values().map(|&len| u64::from(len)).sum::<u64>() as f64
                / page_table.len() as f64
        };

        // Byte offset of block i = sum of compressed sizes of blocks 0..i
        let mut block_offsets = Vec::with_capacity(metadata.len());
        let mut offset = 0u64;
        for meta in &metadata {
            block_offsets.push(offset);
            offset += u64::from(meta.doc_size) + u64::from(meta.freq_size);
        }

        log::info!(
            "loaded index: {} terms, {} blocks, {} documents, avg doc length {:.2}",
            lexicon.len(),
            metadata.len(),
            page_table.len(),
            avg_doc_length
        );

        Ok(Self {
            lexicon,
            term_slots,
            metadata,
            block_offsets,
            page_table,
            avg_doc_length,
            postings,
        })
    }

    pub fn lookup(&self, term: &str) -> Option<LexiconEntry> {
        self.term_slots
            .get(term.as_bytes())
            .map(|&slot| self.lexicon[slot])
    }

    pub fn num_terms(&self) -> usize {
        self.lexicon.len()
    }

    pub fn num_blocks(&self) -> usize {
        self.metadata.len()
    }

    pub fn num_documents(&self) -> usize {
        self.page_table.len()
    }

    pub fn avg_doc_length(&self) -> f64 {
        self.avg_doc_length
    }

    /// Evaluate a free-text query: normalize, drop unknown terms, and run
    /// disjunctive DAAT over the survivors. Returns up to `k` results,
    /// highest score first.
    pub fn query(&mut self, text: &str, k: usize) -> Result<Vec<ScoredDoc>> {
        let cleaned = clean_text(text);
        let entries: Vec<LexiconEntry> = tokenize(&cleaned)
            .filter_map(|term| self.lookup(term))
            .collect();
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        query::evaluate(
            &entries,
            &self.metadata,
            &self.block_offsets,
            &self.page_table,
            self.avg_doc_length,
            &mut self.postings,
            k,
        )
    }
}
