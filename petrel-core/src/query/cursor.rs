//! Per-term posting-list cursor
//!
//! One cursor per query term. It tracks a position in the term's span of
//! blocks, keeps the current block's two compressed streams in memory,
//! and decodes `(gap, freq)` pairs lazily. `final_block` fences decoding
//! so a cursor never walks into the next term's blocks; within its first
//! block the cursor skips the `start_index` leading postings that belong
//! to earlier terms.

use std::io::{Read, Seek, SeekFrom};

use crate::index::LexiconEntry;
use crate::query::bm25;
use crate::structures::{varbyte_decode, BlockMetadata};
use crate::{DocId, Error, Result, Score, TermFreq};

/// Sentinel returned by an exhausted cursor.
pub const TERMINATED: DocId = DocId::MAX;

pub struct ListCursor {
    list_length: u32,
    start_block: u32,
    start_index: u32,
    final_block: u32,

    block_num: u32,
    current_pos: u32,
    current_doc: DocId,
    current_freq: TermFreq,
    prev_doc_id: DocId,

    doc_buf: Vec<u8>,
    freq_buf: Vec<u8>,
    doc_pos: usize,
    freq_pos: usize,
}

fn read_exact_or_corrupt<R: Read>(src: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    src.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::truncated(what)
        } else {
            Error::Io(e)
        }
    })
}

impl ListCursor {
    pub fn new(entry: LexiconEntry) -> Self {
        Self {
            list_length: entry.list_length,
            start_block: entry.start_block,
            start_index: entry.start_index,
            final_block: entry.final_block(),
            block_num: entry.start_block,
            current_pos: 0,
            current_doc: 0,
            current_freq: 0,
            prev_doc_id: 0,
            doc_buf: Vec::new(),
            freq_buf: Vec::new(),
            doc_pos: 0,
            freq_pos: 0,
        }
    }

    /// Load the cursor's current block: seek to its byte offset, pull the
    /// two compressed streams, and reset the delta base. On the term's
    /// first block the `start_index` leading postings are decoded away so
    /// the next decode yields the term's first posting.
    pub fn load_block<R: Read + Seek>(
        &mut self,
        src: &mut R,
        metadata: &[BlockMetadata],
        block_offsets: &[u64],
    ) -> Result<()> {
        let block = self.block_num as usize;
        if block >= metadata.len() {
            return Ok(());
        }

        src.seek(SeekFrom::Start(block_offsets[block]))?;
        let meta = &metadata[block];
        self.doc_buf.resize(meta.doc_size as usize, 0);
        read_exact_or_corrupt(src, &mut self.doc_buf, "block docId stream")?;
        self.freq_buf.resize(meta.freq_size as usize, 0);
        read_exact_or_corrupt(src, &mut self.freq_buf, "block freq stream")?;

        self.doc_pos = 0;
        self.freq_pos = 0;
        self.prev_doc_id = 0;

        if self.block_num == self.start_block && self.start_index > 0 {
            for _ in 0..self.start_index {
                let gap = varbyte_decode(&self.doc_buf, &mut self.doc_pos)?;
                self.prev_doc_id = self.prev_doc_id.wrapping_add(gap);
                varbyte_decode(&self.freq_buf, &mut self.freq_pos)?;
            }
        }
        Ok(())
    }

    /// Advance to the first posting with docId >= `target`, or
    /// [`TERMINATED`] when the term's postings are exhausted.
    ///
    /// Decodes linearly, one `(gap, freq)` pair at a time, loading the
    /// next block when the current buffers run dry. The returned docIds
    /// are non-decreasing across calls with non-decreasing targets, and
    /// exactly `list_length` postings are produced before exhaustion.
    pub fn next_geq<R: Read + Seek>(
        &mut self,
        target: DocId,
        src: &mut R,
        metadata: &[BlockMetadata],
        block_offsets: &[u64],
    ) -> Result<DocId> {
        if self.current_pos >= self.list_length {
            return Ok(TERMINATED);
        }

        loop {
            if self.doc_pos >= self.doc_buf.len() {
                self.block_num += 1;
                if self.block_num > self.final_block || self.block_num as usize >= metadata.len() {
                    return Ok(TERMINATED);
                }
                self.load_block(src, metadata, block_offsets)?;
            }

            let gap = varbyte_decode(&self.doc_buf, &mut self.doc_pos)?;
            self.prev_doc_id = self.prev_doc_id.wrapping_add(gap);
            let freq = varbyte_decode(&self.freq_buf, &mut self.freq_pos)?;

            self.current_pos += 1;
            self.current_doc = self.prev_doc_id;
            self.current_freq = freq;

            if self.current_doc >= target {
                return Ok(self.current_doc);
            }
            if self.current_pos >= self.list_length {
                return Ok(TERMINATED);
            }
        }
    }

    /// BM25 for the current posting against the given document length.
    pub fn score(&self, doc_length: u32, avg_doc_length: f64) -> Score {
        bm25::score(self.current_freq, self.list_length, doc_length, avg_doc_length)
    }

    pub fn doc(&self) -> DocId {
        self.current_doc
    }

    pub fn term_freq(&self) -> TermFreq {
        self.current_freq
    }

    pub fn list_length(&self) -> u32 {
        self.list_length
    }
}
