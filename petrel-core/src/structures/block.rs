//! Fixed-size compressed posting blocks
//!
//! The compressed index is a flat sequence of block bodies. Each block
//! holds up to [`BLOCK_SIZE`] postings drawn from the globally sorted
//! stream; blocks are not term-aligned, so one block may carry the tail
//! of one term and the head of the next. DocIds are gap-encoded from
//! zero within each block (never across a block boundary) and the gaps
//! varbyte-packed; freqs are varbyte-packed raw. Gaps use wrapping u32
//! arithmetic so the docId reset at a term boundary survives the round
//! trip.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{DocId, Result, TermFreq};

use super::varbyte::varbyte_encode;

/// Postings per block. All blocks are full except possibly the last.
pub const BLOCK_SIZE: usize = 128;

/// An uncompressed block under accumulation: parallel docId/freq columns.
#[derive(Debug, Default)]
pub struct Block {
    pub doc_ids: Vec<DocId>,
    pub freqs: Vec<TermFreq>,
}

impl Block {
    pub fn new() -> Self {
        Self {
            doc_ids: Vec::with_capacity(BLOCK_SIZE),
            freqs: Vec::with_capacity(BLOCK_SIZE),
        }
    }

    pub fn push(&mut self, doc_id: DocId, freq: TermFreq) {
        self.doc_ids.push(doc_id);
        self.freqs.push(freq);
    }

    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.doc_ids.len() == BLOCK_SIZE
    }

    pub fn clear(&mut self) {
        self.doc_ids.clear();
        self.freqs.clear();
    }
}

/// Per-block descriptor: last docId in the block plus the compressed
/// byte lengths of the two streams. The byte offset of block `i` in the
/// index file is the prefix sum of `doc_size + freq_size` over blocks
/// `0..i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMetadata {
    pub last_doc_id: DocId,
    pub doc_size: u32,
    pub freq_size: u32,
}

impl BlockMetadata {
    /// Serialize one packed `(u32, u32, u32)` entry.
    pub fn write_into<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.last_doc_id)?;
        writer.write_u32::<LittleEndian>(self.doc_size)?;
        writer.write_u32::<LittleEndian>(self.freq_size)?;
        Ok(())
    }

    /// Read packed entries until EOF; entry count is inferred from the
    /// stream length.
    pub fn read_all<R: Read>(reader: &mut R) -> Result<Vec<BlockMetadata>> {
        let mut entries = Vec::new();
        loop {
            let last_doc_id = match reader.read_u32::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            };
            let doc_size = reader
                .read_u32::<LittleEndian>()
                .map_err(|_| crate::Error::truncated("metadata entry"))?;
            let freq_size = reader
                .read_u32::<LittleEndian>()
                .map_err(|_| crate::Error::truncated("metadata entry"))?;
            entries.push(BlockMetadata {
                last_doc_id,
                doc_size,
                freq_size,
            });
        }
        Ok(entries)
    }
}

/// Compress one block into `doc_buf`/`freq_buf` (cleared first) and
/// return its metadata entry. The caller writes `doc_buf` then
/// `freq_buf` contiguously to the index file.
pub fn compress_block(block: &Block, doc_buf: &mut Vec<u8>, freq_buf: &mut Vec<u8>) -> BlockMetadata {
    debug_assert!(!block.is_empty(), "cannot compress an empty block");

    doc_buf.clear();
    let mut prev = 0u32;
    for &doc_id in &block.doc_ids {
        // Wrapping: at a term boundary inside the block the next docId can
        // be smaller than the previous one, and decode re-wraps the sum.
        varbyte_encode(doc_id.wrapping_sub(prev), doc_buf);
        prev = doc_id;
    }

    freq_buf.clear();
    for &freq in &block.freqs {
        varbyte_encode(freq, freq_buf);
    }

    BlockMetadata {
        last_doc_id: *block.doc_ids.last().unwrap(),
        doc_size: doc_buf.len() as u32,
        freq_size: freq_buf.len() as u32,
    }
}
