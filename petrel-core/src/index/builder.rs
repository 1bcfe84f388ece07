//! Compressed index construction
//!
//! Consumes the globally sorted merged stream one record at a time and
//! emits three files: the compressed index (concatenated block bodies),
//! the lexicon (one entry per term, in completion = sorted order), and
//! the packed block metadata.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::structures::{compress_block, read_record, Block, BlockMetadata};
use crate::Result;

use super::LexiconEntry;

/// Counters reported by a build.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildStats {
    pub terms: u64,
    pub postings: u64,
    pub blocks: u32,
}

fn write_lexicon_entry<W: Write>(writer: &mut W, term: &[u8], entry: LexiconEntry) -> Result<()> {
    writer.write_u32::<LittleEndian>(term.len() as u32)?;
    writer.write_all(term)?;
    writer.write_u32::<LittleEndian>(entry.start_block)?;
    writer.write_u32::<LittleEndian>(entry.start_index)?;
    writer.write_u32::<LittleEndian>(entry.list_length)?;
    Ok(())
}

/// Build the compressed index from the merged record stream.
///
/// Blocks are cut every [`crate::structures::BLOCK_SIZE`] postings with
/// no regard for term boundaries; the trailing block may be partial. A
/// term's lexicon entry is emitted when the stream moves past it, using
/// the block/index position remembered at its first posting.
pub fn build_index<R: Read>(
    merged: &mut R,
    index_path: &Path,
    lexicon_path: &Path,
    metadata_path: &Path,
) -> Result<BuildStats> {
    let mut index_out = BufWriter::new(File::create(index_path)?);
    let mut lexicon_out = BufWriter::new(File::create(lexicon_path)?);
    let mut metadata_out = BufWriter::new(File::create(metadata_path)?);

    let mut block = Block::new();
    let mut metadata: Vec<BlockMetadata> = Vec::new();
    let mut doc_buf: Vec<u8> = Vec::with_capacity(1024);
    let mut freq_buf: Vec<u8> = Vec::with_capacity(512);

    let mut current_term: Option<Vec<u8>> = None;
    let mut block_count = 0u32;
    let mut term_start_block = 0u32;
    let mut term_start_index = 0u32;
    let mut term_postings = 0u32;

    let mut stats = BuildStats::default();

    while let Some(record) = read_record(merged)? {
        let term_changed = current_term.as_deref() != Some(record.term.as_slice());
        if term_changed {
            if let Some(term) = current_term.take() {
                write_lexicon_entry(
                    &mut lexicon_out,
                    &term,
                    LexiconEntry {
                        start_block: term_start_block,
                        start_index: term_start_index,
                        list_length: term_postings,
                    },
                )?;
                stats.terms += 1;
            }
            current_term = Some(record.term);
            term_start_block = block_count;
            term_start_index = block.len() as u32;
            term_postings = 0;
        }

        block.push(record.doc_id, record.freq);
        term_postings += 1;
        stats.postings += 1;

        if block.is_full() {
            let meta = compress_block(&block, &mut doc_buf, &mut freq_buf);
            index_out.write_all(&doc_buf)?;
            index_out.write_all(&freq_buf)?;
            metadata.push(meta);
            block_count += 1;
            block.clear();
        }
    }

    if let Some(term) = current_term {
        if !block.is_empty() {
            let meta = compress_block(&block, &mut doc_buf, &mut freq_buf);
            index_out.write_all(&doc_buf)?;
            index_out.write_all(&freq_buf)?;
            metadata.push(meta);
            block_count += 1;
        }
        write_lexicon_entry(
            &mut lexicon_out,
            &term,
            LexiconEntry {
                start_block: term_start_block,
                start_index: term_start_index,
                list_length: term_postings,
            },
        )?;
        stats.terms += 1;
    }

    for meta in &metadata {
        meta.write_into(&mut metadata_out)?;
    }
    stats.blocks = block_count;

    index_out.flush()?;
    lexicon_out.flush()?;
    metadata_out.flush()?;

    log::info!(
        "built index: {} terms, {} postings, {} blocks",
        stats.terms,
        stats.postings,
        stats.blocks
    );
    Ok(stats)
}
