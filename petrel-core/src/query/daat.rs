//! Disjunctive Document-At-A-Time evaluation with MaxScore-style pruning
//!
//! Walks the union of the query terms' posting lists in ascending docId
//! order, scoring one candidate document at a time into a bounded min-heap.
//! Cursors are visited in ascending upper-bound order; lists not matching
//! the candidate contribute only their upper bound, and once the heap is
//! full a candidate whose exact-plus-bound total cannot displace the heap
//! minimum is discarded. Contributing cursors are advanced past the
//! candidate before the prune test, so a discarded candidate can never
//! re-enter.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::{Read, Seek};

use rustc_hash::FxHashMap;

use crate::index::LexiconEntry;
use crate::query::bm25;
use crate::query::cursor::{ListCursor, TERMINATED};
use crate::structures::BlockMetadata;
use crate::{DocId, Result, Score};

/// Results returned per query unless a caller asks for fewer.
pub const DEFAULT_TOP_K: usize = 1000;

/// One ranked result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: Score,
}

/// Bounded top-k entry. The heap keeps its *worst* entry on top: lowest
/// score first, and among equal scores the larger docId, so smaller
/// docIds are preferentially retained.
#[derive(Clone, Copy)]
struct HeapEntry {
    doc_id: DocId,
    score: Score,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.doc_id == other.doc_id
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap over a max-heap container: lower scores come first
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

/// Evaluate a disjunctive query over the given posting lists.
///
/// `entries` are the lexicon entries of the query terms that survived
/// lookup; the caller has already dropped unknown terms. Returns up to
/// `k` documents, highest score first; ties order by ascending docId.
pub fn evaluate<R: Read + Seek>(
    entries: &[LexiconEntry],
    metadata: &[BlockMetadata],
    block_offsets: &[u64],
    page_table: &FxHashMap<DocId, u32>,
    avg_doc_length: f64,
    postings: &mut R,
    k: usize,
) -> Result<Vec<ScoredDoc>> {
    if entries.is_empty() || k == 0 {
        return Ok(Vec::new());
    }

    let mut cursors: Vec<ListCursor> = entries.iter().map(|&e| ListCursor::new(e)).collect();
    for cursor in &mut cursors {
        cursor.load_block(postings, metadata, block_offsets)?;
    }

    // Per-list score ceilings; iterate low-impact lists first so the
    // non-matching remainder accumulates the large bounds for pruning.
    let upper_bounds: Vec<Score> = cursors
        .iter()
        .map(|c| bm25::upper_bound(c.list_length()))
        .collect();
    let mut order: Vec<usize> = (0..cursors.len()).collect();
    order.sort_by(|&a, &b| {
        upper_bounds[a]
            .partial_cmp(&upper_bounds[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut curr_doc: Vec<DocId> = Vec::with_capacity(cursors.len());
    for cursor in &mut cursors {
        curr_doc.push(cursor.next_geq(0, postings, metadata, block_offsets)?);
    }

    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(k + 1);

    loop {
        let candidate = curr_doc
            .iter()
            .copied()
            .filter(|&d| d != TERMINATED)
            .min()
            .unwrap_or(TERMINATED);
        if candidate == TERMINATED {
            break;
        }

        let doc_length = page_table.get(&candidate).copied().unwrap_or(0);
        let mut score = 0.0;
        let mut remaining_max = 0.0;

        for &idx in &order {
            if curr_doc[idx] == candidate {
                score += cursors[idx].score(doc_length, avg_doc_length);
                curr_doc[idx] =
                    cursors[idx].next_geq(candidate + 1, postings, metadata, block_offsets)?;
            } else {
                remaining_max += upper_bounds[idx];
            }
        }

        // Even the full remaining ceiling cannot displace the heap minimum
        if heap.len() >= k && score + remaining_max <= heap.peek().map(|e| e.score).unwrap_or(0.0)
        {
            continue;
        }

        if heap.len() < k {
            heap.push(HeapEntry {
                doc_id: candidate,
                score,
            });
        } else if score > heap.peek().map(|e| e.score).unwrap_or(0.0) {
            heap.pop();
            heap.push(HeapEntry {
                doc_id: candidate,
                score,
            });
        }
    }

    // Drain lowest-first, then reverse for highest-score-first output
    let mut results = Vec::with_capacity(heap.len());
    while let Some(entry) = heap.pop() {
        results.push(ScoredDoc {
            doc_id: entry.doc_id,
            score: entry.score,
        });
    }
    results.reverse();
    Ok(results)
}
