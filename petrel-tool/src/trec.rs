//! TREC run-file output

use std::io::{self, Write};

use petrel_core::ScoredDoc;

/// Append one query's ranked results in TREC format, truncated to `k`:
/// `<queryId> Q0 <docId> <rank> <score> BM25`, rank starting at 1,
/// score with six decimals.
pub fn write_trec_results<W: Write>(
    writer: &mut W,
    query_id: u32,
    ranked: &[ScoredDoc],
    k: usize,
) -> io::Result<()> {
    for (i, doc) in ranked.iter().take(k).enumerate() {
        writeln!(
            writer,
            "{} Q0 {} {} {:.6} BM25",
            query_id,
            doc.doc_id,
            i + 1,
            doc.score
        )?;
    }
    Ok(())
}
