//! K-way merge of sorted posting runs
//!
//! Streams all temp runs into one globally sorted record stream using a
//! min-heap holding the head record of each open run. Each docId lives in
//! exactly one run (flushes are document-aligned), so within a term the
//! merged docIds are strictly increasing and no re-collapse is needed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::structures::{read_record, write_record, PostingRecord};
use crate::Result;

/// Heap entry: one head record plus the run it came from, so the popped
/// run can be refilled.
struct MergeEntry {
    record: PostingRecord,
    source: usize,
}

impl PartialEq for MergeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.record.term == other.record.term && self.record.doc_id == other.record.doc_id
    }
}

impl Eq for MergeEntry {}

impl PartialOrd for MergeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default)
        other
            .record
            .term
            .cmp(&self.record.term)
            .then_with(|| other.record.doc_id.cmp(&self.record.doc_id))
    }
}

/// Merge `runs` into a single sorted record file at `output`. Returns the
/// number of records written.
///
/// Any run that fails to open is fatal. The writer batches records in a
/// `merge_buffer_bytes`-sized buffer, flushing when the next record would
/// not fit and once at the end.
pub fn merge_runs(runs: &[impl AsRef<Path>], output: &Path, merge_buffer_bytes: usize) -> Result<u64> {
    let mut inputs = Vec::with_capacity(runs.len());
    for run in runs {
        inputs.push(BufReader::new(File::open(run.as_ref())?));
    }

    let mut writer = BufWriter::with_capacity(merge_buffer_bytes, File::create(output)?);

    let mut heap = BinaryHeap::with_capacity(inputs.len());
    for (source, input) in inputs.iter_mut().enumerate() {
        if let Some(record) = read_record(input)? {
            heap.push(MergeEntry { record, source });
        }
    }

    let mut written = 0u64;
    while let Some(MergeEntry { record, source }) = heap.pop() {
        write_record(&mut writer, &record.term, record.doc_id, record.freq)?;
        written += 1;

        if written % 1_000_000 == 0 {
            log::debug!("merge progress: {written} records");
        }

        if let Some(next) = read_record(&mut inputs[source])? {
            heap.push(MergeEntry {
                record: next,
                source,
            });
        }
    }

    writer.flush()?;
    log::info!("merged {} runs into {} records", runs.len(), written);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_run(path: &Path, records: &[(&[u8], u32, u32)]) {
        let mut writer = BufWriter::new(File::create(path).unwrap());
        for &(term, doc, freq) in records {
            write_record(&mut writer, term, doc, freq).unwrap();
        }
        writer.flush().unwrap();
    }

    fn read_all(path: &Path) -> Vec<(Vec<u8>, u32, u32)> {
        let mut reader = BufReader::new(File::open(path).unwrap());
        let mut out = Vec::new();
        while let Some(rec) = read_record(&mut reader).unwrap() {
            out.push((rec.term, rec.doc_id, rec.freq));
        }
        out
    }

    #[test]
    fn test_two_run_merge() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        write_run(&a, &[(b"a", 1, 1), (b"b", 2, 1)]);
        write_run(&b, &[(b"a", 2, 1), (b"c", 1, 1)]);

        let out = dir.path().join("merged.bin");
        let written = merge_runs(&[&a, &b], &out, 1 << 16).unwrap();
        assert_eq!(written, 4);

        let merged = read_all(&out);
        assert_eq!(
            merged,
            vec![
                (b"a".to_vec(), 1, 1),
                (b"a".to_vec(), 2, 1),
                (b"b".to_vec(), 2, 1),
                (b"c".to_vec(), 1, 1),
            ]
        );
    }

    #[test]
    fn test_merge_preserves_multiset() {
        let dir = tempfile::tempdir().unwrap();
        let runs: Vec<_> = (0..4)
            .map(|i| {
                let path = dir.path().join(format!("r{i}.bin"));
                let records: Vec<(Vec<u8>, u32, u32)> = (0..50)
                    .map(|j| {
                        let term = format!("t{:03}", (i * 7 + j * 3) % 40).into_bytes();
                        (term, (i * 50 + j) as u32, 1 + (j % 3) as u32)
                    })
                    .collect();
                let borrowed: Vec<(&[u8], u32, u32)> = records
                    .iter()
                    .map(|(t, d, f)| (t.as_slice(), *d, *f))
                    .collect();
                let mut sorted = borrowed.clone();
                sorted.sort();
                write_run(&path, &sorted);
                path
            })
            .collect();

        let out = dir.path().join("merged.bin");
        merge_runs(&runs, &out, 1 << 16).unwrap();
        let merged = read_all(&out);
        assert_eq!(merged.len(), 200);

        let mut expected: Vec<(Vec<u8>, u32, u32)> = runs.iter().flat_map(|r| read_all(r)).collect();
        expected.sort();
        assert_eq!(merged, expected);

        // Globally sorted by (term, docId)
        for pair in merged.windows(2) {
            assert!((&pair[0].0, pair[0].1) <= (&pair[1].0, pair[1].1));
        }
    }

    #[test]
    fn test_empty_run_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let empty = dir.path().join("empty.bin");
        write_run(&a, &[(b"x", 5, 2)]);
        File::create(&empty).unwrap();

        let out = dir.path().join("merged.bin");
        assert_eq!(merge_runs(&[&a, &empty], &out, 1 << 12).unwrap(), 1);
    }

    #[test]
    fn test_missing_run_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.bin");
        let out = dir.path().join("merged.bin");
        assert!(merge_runs(&[&missing], &out, 1 << 12).is_err());
    }
}
