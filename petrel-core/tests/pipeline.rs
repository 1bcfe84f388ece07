//! End-to-end pipeline tests: corpus -> sorted runs -> merge -> build ->
//! load -> query, with results checked against a brute-force BM25 scorer.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use petrel_core::query::bm25;
use petrel_core::tokenizer::{clean_text, tokenize};
use petrel_core::{
    build_index, load_page_table, merge_runs, write_page_table, BuildConfig, IndexReader,
    PassageParser, ScoredDoc, INDEX_FILE, LEXICON_FILE, METADATA_FILE, PAGE_TABLE_FILE,
};

/// Deterministic synthetic corpus: `docs` passages over a small shared
/// vocabulary. Doc lengths and term mixes vary unless `uniform` is set,
/// in which case every doc is eight distinct terms (keeping list upper
/// bounds strict so pruned and unpruned runs agree).
fn synth_corpus(docs: u32, uniform: bool) -> String {
    let vocab = [
        "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india",
        "juliet", "kilo", "lima", "mike", "november", "oscar", "papa", "quebec", "romeo",
        "sierra", "tango",
    ];
    let mut corpus = String::new();
    for doc in 0..docs {
        let mut text = String::new();
        if uniform {
            for slot in 0..8u32 {
                let term = vocab[((doc * 5 + slot * 3 + doc * doc % 7) % 20) as usize];
                if !text.split_ascii_whitespace().any(|t| t == term) {
                    text.push_str(term);
                    text.push(' ');
                }
            }
            // Pad with unused distinct terms to exactly eight tokens
            let mut filler = vocab.iter().cycle().skip((doc % 20) as usize);
            while text.split_ascii_whitespace().count() < 8 {
                let term = filler.next().unwrap();
                if !text.split_ascii_whitespace().any(|t| t == *term) {
                    text.push_str(term);
                    text.push(' ');
                }
            }
        } else {
            let len = 3 + (doc * 7 % 9);
            for slot in 0..len {
                let term = vocab[((doc + slot * slot + doc * 3) % 20) as usize];
                text.push_str(term);
                text.push(' ');
            }
        }
        corpus.push_str(&format!("{doc}\t{text}\n"));
    }
    corpus
}

/// Run the full build pipeline into `dir` and return an opened reader.
fn build_pipeline(corpus: &str, dir: &Path, config: BuildConfig) -> IndexReader {
    let merge_buffer = config.merge_buffer_bytes;
    let parser = PassageParser::new(dir, config);
    let output = parser.parse_corpus(Cursor::new(corpus)).unwrap();
    assert!(!output.runs.is_empty());

    write_page_table(&output.page_table, &dir.join(PAGE_TABLE_FILE)).unwrap();

    let merged = dir.join("merged.bin");
    merge_runs(&output.runs, &merged, merge_buffer).unwrap();

    let mut merged_reader = std::io::BufReader::new(std::fs::File::open(&merged).unwrap());
    build_index(
        &mut merged_reader,
        &dir.join(INDEX_FILE),
        &dir.join(LEXICON_FILE),
        &dir.join(METADATA_FILE),
    )
    .unwrap();

    IndexReader::open_dir(dir).unwrap()
}

/// Brute-force BM25 over the raw corpus: scores every document in the
/// union of the query terms' lists.
fn reference_topk(corpus: &str, query: &str, k: usize) -> Vec<ScoredDoc> {
    let mut term_freqs: BTreeMap<&str, BTreeMap<u32, u32>> = BTreeMap::new();
    let mut doc_lengths: BTreeMap<u32, u32> = BTreeMap::new();

    let cleaned_docs: Vec<(u32, String)> = corpus
        .lines()
        .filter_map(|line| {
            let (id, text) = line.split_once(['\t', ' '])?;
            Some((id.parse().ok()?, clean_text(text)))
        })
        .collect();
    for (doc_id, cleaned) in &cleaned_docs {
        let mut len = 0u32;
        for term in tokenize(cleaned) {
            len += 1;
            *term_freqs
                .entry(term)
                .or_default()
                .entry(*doc_id)
                .or_insert(0) += 1;
        }
        doc_lengths.insert(*doc_id, len);
    }

    let avg = doc_lengths.values().map(|&l| u64::from(l)).sum::<u64>() as f64
        / doc_lengths.len() as f64;

    let cleaned_query = clean_text(query);
    let mut query_terms: Vec<&str> = tokenize(&cleaned_query)
        .filter(|t| term_freqs.contains_key(t))
        .collect();
    // Accumulate in the engine's evaluation order (ascending upper bound)
    // so floating-point sums match bit for bit
    query_terms.sort_by(|a, b| {
        let bound = |t: &&str| bm25::upper_bound(term_freqs[*t].len() as u32);
        bound(a).partial_cmp(&bound(b)).unwrap()
    });

    let mut scores: BTreeMap<u32, f64> = BTreeMap::new();
    for term in &query_terms {
        let postings = &term_freqs[term];
        let df = postings.len() as u32;
        for (&doc_id, &tf) in postings {
            *scores.entry(doc_id).or_insert(0.0) +=
                bm25::score(tf, df, doc_lengths[&doc_id], avg);
        }
    }

    let mut ranked: Vec<ScoredDoc> = scores
        .into_iter()
        .map(|(doc_id, score)| ScoredDoc { doc_id, score })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap()
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    ranked.truncate(k);
    ranked
}

fn assert_rankings_match(got: &[ScoredDoc], want: &[ScoredDoc]) {
    assert_eq!(
        got.iter().map(|d| d.doc_id).collect::<Vec<_>>(),
        want.iter().map(|d| d.doc_id).collect::<Vec<_>>()
    );
    for (g, w) in got.iter().zip(want) {
        assert!(
            (g.score - w.score).abs() < 1e-9,
            "doc {}: {} vs {}",
            g.doc_id,
            g.score,
            w.score
        );
    }
}

fn small_config() -> BuildConfig {
    BuildConfig {
        dataset_size: 64,
        temp_file_count: 4,
        posting_buffer_bytes: 1 << 16,
        term_arena_bytes: 1 << 16,
        merge_buffer_bytes: 1 << 16,
    }
}

#[test]
fn test_full_pipeline_matches_reference() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = synth_corpus(64, false);
    let mut reader = build_pipeline(&corpus, dir.path(), small_config());

    assert_eq!(reader.num_documents(), 64);
    assert!(reader.num_terms() <= 20);

    // k larger than any union: no pruning can fire, results must be exact
    for query in ["alpha", "alpha bravo", "echo tango kilo", "november romeo"] {
        let got = reader.query(query, 1000).unwrap();
        let want = reference_topk(&corpus, query, 1000);
        assert_rankings_match(&got, &want);
    }
}

#[test]
fn test_pruned_topk_matches_reference() {
    let dir = tempfile::tempdir().unwrap();
    // Uniform doc lengths keep every list's upper bound valid, so the
    // pruned top-k must equal the brute-force top-k exactly
    let corpus = synth_corpus(64, true);
    let mut reader = build_pipeline(&corpus, dir.path(), small_config());

    for query in ["alpha bravo charlie", "delta echo", "tango sierra quebec kilo"] {
        for k in [1usize, 3, 5, 10] {
            let got = reader.query(query, k).unwrap();
            let want = reference_topk(&corpus, query, k);
            assert_rankings_match(&got, &want);
        }
    }
}

#[test]
fn test_unknown_terms_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = synth_corpus(16, false);
    let mut reader = build_pipeline(&corpus, dir.path(), small_config());

    let with_unknown = reader.query("alpha zzzzunknown", 100).unwrap();
    let without = reader.query("alpha", 100).unwrap();
    assert_eq!(with_unknown, without);

    assert!(reader.query("zzzzunknown qqq", 100).unwrap().is_empty());
    assert!(reader.query("", 100).unwrap().is_empty());
}

#[test]
fn test_results_ordered_and_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = synth_corpus(40, false);
    let mut reader = build_pipeline(&corpus, dir.path(), small_config());

    let results = reader.query("alpha bravo charlie delta", 7).unwrap();
    assert!(results.len() <= 7);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn test_page_table_survives_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = synth_corpus(10, false);
    let config = small_config();
    let parser = PassageParser::new(dir.path(), config);
    let output = parser.parse_corpus(Cursor::new(corpus.as_str())).unwrap();
    let path = dir.path().join(PAGE_TABLE_FILE);
    write_page_table(&output.page_table, &path).unwrap();
    assert_eq!(load_page_table(&path).unwrap(), output.page_table);
}
