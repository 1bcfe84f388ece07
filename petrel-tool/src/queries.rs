//! Query input loading: qrels id enumeration and query text files

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};

/// Collect the unique query ids named by a qrels file, in first-seen
/// order. Only the first whitespace-separated field of each line is
/// consumed; lines without a leading integer are skipped.
pub fn load_query_ids(path: &Path) -> Result<Vec<u32>> {
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("failed to open qrels file {}", path.display()))?,
    );
    let mut seen = FxHashSet::default();
    let mut ids = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let Some(first) = line.split_ascii_whitespace().next() else {
            continue;
        };
        let Ok(id) = first.parse::<u32>() else {
            continue;
        };
        if seen.insert(id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Load a queries file of `<queryId><ws><text>` lines into an id -> raw
/// text map. Normalization happens at evaluation time so passages and
/// queries share one code path.
pub fn load_queries(path: &Path) -> Result<FxHashMap<u32, String>> {
    let reader = BufReader::new(
        File::open(path)
            .with_context(|| format!("failed to open queries file {}", path.display()))?,
    );
    let mut queries = FxHashMap::default();
    for line in reader.lines() {
        let line = line?;
        let Some((id_token, text)) = line.trim_start().split_once(|c: char| c == '\t' || c == ' ')
        else {
            continue;
        };
        let Ok(id) = id_token.parse::<u32>() else {
            continue;
        };
        queries.insert(id, text.to_string());
    }
    Ok(queries)
}
