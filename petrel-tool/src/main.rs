//! Petrel Tool - CLI for building and querying petrel indexes
//!
//! # Pipeline Commands
//!
//! - `parse` - Tokenize a passage corpus into sorted posting runs and a page table
//! - `merge` - K-way merge the sorted runs into one posting stream
//! - `build` - Compress the merged stream into the inverted index, lexicon, and metadata
//!
//! # Query Commands
//!
//! - `search` - Run a single ad-hoc query and print the ranked results
//! - `batch` - Evaluate every query named by a qrels file and write TREC run files
//!
//! # Examples
//!
//! ```bash
//! petrel-tool parse -c passages.tsv -i ./index
//! petrel-tool merge -i ./index
//! petrel-tool build -i ./index
//! petrel-tool search -i ./index -q "what is bm25" -k 10
//! petrel-tool batch -i ./index --qrels qrels.dev.tsv --queries queries.dev.tsv -o bm25.dev
//! ```

mod queries;
mod trec;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use petrel_core::{
    build_index, merge_runs, write_page_table, BuildConfig, IndexReader, PassageParser,
    DEFAULT_TOP_K, INDEX_FILE, LEXICON_FILE, METADATA_FILE, PAGE_TABLE_FILE,
};

const MERGED_FILE: &str = "merged.bin";

#[derive(Parser)]
#[command(name = "petrel-tool")]
#[command(version, about = "CLI for building and querying petrel BM25 indexes")]
#[command(after_help = "Use 'petrel-tool <command> --help' for more information.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize a passage corpus into sorted posting runs and a page table
    Parse {
        /// Path to the corpus TSV (`<docId>\t<text>` per line)
        #[arg(short, long)]
        corpus: PathBuf,

        /// Index directory for runs and the page table
        #[arg(short, long)]
        index: PathBuf,

        /// Expected corpus size in documents
        #[arg(long, default_value = "1000000")]
        dataset_size: u32,

        /// Number of sorted runs to aim for
        #[arg(long, default_value = "16")]
        temp_files: u32,
    },

    /// Merge the sorted runs into one globally sorted posting stream
    Merge {
        /// Index directory holding the runs
        #[arg(short, long)]
        index: PathBuf,
    },

    /// Compress the merged stream into index, lexicon, and metadata files
    Build {
        /// Index directory holding the merged stream
        #[arg(short, long)]
        index: PathBuf,
    },

    /// Run one query and print the ranked results
    Search {
        /// Index directory
        #[arg(short, long)]
        index: PathBuf,

        /// Query text
        #[arg(short, long)]
        query: String,

        /// Number of results
        #[arg(short, long, default_value = "10")]
        k: usize,
    },

    /// Evaluate all queries named by a qrels file; write TREC run files
    Batch {
        /// Index directory
        #[arg(short, long)]
        index: PathBuf,

        /// Qrels file enumerating the query ids (first field per line)
        #[arg(long)]
        qrels: PathBuf,

        /// Queries file (`<queryId>\t<text>` per line)
        #[arg(long)]
        queries: PathBuf,

        /// Output prefix; writes `<prefix>.top100.trec` and `<prefix>.top1000.trec`
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("petrel_tool=info".parse()?)
                .add_directive("petrel_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            corpus,
            index,
            dataset_size,
            temp_files,
        } => parse_corpus(corpus, index, dataset_size, temp_files)?,
        Commands::Merge { index } => merge_index(index)?,
        Commands::Build { index } => build_compressed_index(index)?,
        Commands::Search { index, query, k } => search(index, &query, k)?,
        Commands::Batch {
            index,
            qrels,
            queries,
            output,
        } => batch(index, qrels, queries, output)?,
    }

    Ok(())
}

fn parse_corpus(corpus: PathBuf, index: PathBuf, dataset_size: u32, temp_files: u32) -> Result<()> {
    let start = Instant::now();
    fs::create_dir_all(&index)?;

    let reader = BufReader::new(
        File::open(&corpus)
            .with_context(|| format!("failed to open corpus {}", corpus.display()))?,
    );
    let config = BuildConfig {
        dataset_size,
        temp_file_count: temp_files,
        ..BuildConfig::default()
    };
    let parser = PassageParser::new(&index, config);
    let output = parser.parse_corpus(reader)?;

    write_page_table(&output.page_table, &index.join(PAGE_TABLE_FILE))?;

    info!(
        "parsed {} documents into {} runs in {} ms",
        output.docs,
        output.runs.len(),
        start.elapsed().as_millis()
    );
    Ok(())
}

/// The runs written by `parse`, in flush order.
fn run_files(index: &Path) -> Result<Vec<PathBuf>> {
    let mut runs: Vec<PathBuf> = fs::read_dir(index)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("run_") && name.ends_with(".bin"))
        })
        .collect();
    runs.sort();
    Ok(runs)
}

fn merge_index(index: PathBuf) -> Result<()> {
    let start = Instant::now();
    let runs = run_files(&index)?;
    anyhow::ensure!(!runs.is_empty(), "no runs found in {}", index.display());

    let config = BuildConfig::default();
    let records = merge_runs(&runs, &index.join(MERGED_FILE), config.merge_buffer_bytes)?;

    info!(
        "merged {} runs ({} records) in {} ms",
        runs.len(),
        records,
        start.elapsed().as_millis()
    );
    Ok(())
}

fn build_compressed_index(index: PathBuf) -> Result<()> {
    let start = Instant::now();
    let merged = index.join(MERGED_FILE);
    let mut reader = BufReader::new(
        File::open(&merged)
            .with_context(|| format!("failed to open merged stream {}", merged.display()))?,
    );

    let stats = build_index(
        &mut reader,
        &index.join(INDEX_FILE),
        &index.join(LEXICON_FILE),
        &index.join(METADATA_FILE),
    )?;

    info!(
        "built {} terms / {} postings / {} blocks in {} ms",
        stats.terms,
        stats.postings,
        stats.blocks,
        start.elapsed().as_millis()
    );
    Ok(())
}

fn search(index: PathBuf, query: &str, k: usize) -> Result<()> {
    let mut reader = IndexReader::open_dir(&index)?;
    let start = Instant::now();
    let results = reader.query(query, k)?;
    info!(
        "{} results in {} ms",
        results.len(),
        start.elapsed().as_millis()
    );

    for (rank, doc) in results.iter().enumerate() {
        println!("{}\t{}\t{:.6}", rank + 1, doc.doc_id, doc.score);
    }
    Ok(())
}

/// Queries are flushed to the TREC writers in batches of this many.
const BATCH_FLUSH: usize = 100;

fn batch(index: PathBuf, qrels: PathBuf, queries_path: PathBuf, output: PathBuf) -> Result<()> {
    let start = Instant::now();
    let mut reader = IndexReader::open_dir(&index)?;

    let ids = queries::load_query_ids(&qrels)?;
    let query_map = queries::load_queries(&queries_path)?;
    info!("{} unique queries from {}", ids.len(), qrels.display());

    let top100_path = PathBuf::from(format!("{}.top100.trec", output.display()));
    let top1000_path = PathBuf::from(format!("{}.top1000.trec", output.display()));
    let mut top100 = BufWriter::new(File::create(&top100_path)?);
    let mut top1000 = BufWriter::new(File::create(&top1000_path)?);

    let mut buffer: Vec<(u32, Vec<petrel_core::ScoredDoc>)> = Vec::with_capacity(BATCH_FLUSH);
    let mut evaluated = 0usize;
    for &query_id in &ids {
        let results = match query_map.get(&query_id) {
            Some(text) => reader.query(text, DEFAULT_TOP_K)?,
            None => Vec::new(),
        };
        buffer.push((query_id, results));
        evaluated += 1;

        if buffer.len() == BATCH_FLUSH {
            for (id, ranked) in &buffer {
                trec::write_trec_results(&mut top100, *id, ranked, 100)?;
                trec::write_trec_results(&mut top1000, *id, ranked, 1000)?;
            }
            buffer.clear();
            info!("evaluated {evaluated}/{} queries", ids.len());
        }
    }
    for (id, ranked) in &buffer {
        trec::write_trec_results(&mut top100, *id, ranked, 100)?;
        trec::write_trec_results(&mut top1000, *id, ranked, 1000)?;
    }

    use std::io::Write;
    top100.flush()?;
    top1000.flush()?;

    info!(
        "wrote {} and {} in {} ms",
        top100_path.display(),
        top1000_path.display(),
        start.elapsed().as_millis()
    );
    Ok(())
}
