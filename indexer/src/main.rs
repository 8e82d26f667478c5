use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use filmquery_core::loader::load_file;
use filmquery_core::persist::{load_meta, load_snapshot, save_snapshot, IndexPaths};
use filmquery_core::{MovieRecord, Snapshot, TokenizerConfig};
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and check the movie catalog snapshot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the snapshot from cleaned JSON/JSONL movie files or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output snapshot directory
        #[arg(long)]
        output: String,
        /// Stem title words before building terms
        #[arg(long, default_value_t = false)]
        stem: bool,
        /// Drop title words shorter than this many characters
        #[arg(long, default_value_t = 2)]
        min_token_len: usize,
        /// Only index single words, no adjacent pairs
        #[arg(long, default_value_t = false)]
        no_bigrams: bool,
    },
    /// Load a snapshot directory and check that catalog and model agree
    Verify {
        #[arg(long)]
        index: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, stem, min_token_len, no_bigrams } => {
            let config = TokenizerConfig { stem, min_token_len, bigrams: !no_bigrams };
            build_index(&input, &output, config)
        }
        Commands::Verify { index } => verify_index(&index),
    }
}

fn input_files(input_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files
}

fn build_index(input: &str, output: &str, config: TokenizerConfig) -> Result<()> {
    let files = input_files(Path::new(input));
    if files.is_empty() {
        bail!("no .json or .jsonl input found at {input}");
    }

    let mut records: Vec<MovieRecord> = Vec::new();
    for file in &files {
        let rows = load_file(file).with_context(|| format!("reading {}", file.display()))?;
        tracing::info!(file = %file.display(), rows = rows.len(), "loaded input file");
        records.extend(rows);
    }

    let snapshot = Snapshot::build(records, config);
    let out_paths = IndexPaths::new(output);
    save_snapshot(&out_paths, &snapshot).with_context(|| format!("writing snapshot to {output}"))?;

    tracing::info!(
        output,
        num_docs = snapshot.catalog.len(),
        num_terms = snapshot.model.vocabulary.len(),
        checksum = snapshot.catalog.checksum(),
        "snapshot build complete"
    );
    Ok(())
}

fn verify_index(index: &str) -> Result<()> {
    let paths = IndexPaths::new(index);
    let meta = load_meta(&paths).context("reading meta.json")?;
    let snapshot = load_snapshot(&paths).context("loading snapshot")?;
    if meta.catalog_checksum != snapshot.catalog.checksum() {
        bail!("meta.json checksum {} does not match catalog {}", meta.catalog_checksum, snapshot.catalog.checksum());
    }
    tracing::info!(
        index,
        num_docs = meta.num_docs,
        num_terms = meta.num_terms,
        created_at = %meta.created_at,
        "snapshot ok"
    );
    Ok(())
}
