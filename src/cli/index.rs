//! Index command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use super::utils::{resolve_config, EncodeArgs};
use crate::encode::TextEncoder;
use crate::pipeline::Localizer;
use crate::scan::FileScanner;
use crate::store::{EmbeddingStore, RepoSnapshot};

pub const DEFAULT_DB: &str = ".redwing/index.sqlite";

#[derive(Args)]
pub struct IndexArgs {
    /// Local repository directory to index
    #[arg(short, long, value_name = "PATH")]
    pub path: PathBuf,

    /// SQLite path for the embedding store
    #[arg(long, value_name = "FILE", default_value = DEFAULT_DB)]
    pub db: PathBuf,

    /// Repository identifier (defaults to the directory name)
    #[arg(long, value_name = "ID")]
    pub repo_id: Option<String>,

    /// Commit to record (defaults to git HEAD)
    #[arg(long, value_name = "SHA")]
    pub commit: Option<String>,

    #[command(flatten)]
    pub encode: EncodeArgs,
}

pub fn run(args: IndexArgs) -> Result<()> {
    let config = resolve_config(&args.path, args.encode.config.as_deref(), args.encode.overrides())?;

    let mut scanner = FileScanner::from_config(args.path.clone(), &config);
    let files = scanner.load()?;
    let stats = scanner.stats().clone();

    if let Some(parent) = args.db.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    let mut store = EmbeddingStore::open(&args.db)
        .with_context(|| format!("Failed to open SQLite database at {}", args.db.display()))?;

    let encoder = TextEncoder::from_config(&config)?;
    let snapshot = RepoSnapshot::discover(&args.path, args.repo_id.as_deref(), args.commit.as_deref());
    let summary = Localizer::new(&encoder, &config).index_repository(&mut store, &snapshot, &files)?;

    println!("Index updated at {}", args.db.display());
    println!("  repository:      {} @ {}", snapshot.repo_id, snapshot.commit_sha);
    println!("  encoder:         {}", encoder.fingerprint());
    println!("  files scanned:   {}", stats.files_scanned);
    println!("  files indexed:   {}", summary.files_indexed);
    println!("  files reused:    {}", summary.files_reused);
    println!("  files removed:   {}", summary.files_removed);
    println!("  embeddings:      {}", summary.embeddings_written);
    if summary.files_failed > 0 {
        println!("  files failed:    {}", summary.files_failed);
    }
    Ok(())
}
