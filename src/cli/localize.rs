//! Localize command implementation

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

use super::utils::{resolve_config, EncodeArgs};
use crate::config::CliOverrides;
use crate::encode::TextEncoder;
use crate::error::{InputKind, LocalizeError};
use crate::pipeline::{Localization, LocalizationMode, Localizer};
use crate::rank::top_results;
use crate::scan::FileScanner;
use crate::store::{EmbeddingStore, RepoSnapshot};

#[derive(Args)]
pub struct LocalizeArgs {
    /// Repository directory to rank
    #[arg(short, long, value_name = "PATH")]
    pub path: PathBuf,

    /// Bug report text file
    #[arg(short, long, value_name = "FILE")]
    pub report: PathBuf,

    /// GUI interaction trace (JSON) recorded while reproducing the bug
    #[arg(short, long, value_name = "FILE")]
    pub trace: Option<PathBuf>,

    /// Reuse and update an embedding store instead of encoding from scratch
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// Max results to display
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Ignore the trace and rank by text similarity only
    #[arg(long)]
    pub base: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub encode: EncodeArgs,
}

fn read_input(path: &Path, kind: InputKind) -> Result<String> {
    if !path.is_file() {
        return Err(LocalizeError::missing(kind, path).into());
    }
    fs::read_to_string(path).with_context(|| format!("Failed reading {}", path.display()))
}

pub fn run(args: LocalizeArgs) -> Result<()> {
    let overrides = CliOverrides { result_limit: args.limit, ..args.encode.overrides() };
    let config = resolve_config(&args.path, args.encode.config.as_deref(), overrides)?;

    let report = read_input(&args.report, InputKind::BugReport)?;
    let mode = if args.base {
        LocalizationMode::Base
    } else if args.trace.is_none() {
        tracing::warn!("No trace given; ranking without GUI signals");
        LocalizationMode::Base
    } else {
        LocalizationMode::Enhanced
    };
    let trace = match (&args.trace, mode) {
        (Some(path), LocalizationMode::Enhanced) => Some(read_input(path, InputKind::Trace)?),
        _ => None,
    };

    let files = FileScanner::from_config(args.path.clone(), &config).load()?;
    let encoder = TextEncoder::from_config(&config)?;
    let localizer = Localizer::new(&encoder, &config);

    let localization = match &args.db {
        Some(db) => {
            if let Some(parent) = db.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let mut store = EmbeddingStore::open(db)
                .with_context(|| format!("Failed to open SQLite database at {}", db.display()))?;
            let snapshot = RepoSnapshot::discover(&args.path, None, None);
            localizer.index_repository(&mut store, &snapshot, &files)?;
            localizer.localize_stored(&report, trace.as_deref(), &files, &store, &snapshot, mode)?
        }
        None => localizer.localize_files(&report, trace.as_deref(), &files, mode)?,
    };

    if args.json {
        print_json(&localization, mode, config.result_limit)?;
    } else {
        print_results(&localization, mode, files.len(), config.result_limit);
    }
    Ok(())
}

fn print_json(localization: &Localization, mode: LocalizationMode, limit: usize) -> Result<()> {
    let results = top_results(localization.ranked.clone(), limit);
    let payload = json!({
        "mode": mode,
        "corpus_size": localization.corpus_size,
        "sc_terms": localization.terms.sc,
        "gs_terms": localization.terms.gs,
        "boosted": localization.boosted,
        "results": results,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn print_results(localization: &Localization, mode: LocalizationMode, scanned: usize, limit: usize) {
    println!();
    println!("Ranked {} of {} file(s) ({mode} mode)", localization.corpus_size, scanned);
    if !localization.terms.is_empty() {
        let sc: Vec<&str> = localization.terms.sc.iter().map(String::as_str).collect();
        let gs: Vec<&str> = localization.terms.gs.iter().map(String::as_str).collect();
        println!("  screen components: {}", sc.join(", "));
        println!("  screen names:      {}", gs.join(", "));
    }
    println!();
    for (idx, result) in localization.ranked.iter().take(limit).enumerate() {
        let marker = if localization.boosted.contains(&result.route) { "*" } else { " " };
        println!(
            "{:>4}. {} {:.4}  {}",
            idx + 1,
            style(marker).yellow().bold(),
            result.score,
            style(&result.route).cyan()
        );
    }
    if localization.ranked.is_empty() {
        println!("  (no files ranked)");
    }
}
