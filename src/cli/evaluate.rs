//! Evaluate command implementation

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use super::guided::choose_guided_plan;
use super::utils::{parse_ids, resolve_config, EncodeArgs};
use crate::config::CliOverrides;
use crate::domain::{BuggyFileRanking, Config};
use crate::encode::TextEncoder;
use crate::eval::metrics::{best_ranks, hits_at_k};
use crate::eval::report::{append_metrics_log, render_csv, render_log_block, render_table, write_run_csv};
use crate::eval::{
    calculate_improvement, collect_repos, discover_cases, run_batch, BatchOptions, BatchResult, BugCase,
    MetricsSummary, Selection,
};
use crate::pipeline::LocalizationMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EvalMode {
    /// Rank with GUI-trace signals
    Enhanced,
    /// Rank by text similarity only
    Base,
    /// Run both and report the relative improvement
    Compare,
}

#[derive(Args)]
#[command(group(ArgGroup::new("selection").args(["all", "count", "ids"])))]
pub struct EvaluateArgs {
    /// Dataset directory holding bug-<id> folders
    #[arg(long, value_name = "DIR")]
    pub home: PathBuf,

    /// Evaluate every bug in the dataset
    #[arg(long)]
    pub all: bool,

    /// Evaluate a random sample of this many bugs
    #[arg(long, value_name = "N")]
    pub count: Option<usize>,

    /// Seed for the random sample
    #[arg(long, value_name = "SEED", requires = "count")]
    pub seed: Option<u64>,

    /// Evaluate these bug ids (comma-separated)
    #[arg(long, value_name = "IDS")]
    pub ids: Option<String>,

    #[arg(long, value_enum, default_value = "enhanced")]
    pub mode: EvalMode,

    /// Repeat the evaluation this many times
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub loops: usize,

    /// Worker threads (defaults to available parallelism)
    #[arg(short = 'j', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Directory for per-run metrics CSVs
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Append-only metrics log
    #[arg(long, value_name = "FILE")]
    pub metrics_log: Option<PathBuf>,

    /// Choose bugs and mode through prompts
    #[arg(long, conflicts_with = "selection")]
    pub interactive: bool,

    #[command(flatten)]
    pub encode: EncodeArgs,
}

pub fn run(args: EvaluateArgs) -> Result<()> {
    let overrides = CliOverrides {
        workers: args.workers,
        output_dir: args.output_dir.clone(),
        metrics_log: args.metrics_log.clone(),
        ..args.encode.overrides()
    };
    let config = resolve_config(&args.home, args.encode.config.as_deref(), overrides)?;

    let (selection, mode, loops) = if args.interactive {
        let cases = discover_cases(&args.home)?;
        let plan = choose_guided_plan(&args.home, &cases)?;
        (plan.selection, plan.mode, plan.loops)
    } else {
        (selection_from_args(&args)?, args.mode, args.loops.max(1))
    };

    let encoder = TextEncoder::from_config(&config)?;

    for loop_number in 1..=loops {
        let cases = collect_repos(&args.home, &loop_selection(&selection, loop_number))?;
        if cases.is_empty() {
            anyhow::bail!("No bug cases selected under {}", args.home.display());
        }
        println!();
        println!("Loop {loop_number}/{loops}: evaluating {} bug(s) ({mode:?})", cases.len());

        let (summary, rankings, baseline) = match mode {
            EvalMode::Enhanced | EvalMode::Base => {
                let batch_mode =
                    if mode == EvalMode::Base { LocalizationMode::Base } else { LocalizationMode::Enhanced };
                let result = evaluate(&cases, &encoder, &config, batch_mode)?;
                let rankings = result.rankings();
                (MetricsSummary::compute(&rankings), rankings, None)
            }
            EvalMode::Compare => {
                let enhanced = evaluate(&cases, &encoder, &config, LocalizationMode::Enhanced)?;
                let base = evaluate(&cases, &encoder, &config, LocalizationMode::Base)?;
                let (with, without) = (enhanced.rankings(), base.rankings());
                let k = config.eval.improvement_k;
                let improvement = calculate_improvement(
                    hits_at_k(k, &best_ranks(&with)) as f64,
                    hits_at_k(k, &best_ranks(&without)) as f64,
                );
                if improvement.is_none() {
                    tracing::warn!("Base run has no hits at {k}; relative improvement undefined");
                }
                let summary = MetricsSummary::compute(&with).with_improvement(improvement);
                (summary, with, Some(MetricsSummary::compute(&without)))
            }
        };

        write_outputs(&config, loop_number, &summary, &rankings)?;
        if let Some(baseline) = &baseline {
            print!("{}", render_table("Baseline Metrics", baseline));
        }
        print!("{}", render_table("Summary Metrics", &summary));
    }
    Ok(())
}

fn selection_from_args(args: &EvaluateArgs) -> Result<Selection> {
    if args.all {
        Ok(Selection::All)
    } else if let Some(count) = args.count {
        Ok(Selection::Random { count, seed: args.seed })
    } else if let Some(ids) = &args.ids {
        Ok(Selection::Ids(parse_ids(ids)?))
    } else {
        anyhow::bail!("Choose bugs with --all, --count or --ids (or use --interactive)")
    }
}

/// Seeded samples advance the seed per loop so repeated loops draw new bugs.
fn loop_selection(selection: &Selection, loop_number: usize) -> Selection {
    match selection {
        Selection::Random { count, seed: Some(seed) } => {
            Selection::Random { count: *count, seed: Some(seed.wrapping_add(loop_number as u64 - 1)) }
        }
        other => other.clone(),
    }
}

fn evaluate(
    cases: &[BugCase],
    encoder: &TextEncoder,
    config: &Config,
    mode: LocalizationMode,
) -> Result<BatchResult> {
    let pb = ProgressBar::new(cases.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {prefix} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    pb.set_prefix(mode.to_string());

    let options = BatchOptions { mode, workers: config.eval.workers, cancel: None, progress: Some(&pb) };
    let result = run_batch(cases, encoder, config, &options)?;
    pb.finish_and_clear();

    if result.failures() > 0 {
        eprintln!("warning: {} of {} bug(s) failed in {mode} mode", result.failures(), result.outcomes.len());
        for outcome in result.outcomes.iter().filter(|o| o.is_failure()) {
            eprintln!("  bug-{}: {}", outcome.bug_id, outcome.error.as_deref().unwrap_or_default());
        }
    }
    Ok(result)
}

fn write_outputs(
    config: &Config,
    loop_number: usize,
    summary: &MetricsSummary,
    rankings: &[Vec<BuggyFileRanking>],
) -> Result<()> {
    let csv_path = write_run_csv(&config.eval.output_dir, &render_csv(summary, rankings), chrono::Local::now())
        .with_context(|| format!("Failed writing metrics to {}", config.eval.output_dir.display()))?;
    append_metrics_log(&config.eval.metrics_log, &render_log_block(loop_number, summary))
        .with_context(|| format!("Failed appending to {}", config.eval.metrics_log.display()))?;
    println!("Metrics written to {}", csv_path.display());
    Ok(())
}
