//! Parallel evaluation of many bug cases.
//!
//! Cases run on a bounded rayon pool; each worker sends its outcome over a
//! channel to the calling thread, which is the only place results are
//! collected (and, in the CLI, the only writer of the metrics log).

use crate::domain::{BuggyFileRanking, Config};
use crate::encode::TextEncoder;
use crate::error::{LocalizeError, Result};
use crate::eval::dataset::BugCase;
use crate::pipeline::{LocalizationMode, Localizer};
use crate::scan::FileScanner;
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

/// Cooperative stop signal: once set, no further cases are started.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one case. A failed case has no rankings and carries its error.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub bug_id: u64,
    pub rankings: Vec<BuggyFileRanking>,
    pub error: Option<String>,
}

impl CaseOutcome {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Outcomes ordered by bug id.
    pub outcomes: Vec<CaseOutcome>,
    pub cancelled: bool,
}

impl BatchResult {
    pub fn rankings(&self) -> Vec<Vec<BuggyFileRanking>> {
        self.outcomes.iter().map(|o| o.rankings.clone()).collect()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }
}

pub struct BatchOptions<'a> {
    pub mode: LocalizationMode,
    /// Worker threads; `None` uses the available parallelism.
    pub workers: Option<usize>,
    /// Stop signal checked before each case starts.
    pub cancel: Option<CancellationToken>,
    pub progress: Option<&'a ProgressBar>,
}

/// Localize one case and match the ranking against its ground truth.
pub fn evaluate_case(
    localizer: &Localizer<'_>,
    config: &Config,
    case: &BugCase,
    mode: LocalizationMode,
) -> Result<Vec<BuggyFileRanking>> {
    let report = case.read_report()?;
    let trace = match mode {
        LocalizationMode::Enhanced => Some(case.read_trace()?),
        LocalizationMode::Base => None,
    };
    let truth = case.ground_truth()?;
    let files = FileScanner::from_config(case.code_dir(), config).load()?;

    let localization = localizer.localize_files(&report, trace.as_deref(), &files, mode)?;
    let rankings = truth.buggy_file_rankings(case.bug_id, &localization.ranked);
    tracing::debug!(bug = case.bug_id, files = files.len(), hits = rankings.len(), "case evaluated");
    Ok(rankings)
}

/// Evaluate `cases` in parallel. Individual failures are recorded, never fatal.
pub fn run_batch(
    cases: &[BugCase],
    encoder: &TextEncoder,
    config: &Config,
    options: &BatchOptions<'_>,
) -> Result<BatchResult> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(workers) = options.workers {
        builder = builder.num_threads(workers.max(1));
    }
    let pool = builder.build().map_err(|e| LocalizeError::Config(format!("worker pool: {e}")))?;

    let localizer = Localizer::new(encoder, config);
    let cancel = options.cancel.as_ref();
    let is_cancelled = move || cancel.is_some_and(CancellationToken::is_cancelled);
    let mode = options.mode;
    let (tx, rx) = mpsc::channel::<CaseOutcome>();

    let mut outcomes = std::thread::scope(|scope| {
        let localizer = &localizer;
        scope.spawn(move || {
            pool.install(|| {
                cases.par_iter().for_each_with(tx, |tx, case| {
                    if is_cancelled() {
                        return;
                    }
                    let outcome = match evaluate_case(localizer, config, case, mode) {
                        Ok(rankings) => CaseOutcome { bug_id: case.bug_id, rankings, error: None },
                        Err(err) => {
                            tracing::warn!("bug {} failed: {err}", case.bug_id);
                            CaseOutcome { bug_id: case.bug_id, rankings: Vec::new(), error: Some(err.to_string()) }
                        }
                    };
                    let _ = tx.send(outcome);
                });
            });
        });

        let mut collected = Vec::with_capacity(cases.len());
        for outcome in rx {
            if let Some(pb) = options.progress {
                pb.set_message(format!("bug-{}", outcome.bug_id));
                pb.inc(1);
            }
            collected.push(outcome);
        }
        collected
    });

    outcomes.sort_by_key(|o| o.bug_id);
    let result = BatchResult { outcomes, cancelled: is_cancelled() };
    tracing::info!(
        %mode,
        cases = result.outcomes.len(),
        failures = result.failures(),
        cancelled = result.cancelled,
        "batch finished"
    );
    Ok(result)
}
