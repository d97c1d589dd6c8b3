//! Batch evaluation against ground-truth datasets

pub mod batch;
pub mod dataset;
pub mod ground_truth;
pub mod metrics;
pub mod report;

pub use batch::{run_batch, BatchOptions, BatchResult, CancellationToken, CaseOutcome};
pub use dataset::{collect_repos, discover_cases, BugCase, Selection};
pub use ground_truth::GroundTruth;
pub use metrics::{calculate_improvement, MetricsSummary, HITS_CUTOFFS};
