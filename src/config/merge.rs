//! Command-line overrides layered on top of the loaded config

use crate::domain::{normalize_extension, Config, EncoderBackend, SplitPolicy};
use std::path::PathBuf;

/// Values supplied on the command line. `None` leaves the config untouched.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub include_extensions: Option<Vec<String>>,
    pub exclude_globs: Option<Vec<String>>,
    pub max_file_bytes: Option<u64>,
    pub respect_gitignore: Option<bool>,
    pub preprocess_query: Option<bool>,
    pub result_limit: Option<usize>,
    pub max_tokens: Option<usize>,
    pub split_policy: Option<SplitPolicy>,
    pub backend: Option<EncoderBackend>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub top_k: Option<usize>,
    pub workers: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub metrics_log: Option<PathBuf>,
}

pub fn merge_cli_with_config(mut config: Config, cli: CliOverrides) -> Config {
    if let Some(exts) = cli.include_extensions {
        config.include_extensions = exts.iter().map(|e| normalize_extension(e)).collect();
    }
    if let Some(globs) = cli.exclude_globs {
        config.exclude_globs = globs;
    }
    if let Some(bytes) = cli.max_file_bytes {
        config.max_file_bytes = bytes;
    }
    if let Some(respect) = cli.respect_gitignore {
        config.respect_gitignore = respect;
    }
    if let Some(preprocess) = cli.preprocess_query {
        config.preprocess_query = preprocess;
    }
    if let Some(limit) = cli.result_limit {
        config.result_limit = limit;
    }
    if let Some(tokens) = cli.max_tokens {
        config.chunk.max_tokens = tokens;
    }
    if let Some(policy) = cli.split_policy {
        config.chunk.split_policy = policy;
    }
    if let Some(backend) = cli.backend {
        config.encoder.backend = backend;
    }
    if let Some(model) = cli.model {
        config.encoder.model = model;
    }
    if let Some(url) = cli.base_url {
        config.encoder.base_url = url;
    }
    if let Some(k) = cli.top_k {
        config.ranking.top_k = k;
    }
    if cli.workers.is_some() {
        config.eval.workers = cli.workers;
    }
    if let Some(dir) = cli.output_dir {
        config.eval.output_dir = dir;
    }
    if let Some(log) = cli.metrics_log {
        config.eval.metrics_log = log;
    }
    config
}
