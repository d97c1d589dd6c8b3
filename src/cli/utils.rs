//! Shared CLI utilities.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};

use crate::config::{load_config, merge_cli_with_config, CliOverrides};
use crate::domain::{Config, EncoderBackend};

/// Parse a comma-separated string into a `Vec<String>`, trimming whitespace and
/// discarding empty segments.  Returns `None` when `value` is `None`.
pub fn parse_csv(value: &Option<String>) -> Option<Vec<String>> {
    value.as_ref().map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
    })
}

/// Parse bug ids given as `12,15` or `bug-12,bug-15`.
pub fn parse_ids(value: &str) -> Result<Vec<u64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let digits = part.strip_prefix("bug-").unwrap_or(part);
            digits.parse::<u64>().with_context(|| format!("Invalid bug id '{part}'"))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Hashing,
    Ollama,
    Openai,
}

impl From<BackendArg> for EncoderBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Hashing => EncoderBackend::Hashing,
            BackendArg::Ollama => EncoderBackend::Ollama,
            BackendArg::Openai => EncoderBackend::Openai,
        }
    }
}

/// Options shared by every command that scans and encodes sources.
#[derive(Args, Debug, Clone, Default)]
pub struct EncodeArgs {
    /// Path to config file (redwing.toml or redwing.yml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Include only these extensions (comma-separated)
    #[arg(short = 'i', long, value_name = "EXTS")]
    pub include_ext: Option<String>,

    /// Exclude paths matching these globs (comma-separated)
    #[arg(short = 'e', long, value_name = "GLOBS")]
    pub exclude_glob: Option<String>,

    /// Skip files larger than this (bytes)
    #[arg(long, value_name = "BYTES")]
    pub max_file_bytes: Option<u64>,

    /// Ignore .gitignore rules
    #[arg(long)]
    pub no_gitignore: bool,

    /// Embedding backend
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<BackendArg>,

    /// Embedding model name for remote backends
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Base URL of the embedding service
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Token budget per method chunk
    #[arg(long, value_name = "TOKENS")]
    pub max_tokens: Option<usize>,

    /// Number of best chunk similarities averaged per file
    #[arg(long, value_name = "K")]
    pub top_k: Option<usize>,

    /// Encode the raw bug report instead of the preprocessed query
    #[arg(long)]
    pub no_preprocess: bool,
}

impl EncodeArgs {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            include_extensions: parse_csv(&self.include_ext),
            exclude_globs: parse_csv(&self.exclude_glob),
            max_file_bytes: self.max_file_bytes,
            respect_gitignore: if self.no_gitignore { Some(false) } else { None },
            preprocess_query: if self.no_preprocess { Some(false) } else { None },
            backend: self.backend.map(Into::into),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            max_tokens: self.max_tokens,
            top_k: self.top_k,
            ..CliOverrides::default()
        }
    }
}

/// Load the config anchored at `anchor` and apply `overrides` on top.
pub fn resolve_config(anchor: &Path, config: Option<&Path>, overrides: CliOverrides) -> Result<Config> {
    let cwd = std::env::current_dir()?;
    let anchor = if anchor.exists() { anchor.canonicalize().unwrap_or(cwd) } else { cwd };
    let file_config = load_config(&anchor, config)?;
    Ok(merge_cli_with_config(file_config, overrides))
}
