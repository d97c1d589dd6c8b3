//! Core data types shared across the localization pipeline.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Default token budget for one encoder input.
pub const DEFAULT_MAX_TOKENS: usize = 512;

/// Best rank recorded for a bug whose buggy files were never found.
pub const NOT_FOUND_RANK: usize = 9999;

/// Number of trailing trace steps inspected for GUI terms.
pub const TRACE_STEP_WINDOW: usize = 4;

/// A bounded span of source text handed to the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub token_count: usize,
}

/// A unit-length vector for one chunk or one bug report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Embedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector, owner: None }
    }

    pub fn owned_by(mut self, route: &str) -> Self {
        self.owner = Some(route.to_string());
        self
    }

    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    pub fn norm(&self) -> f32 {
        self.vector.iter().map(|v| v * v).sum::<f32>().sqrt()
    }
}

/// All chunk embeddings of one repository file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub route: String,
    pub embeddings: Vec<Embedding>,
}

impl FileRecord {
    pub fn new(route: impl Into<String>, embeddings: Vec<Embedding>) -> Self {
        Self { route: route.into(), embeddings }
    }

    /// Build a record from raw vectors, as loaded from the embedding store.
    pub fn from_vectors(route: impl Into<String>, vectors: Vec<Vec<f32>>) -> Self {
        let route = route.into();
        let embeddings =
            vectors.into_iter().map(|v| Embedding::new(v).owned_by(&route)).collect::<Vec<_>>();
        Self { route, embeddings }
    }

    pub fn vectors(&self) -> Vec<&[f32]> {
        self.embeddings.iter().map(|e| e.vector.as_slice()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// One entry of a file ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub route: String,
    pub score: f32,
}

impl RankedResult {
    pub fn new(route: impl Into<String>, score: f32) -> Self {
        Self { route: route.into(), score }
    }
}

/// A repository file as read from disk.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the repository root, forward-slash separated.
    pub route: String,
    /// Bare file name, e.g. `DashboardActivity.java`.
    pub name: String,
    pub content: String,
}

/// A ground-truth buggy file found in a final ranking (1-indexed rank).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuggyFileRanking {
    pub bug_id: u64,
    pub file_path: String,
    pub rank: usize,
}

/// How the chunker treats a method longer than the token budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitPolicy {
    /// Overlapping windows with a stride of half the budget.
    #[default]
    Window,
    /// Keep only the first window.
    Truncate,
    /// Skip the method entirely.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderBackend {
    #[default]
    Hashing,
    Ollama,
    Openai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    pub max_tokens: usize,
    pub split_policy: SplitPolicy,
    pub include_constructors: bool,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            split_policy: SplitPolicy::Window,
            include_constructors: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub backend: EncoderBackend,
    pub model: String,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Vector width of the hashing backend.
    pub dimensions: usize,
    pub timeout_secs: u64,
    pub batch_size: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            backend: EncoderBackend::Hashing,
            model: "nomic-embed-text".to_string(),
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            dimensions: 768,
            timeout_secs: 120,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub top_k: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { top_k: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    pub output_dir: PathBuf,
    pub metrics_log: PathBuf,
    /// k used when comparing enhanced and base Hits@k.
    pub improvement_k: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            workers: None,
            output_dir: PathBuf::from("metrics"),
            metrics_log: PathBuf::from("bigMetrics.csv"),
            improvement_k: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_extensions")]
    pub include_extensions: Vec<String>,
    #[serde(deserialize_with = "deserialize_string_list")]
    pub exclude_globs: Vec<String>,
    pub max_file_bytes: u64,
    pub respect_gitignore: bool,
    pub preprocess_query: bool,
    pub result_limit: usize,
    pub chunk: ChunkConfig,
    pub encoder: EncoderConfig,
    pub ranking: RankingConfig,
    pub eval: EvalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include_extensions: vec![".java".to_string()],
            exclude_globs: Vec::new(),
            max_file_bytes: 1_048_576,
            respect_gitignore: true,
            preprocess_query: true,
            result_limit: 10,
            chunk: ChunkConfig::default(),
            encoder: EncoderConfig::default(),
            ranking: RankingConfig::default(),
            eval: EvalConfig::default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

fn split_string_list(raw: StringOrList) -> Vec<String> {
    let items = match raw {
        StringOrList::One(s) => s.split(',').map(str::to_string).collect(),
        StringOrList::Many(v) => v,
    };
    items.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn deserialize_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(split_string_list(StringOrList::deserialize(deserializer)?))
}

fn deserialize_extensions<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(split_string_list(StringOrList::deserialize(deserializer)?)
        .into_iter()
        .map(|ext| normalize_extension(&ext))
        .collect())
}

/// Lowercase an extension and make sure it carries a leading dot.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}
