//! Error types for the localization core

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LocalizeError>;

/// Which input artifact of a bug case was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    BugReport,
    Trace,
    GroundTruth,
    SourceTree,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            InputKind::BugReport => "bug report",
            InputKind::Trace => "trace",
            InputKind::GroundTruth => "ground truth",
            InputKind::SourceTree => "source tree",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum LocalizeError {
    /// A required artifact is absent
    #[error("Missing {kind}: {}", .path.display())]
    MissingInput { kind: InputKind, path: PathBuf },

    /// The encoder rejected or failed on a chunk
    #[error("Encoding failed{}: {message}", .route.as_deref().map(|r| format!(" for {r}")).unwrap_or_default())]
    EncodingFailure { route: Option<String>, message: String },

    /// Trace JSON without `steps` or with unexpected types
    #[error("Malformed trace: {0}")]
    MalformedTrace(String),

    /// Query and corpus vectors disagree on width
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Grammar could not be loaded into the parser
    #[error("Parser setup failed: {0}")]
    Parser(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid dataset layout: {0}")]
    Dataset(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Embedding store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl LocalizeError {
    pub fn encoding(route: Option<&str>, message: impl Into<String>) -> Self {
        LocalizeError::EncodingFailure {
            route: route.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn missing(kind: InputKind, path: impl Into<PathBuf>) -> Self {
        LocalizeError::MissingInput { kind, path: path.into() }
    }

    /// Attach a file route to an encoding failure raised without one.
    pub fn with_route(self, route: &str) -> Self {
        match self {
            LocalizeError::EncodingFailure { route: None, message } => {
                LocalizeError::EncodingFailure { route: Some(route.to_string()), message }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_failure_mentions_route() {
        let err = LocalizeError::encoding(None, "zero vector").with_route("src/A.java");
        assert_eq!(err.to_string(), "Encoding failed for src/A.java: zero vector");
    }

    #[test]
    fn missing_input_mentions_kind() {
        let err = LocalizeError::missing(InputKind::GroundTruth, "/data/bug-3/3.json");
        assert_eq!(err.to_string(), "Missing ground truth: /data/bug-3/3.json");
    }
}
