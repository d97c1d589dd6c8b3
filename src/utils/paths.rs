//! Path normalization

use std::path::Path;

pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Forward-slash path of `path` relative to `root`, or `None` when it lies outside.
pub fn relative_route(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(normalize_path(rel.to_str()?))
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string()
}
