//! Source file discovery with gitignore support

use crate::domain::{normalize_extension, Config, SourceFile};
use crate::error::{LocalizeError, Result};
use crate::utils::{file_name_of, is_binary_file, read_file_safe, relative_route, DEFAULT_SAMPLE_SIZE};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Counters describing one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub files_included: usize,
    pub files_skipped_glob: usize,
    pub files_skipped_extension: usize,
    pub files_skipped_size: usize,
    pub files_skipped_binary: usize,
    pub files_unreadable: usize,
    pub total_bytes_included: u64,
}

/// Discovers source files under a repository root while respecting gitignore rules.
pub struct FileScanner {
    root_path: PathBuf,
    include_extensions: Vec<String>,
    exclude_globs: Vec<String>,
    max_file_bytes: u64,
    respect_gitignore: bool,
    follow_symlinks: bool,
    stats: ScanStats,
}

impl FileScanner {
    /// Create a scanner for Java sources with default limits.
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            include_extensions: vec![".java".to_string()],
            exclude_globs: Vec::new(),
            max_file_bytes: 1_048_576,
            respect_gitignore: true,
            follow_symlinks: false,
            stats: ScanStats::default(),
        }
    }

    pub fn from_config(root_path: PathBuf, config: &Config) -> Self {
        Self::new(root_path)
            .include_extensions(config.include_extensions.clone())
            .exclude_globs(config.exclude_globs.clone())
            .max_file_bytes(config.max_file_bytes)
            .respect_gitignore(config.respect_gitignore)
    }

    /// Set file extensions to include (e.g., ".java")
    pub fn include_extensions(mut self, extensions: Vec<String>) -> Self {
        self.include_extensions = extensions.iter().map(|e| normalize_extension(e)).collect();
        self
    }

    /// Set glob patterns to exclude
    pub fn exclude_globs(mut self, globs: Vec<String>) -> Self {
        self.exclude_globs = globs;
        self
    }

    /// Set maximum file size in bytes
    pub fn max_file_bytes(mut self, max_bytes: u64) -> Self {
        self.max_file_bytes = max_bytes;
        self
    }

    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    fn build_exclude_globset(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_globs {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => tracing::warn!("Ignoring invalid exclude glob {pattern:?}: {e}"),
            }
        }
        builder.build().map_err(|e| LocalizeError::Config(e.to_string()))
    }

    fn should_include_extension(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        !ext.is_empty() && self.include_extensions.contains(&normalize_extension(ext))
    }

    /// Walk the tree and return `(absolute_path, route)` pairs sorted by route.
    pub fn scan(&mut self) -> Result<Vec<(PathBuf, String)>> {
        self.stats = ScanStats::default();

        if !self.root_path.is_dir() {
            return Err(LocalizeError::missing(crate::error::InputKind::SourceTree, &self.root_path));
        }

        let exclude_globset = self.build_exclude_globset()?;

        let mut builder = WalkBuilder::new(&self.root_path);
        builder
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .follow_links(self.follow_symlinks)
            .hidden(false)
            .parents(self.respect_gitignore)
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_str().unwrap_or("");
                !(name.starts_with('.') || matches!(name, "build" | "node_modules" | "target"))
            });

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!("walk error: {e}");
                    continue;
                }
            };
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            self.stats.files_scanned += 1;

            let Some(route) = relative_route(&self.root_path, path) else {
                continue;
            };

            if exclude_globset.is_match(&route) {
                self.stats.files_skipped_glob += 1;
                continue;
            }

            if !self.should_include_extension(path) {
                self.stats.files_skipped_extension += 1;
                continue;
            }

            let size = match path.metadata() {
                Ok(m) => m.len(),
                Err(_) => {
                    self.stats.files_unreadable += 1;
                    continue;
                }
            };
            if size > self.max_file_bytes {
                self.stats.files_skipped_size += 1;
                continue;
            }

            if is_binary_file(path, DEFAULT_SAMPLE_SIZE) {
                self.stats.files_skipped_binary += 1;
                continue;
            }

            self.stats.total_bytes_included += size;
            files.push((path.to_path_buf(), route));
        }

        files.sort_by(|a, b| a.1.cmp(&b.1));
        self.stats.files_included = files.len();
        tracing::debug!(root = %self.root_path.display(), files = files.len(), "scan complete");
        Ok(files)
    }

    /// Scan and decode every matching file. Unreadable files are skipped with a warning.
    pub fn load(&mut self) -> Result<Vec<SourceFile>> {
        let paths = self.scan()?;
        let mut sources = Vec::with_capacity(paths.len());
        for (path, route) in paths {
            match read_file_safe(&path) {
                Ok((content, _encoding)) => {
                    let name = file_name_of(&path);
                    sources.push(SourceFile { path, route, name, content });
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable file {route}: {e}");
                    self.stats.files_unreadable += 1;
                    self.stats.files_included -= 1;
                }
            }
        }
        Ok(sources)
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }
}
