//! Bug-case discovery in an evaluation dataset.
//!
//! A dataset home holds one `bug-<id>/` directory per case:
//!
//! ```text
//! bug-<id>/
//!   Execution-1.json      GUI interaction trace
//!   code/                 repository sources
//!   bug_report_<id>.txt   bug report
//!   <id>.json             ground truth
//! ```

use crate::error::{InputKind, LocalizeError, Result};
use crate::eval::ground_truth::GroundTruth;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use regex::Regex;
use std::path::{Path, PathBuf};

static BUG_DIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^bug-(\d+)$").unwrap());

const TRACE_FILE: &str = "Execution-1.json";
const CODE_DIR: &str = "code";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BugCase {
    pub bug_id: u64,
    pub root: PathBuf,
}

impl BugCase {
    /// Interpret `dir` as a case directory named `bug-<id>`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let name = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let bug_id = BUG_DIR
            .captures(name)
            .and_then(|caps| caps[1].parse::<u64>().ok())
            .ok_or_else(|| LocalizeError::Dataset(format!("{} is not a bug-<id> directory", dir.display())))?;
        Ok(Self { bug_id, root: dir.to_path_buf() })
    }

    pub fn trace_path(&self) -> PathBuf {
        self.root.join(TRACE_FILE)
    }

    pub fn code_dir(&self) -> PathBuf {
        self.root.join(CODE_DIR)
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(format!("bug_report_{}.txt", self.bug_id))
    }

    pub fn ground_truth_path(&self) -> PathBuf {
        self.root.join(format!("{}.json", self.bug_id))
    }

    pub fn read_report(&self) -> Result<String> {
        read_required(&self.report_path(), InputKind::BugReport)
    }

    pub fn read_trace(&self) -> Result<String> {
        read_required(&self.trace_path(), InputKind::Trace)
    }

    pub fn ground_truth(&self) -> Result<GroundTruth> {
        GroundTruth::load(&self.ground_truth_path())
    }
}

fn read_required(path: &Path, kind: InputKind) -> Result<String> {
    if !path.is_file() {
        return Err(LocalizeError::missing(kind, path));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Which cases of a dataset to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Random { count: usize, seed: Option<u64> },
    Ids(Vec<u64>),
}

/// Every `bug-<id>` directory under `home`, ordered by id.
pub fn discover_cases(home: &Path) -> Result<Vec<BugCase>> {
    if !home.is_dir() {
        return Err(LocalizeError::Dataset(format!("{} is not a directory", home.display())));
    }
    let mut cases = Vec::new();
    for entry in std::fs::read_dir(home)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Ok(case) = BugCase::from_dir(&path) {
            cases.push(case);
        }
    }
    cases.sort_by_key(|c| c.bug_id);
    Ok(cases)
}

/// Resolve a [`Selection`] against the dataset at `home`.
///
/// Unknown ids are skipped with a warning; a random sample larger than the
/// dataset takes every case.
pub fn collect_repos(home: &Path, selection: &Selection) -> Result<Vec<BugCase>> {
    let cases = match selection {
        Selection::All => discover_cases(home)?,
        Selection::Ids(ids) => {
            let mut cases = Vec::with_capacity(ids.len());
            for &id in ids {
                let dir = home.join(format!("bug-{id}"));
                if dir.is_dir() {
                    cases.push(BugCase { bug_id: id, root: dir });
                } else {
                    tracing::warn!("Repository directory does not exist: {}", dir.display());
                }
            }
            cases
        }
        Selection::Random { count, seed } => {
            let all = discover_cases(home)?;
            if *count > all.len() {
                tracing::warn!("Requested {count} cases but only {} exist; using all", all.len());
            }
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(*seed),
                None => StdRng::from_os_rng(),
            };
            let mut sample: Vec<BugCase> = all.choose_multiple(&mut rng, *count).cloned().collect();
            sample.sort_by_key(|c| c.bug_id);
            sample
        }
    };
    tracing::info!(cases = cases.len(), home = %home.display(), "collected bug cases");
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn dataset(ids: &[u64]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for id in ids {
            fs::create_dir_all(dir.path().join(format!("bug-{id}/code"))).unwrap();
        }
        fs::create_dir_all(dir.path().join("notes")).unwrap();
        fs::write(dir.path().join("bug-99"), "a file, not a case").unwrap();
        dir
    }

    #[test]
    fn discovers_cases_in_id_order() {
        let home = dataset(&[10, 2, 33]);
        let ids: Vec<u64> = discover_cases(home.path()).unwrap().iter().map(|c| c.bug_id).collect();
        assert_eq!(ids, vec![2, 10, 33]);
    }

    #[test]
    fn explicit_ids_skip_missing_cases() {
        let home = dataset(&[1, 2]);
        let cases = collect_repos(home.path(), &Selection::Ids(vec![2, 5])).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].bug_id, 2);
        assert_eq!(cases[0].report_path(), home.path().join("bug-2/bug_report_2.txt"));
        assert_eq!(cases[0].ground_truth_path(), home.path().join("bug-2/2.json"));
    }

    #[test]
    fn seeded_sample_is_reproducible() {
        let home = dataset(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let pick = |seed| {
            collect_repos(home.path(), &Selection::Random { count: 3, seed: Some(seed) })
                .unwrap()
                .into_iter()
                .map(|c| c.bug_id)
                .collect::<Vec<_>>()
        };
        let first = pick(7);
        assert_eq!(first.len(), 3);
        assert_eq!(first, pick(7));
        assert!(first.windows(2).all(|w| w[0] < w[1]));

        let everything = collect_repos(home.path(), &Selection::Random { count: 50, seed: None }).unwrap();
        assert_eq!(everything.len(), 8);
    }

    #[test]
    fn missing_inputs_are_reported_by_kind() {
        let home = dataset(&[4]);
        let case = BugCase::from_dir(&home.path().join("bug-4")).unwrap();
        assert!(matches!(case.read_report(), Err(LocalizeError::MissingInput { kind: InputKind::BugReport, .. })));
        assert!(matches!(case.read_trace(), Err(LocalizeError::MissingInput { kind: InputKind::Trace, .. })));
        assert!(BugCase::from_dir(Path::new("/tmp/not-a-case")).is_err());
    }
}
