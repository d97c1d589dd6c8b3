//! Ground-truth bug locations

use crate::domain::{BuggyFileRanking, RankedResult};
use crate::error::{InputKind, LocalizeError, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundTruth {
    #[serde(default)]
    pub bug_location: Vec<BugLocation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BugLocation {
    pub file_name: String,
}

impl GroundTruth {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(LocalizeError::missing(InputKind::GroundTruth, path));
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.bug_location.iter().map(|loc| loc.file_name.as_str()).filter(|name| !name.is_empty())
    }

    /// Routes of `ranked` that match a buggy file name, with their 1-based rank.
    ///
    /// A route matches when any ground-truth name is a substring of it and is
    /// reported once even if several names match.
    pub fn buggy_file_rankings(&self, bug_id: u64, ranked: &[RankedResult]) -> Vec<BuggyFileRanking> {
        ranked
            .iter()
            .enumerate()
            .filter(|(_, result)| self.file_names().any(|name| result.route.contains(name)))
            .map(|(idx, result)| BuggyFileRanking { bug_id, file_path: result.route.clone(), rank: idx + 1 })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;
    use tempfile::TempDir;

    fn ranked(routes: &[&str]) -> Vec<RankedResult> {
        routes.iter().enumerate().map(|(i, r)| RankedResult::new(*r, 1.0 - i as f32 * 0.1)).collect()
    }

    #[test]
    fn matches_by_substring_once_per_route() {
        let truth: GroundTruth = serde_json::from_str(
            r#"{"bug_location":[{"file_name":"ExpenseActivity.java","line":[12]},{"file_name":"ui/ExpenseActivity"},{"file_name":""}]}"#,
        )
        .unwrap();
        let hits = truth.buggy_file_rankings(
            42,
            &ranked(&["app/Util.java", "app/Budget.java", "app/ui/ExpenseActivity.java"]),
        );
        assert_eq!(
            hits,
            vec![BuggyFileRanking { bug_id: 42, file_path: "app/ui/ExpenseActivity.java".into(), rank: 3 }]
        );
    }

    #[test]
    fn missing_file_is_missing_input() {
        let dir = TempDir::new().unwrap();
        let err = GroundTruth::load(&dir.path().join("7.json")).unwrap_err();
        assert!(matches!(err, LocalizeError::MissingInput { kind: InputKind::GroundTruth, .. }));
    }

    #[test]
    fn no_locations_means_no_hits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("7.json");
        std::fs::write(&path, "{}").unwrap();
        let truth = GroundTruth::load(&path).unwrap();
        assert!(truth.buggy_file_rankings(7, &ranked(&["A.java"])).is_empty());
    }
}
