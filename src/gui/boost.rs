//! Corpus filtering and ranking promotion driven by GUI terms.

use crate::domain::{FileRecord, RankedResult, SourceFile};
use std::collections::{BTreeSet, HashSet};

/// Routes of files whose content mentions any screen-component term.
///
/// `repo_root`, when given, is stripped from the front of each route.
pub fn build_corpus(
    files: &[SourceFile],
    sc_terms: &BTreeSet<String>,
    repo_root: Option<&str>,
) -> Vec<String> {
    let prefix = repo_root.map(|root| format!("{}/", root.trim_end_matches('/')));
    files
        .iter()
        .filter(|file| sc_terms.iter().any(|term| file.content.contains(term.as_str())))
        .map(|file| match prefix.as_deref() {
            Some(prefix) => file.route.strip_prefix(prefix).unwrap_or(&file.route).to_string(),
            None => file.route.clone(),
        })
        .collect()
}

/// Restrict `records` to the routes of `corpus`; an empty corpus keeps everything.
pub fn filter_corpus(records: Vec<FileRecord>, corpus: &[String]) -> Vec<FileRecord> {
    if corpus.is_empty() {
        return records;
    }
    let keep: HashSet<&str> = corpus.iter().map(String::as_str).collect();
    records.into_iter().filter(|r| keep.contains(r.route.as_str())).collect()
}

/// Routes of files whose name contains any GUI-screen term.
pub fn get_boosted_files(files: &[SourceFile], gs_terms: &BTreeSet<String>) -> Vec<String> {
    files
        .iter()
        .filter(|file| gs_terms.iter().any(|term| file.name.contains(term.as_str())))
        .map(|file| file.route.clone())
        .collect()
}

/// Move boosted routes ahead of the rest, keeping relative order within each group.
pub fn reorder_rankings(ranked: Vec<RankedResult>, boosted: &[String]) -> Vec<RankedResult> {
    if boosted.is_empty() {
        return ranked;
    }
    let boosted: HashSet<&str> = boosted.iter().map(String::as_str).collect();
    let (mut promoted, rest): (Vec<_>, Vec<_>) =
        ranked.into_iter().partition(|r| boosted.contains(r.route.as_str()));
    promoted.extend(rest);
    promoted
}
