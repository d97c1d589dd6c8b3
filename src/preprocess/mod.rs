//! Bug-report normalization and query expansion.
//!
//! Reports are reduced to lowercase identifier words: punctuation and digits
//! are stripped, camelCase is split, Java keywords and filler words dropped,
//! and tokens of two characters or fewer discarded.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

static CAMEL_CASE: Lazy<fancy_regex::Regex> = Lazy::new(|| {
    fancy_regex::Regex::new(r".+?(?:(?<=[a-z])(?=[A-Z])|(?<=[A-Z])(?=[A-Z][a-z])|$)").unwrap()
});

static NON_LETTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z\s]+").unwrap());

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null", "string", "override",
];

const REPORT_STOP_WORDS: &[&str] = &[
    "the", "and", "are", "was", "were", "been", "being", "have", "has", "had", "having", "does",
    "did", "doing", "but", "not", "you", "your", "yours", "they", "them", "their", "what",
    "which", "who", "whom", "that", "these", "those", "with", "from", "into", "during", "before",
    "after", "above", "below", "then", "once", "here", "there", "when", "where", "why", "how",
    "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "only", "own",
    "same", "than", "too", "very", "can", "will", "just", "should", "now", "also", "its", "our",
    "ours", "she", "her", "him", "his", "about", "again", "against", "between", "through",
    "under", "until", "while", "would", "could", "steps", "reproduce", "expected", "actual",
    "behavior", "behaviour", "result", "results", "bug", "issue", "please",
];

static STOP_WORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| JAVA_KEYWORDS.iter().chain(REPORT_STOP_WORDS.iter()).copied().collect());

/// Split an identifier at camelCase boundaries, keeping acronyms together.
///
/// `addExpense` → `add`, `Expense`; `HTTPServer` → `HTTP`, `Server`.
pub fn split_camel_case(identifier: &str) -> Vec<String> {
    CAMEL_CASE
        .find_iter(identifier)
        .filter_map(|m| m.ok())
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token.to_ascii_lowercase().as_str())
}

/// Normalize free text into a space-joined list of meaningful lowercase words.
pub fn preprocess_text(text: &str) -> String {
    let letters_only = NON_LETTERS.replace_all(text, " ");
    letters_only
        .split_whitespace()
        .flat_map(split_camel_case)
        .filter(|token| !is_stop_word(token))
        .map(|token| token.to_lowercase())
        .filter(|token| token.len() > 2)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the text sent to the encoder for a bug report.
///
/// Screen-component terms are appended to the report (query expansion), then
/// the whole query is normalized when `preprocess` is set.
pub fn build_query(report: &str, sc_terms: &BTreeSet<String>, preprocess: bool) -> String {
    let mut query = report.trim().to_string();
    if !sc_terms.is_empty() {
        let expansion = sc_terms.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
        query.push('\n');
        query.push_str(&expansion);
    }
    if preprocess {
        preprocess_text(&query)
    } else {
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_split_handles_acronyms() {
        assert_eq!(split_camel_case("addExpense"), vec!["add", "Expense"]);
        assert_eq!(split_camel_case("HTTPServer"), vec!["HTTP", "Server"]);
        assert_eq!(split_camel_case("plain"), vec!["plain"]);
        assert!(split_camel_case("").is_empty());
    }

    #[test]
    fn preprocess_strips_noise() {
        let out = preprocess_text("The app crashes in DashboardActivity when I tap 'Add expense' 3 times!");
        assert_eq!(out, "app crashes dashboard activity tap add expense times");
    }

    #[test]
    fn preprocess_drops_java_keywords() {
        assert_eq!(preprocess_text("public static void saveBudget() { return null; }"), "save budget");
    }

    #[test]
    fn query_expansion_appends_sc_terms() {
        let terms: BTreeSet<String> = ["add_expense".to_string()].into_iter().collect();
        assert_eq!(build_query("Crash on save", &terms, true), "crash save add expense");
        assert_eq!(build_query("Crash on save", &terms, false), "Crash on save\nadd_expense");
    }
}
