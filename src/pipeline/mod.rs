//! End-to-end localization: encode a repository, rank it against a bug
//! report, and apply the GUI-trace boost.

use crate::domain::{Config, FileRecord, RankedResult, SourceFile};
use crate::encode::TextEncoder;
use crate::error::Result;
use crate::gui::{build_corpus, filter_corpus, get_boosted_files, reorder_rankings, GuiTerms};
use crate::preprocess::build_query;
use crate::rank::SimilarityRanker;
use crate::store::{EmbeddingStore, IndexedFile, RepoSnapshot};
use crate::utils::content_hash;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Whether GUI-trace signals take part in ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalizationMode {
    #[default]
    Enhanced,
    Base,
}

impl fmt::Display for LocalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalizationMode::Enhanced => f.write_str("enhanced"),
            LocalizationMode::Base => f.write_str("base"),
        }
    }
}

/// Result of one localization request.
#[derive(Debug, Clone)]
pub struct Localization {
    /// Final ordering, boosted files first when any matched.
    pub ranked: Vec<RankedResult>,
    pub terms: GuiTerms,
    pub boosted: Vec<String>,
    /// Number of files actually scored after corpus filtering.
    pub corpus_size: usize,
    /// Text handed to the encoder for the report.
    pub query: String,
}

/// Files encoded in one pass; failures are excluded and listed by route.
#[derive(Debug, Default)]
pub struct EncodedCorpus {
    pub records: Vec<FileRecord>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub files_indexed: usize,
    pub files_reused: usize,
    pub files_failed: usize,
    pub files_removed: usize,
    pub embeddings_written: usize,
}

pub struct Localizer<'a> {
    encoder: &'a TextEncoder,
    ranker: SimilarityRanker,
    preprocess_query: bool,
}

impl<'a> Localizer<'a> {
    pub fn new(encoder: &'a TextEncoder, config: &Config) -> Self {
        Self {
            encoder,
            ranker: SimilarityRanker::from_config(&config.ranking),
            preprocess_query: config.preprocess_query,
        }
    }

    /// Encode every file, leaving out (and logging) files the encoder fails on.
    pub fn encode_files(&self, files: &[SourceFile]) -> EncodedCorpus {
        let mut corpus = EncodedCorpus::default();
        for file in files {
            match self.encoder.encode_file(file) {
                Ok(record) => {
                    tracing::debug!(route = %file.route, chunks = record.embeddings.len(), "encoded");
                    corpus.records.push(record);
                }
                Err(err) => {
                    tracing::warn!("Excluding {} from the corpus: {err}", file.route);
                    corpus.failed.push(file.route.clone());
                }
            }
        }
        corpus
    }

    /// Bring the store's snapshot in line with `files`: unchanged files are
    /// reused, changed ones re-encoded, vanished or failing ones removed.
    pub fn index_repository(
        &self,
        store: &mut EmbeddingStore,
        snapshot: &RepoSnapshot,
        files: &[SourceFile],
    ) -> Result<IndexSummary> {
        let encoder_name = self.encoder.fingerprint();
        let stored = store.file_hashes(snapshot)?;

        let mut summary = IndexSummary::default();
        let mut present = HashSet::new();
        let mut changed = Vec::new();

        for file in files {
            let hash = content_hash(&file.content);
            let unchanged = stored
                .get(&file.route)
                .is_some_and(|(stored_hash, stored_encoder)| *stored_hash == hash && *stored_encoder == encoder_name);
            if unchanged {
                summary.files_reused += 1;
                present.insert(file.route.clone());
                continue;
            }

            match self.encoder.encode_file(file) {
                Ok(record) => {
                    present.insert(file.route.clone());
                    changed.push(IndexedFile { record, content_hash: hash });
                }
                Err(err) => {
                    tracing::warn!("Excluding {} from the index: {err}", file.route);
                    summary.files_failed += 1;
                }
            }
        }

        let applied = store.apply(snapshot, &encoder_name, &changed, &present)?;
        store.set_metadata("encoder", &encoder_name)?;
        store.set_metadata("tool_version", env!("CARGO_PKG_VERSION"))?;

        summary.files_indexed = applied.files_written;
        summary.files_removed = applied.files_removed;
        summary.embeddings_written = applied.embeddings_written;
        tracing::info!(
            indexed = summary.files_indexed,
            reused = summary.files_reused,
            failed = summary.files_failed,
            removed = summary.files_removed,
            "index updated"
        );
        Ok(summary)
    }

    /// Rank a pre-encoded `corpus` for a bug report.
    ///
    /// `files` supplies the raw sources the GUI terms are matched against; in
    /// [`LocalizationMode::Base`] the trace is ignored.
    pub fn localize(
        &self,
        report: &str,
        trace: Option<&str>,
        files: &[SourceFile],
        corpus: Vec<FileRecord>,
        mode: LocalizationMode,
    ) -> Result<Localization> {
        let terms = gui_terms(trace, mode);
        let selection = build_corpus(files, &terms.sc, None);
        let corpus = filter_corpus(corpus, &selection);
        self.rank_corpus(report, files, terms, corpus, mode)
    }

    /// Like [`Localizer::localize`], but only the files selected by the
    /// screen-component terms are read from `store`.
    pub fn localize_stored(
        &self,
        report: &str,
        trace: Option<&str>,
        files: &[SourceFile],
        store: &EmbeddingStore,
        snapshot: &RepoSnapshot,
        mode: LocalizationMode,
    ) -> Result<Localization> {
        let terms = gui_terms(trace, mode);
        let selection: HashSet<String> = build_corpus(files, &terms.sc, None).into_iter().collect();
        let routes = if selection.is_empty() { None } else { Some(&selection) };
        let corpus = store.load_corpus(snapshot, routes)?;
        self.rank_corpus(report, files, terms, corpus, mode)
    }

    fn rank_corpus(
        &self,
        report: &str,
        files: &[SourceFile],
        terms: GuiTerms,
        corpus: Vec<FileRecord>,
        mode: LocalizationMode,
    ) -> Result<Localization> {
        let mut query = build_query(report, &terms.sc, self.preprocess_query);
        if query.trim().is_empty() {
            query = report.to_string();
        }
        let query_embeddings = self.encoder.encode_bug_report(&query)?;
        let corpus_size = corpus.len();

        let ranked = self.ranker.rank_files(&query_embeddings, &corpus)?;
        let boosted = get_boosted_files(files, &terms.gs);
        let ranked = reorder_rankings(ranked, &boosted);

        tracing::debug!(
            %mode,
            corpus = corpus_size,
            sc_terms = terms.sc.len(),
            gs_terms = terms.gs.len(),
            boosted = boosted.len(),
            "localized"
        );
        Ok(Localization { ranked, terms, boosted, corpus_size, query })
    }

    /// Encode `files` in place and rank them; no store involved.
    pub fn localize_files(
        &self,
        report: &str,
        trace: Option<&str>,
        files: &[SourceFile],
        mode: LocalizationMode,
    ) -> Result<Localization> {
        let corpus = self.encode_files(files);
        self.localize(report, trace, files, corpus.records, mode)
    }
}

fn gui_terms(trace: Option<&str>, mode: LocalizationMode) -> GuiTerms {
    match mode {
        LocalizationMode::Enhanced => GuiTerms::from_json(trace),
        LocalizationMode::Base => GuiTerms::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::MethodChunker;
    use crate::encode::HashingEncoder;

    fn source(route: &str, content: &str) -> SourceFile {
        let name = route.rsplit('/').next().unwrap_or(route).to_string();
        SourceFile { path: route.into(), route: route.to_string(), name, content: content.to_string() }
    }

    fn encoder() -> TextEncoder {
        TextEncoder::new(Box::new(HashingEncoder::new(256)), MethodChunker::new(64))
    }

    fn repo() -> Vec<SourceFile> {
        vec![
            source(
                "app/ExpenseActivity.java",
                "class ExpenseActivity { void addExpense(double amount) { show(R.id.add_expense); total += amount; } }",
            ),
            source(
                "app/BudgetFragment.java",
                "class BudgetFragment { void saveBudget(double limit) { budget.limit = limit; } }",
            ),
            source("app/Constants.java", "class Constants { static final int MAX = 3; }"),
        ]
    }

    const TRACE: &str = r#"{"steps":[{"screen":{
        "activity":"MainActivity(Window{1 u0 app/MainActivity})",
        "window":"FRAGMENT:BudgetFragment",
        "dynGuiComponents":[{"idXml":"app:id/add_expense"}]}}]}"#;

    #[test]
    fn base_mode_ranks_by_similarity() {
        let encoder = encoder();
        let localizer = Localizer::new(&encoder, &Config::default());
        let out = localizer
            .localize_files("Adding an expense amount does not update the total", None, &repo(), LocalizationMode::Base)
            .unwrap();

        assert_eq!(out.ranked.len(), 3);
        assert_eq!(out.ranked[0].route, "app/ExpenseActivity.java");
        assert_eq!(out.ranked[2].route, "app/Constants.java");
        assert_eq!(out.ranked[2].score, f32::NEG_INFINITY);
        assert!(out.terms.is_empty());
    }

    #[test]
    fn enhanced_mode_filters_and_boosts() {
        let encoder = encoder();
        let localizer = Localizer::new(&encoder, &Config::default());
        let out = localizer
            .localize_files("Adding an expense amount does not update the total", Some(TRACE), &repo(), LocalizationMode::Enhanced)
            .unwrap();

        // only the file mentioning add_expense survives the corpus filter
        assert_eq!(out.corpus_size, 1);
        assert_eq!(out.boosted, vec!["app/BudgetFragment.java"]);
        assert_eq!(out.ranked.len(), 1);
        assert_eq!(out.ranked[0].route, "app/ExpenseActivity.java");
        assert!(out.query.ends_with("add expense"));
    }

    #[test]
    fn malformed_trace_falls_back_to_base_ranking() {
        let encoder = encoder();
        let localizer = Localizer::new(&encoder, &Config::default());
        let report = "Saving the budget limit is ignored";
        let enhanced =
            localizer.localize_files(report, Some(r#"{"events":[]}"#), &repo(), LocalizationMode::Enhanced).unwrap();
        let base = localizer.localize_files(report, None, &repo(), LocalizationMode::Base).unwrap();
        assert_eq!(enhanced.ranked, base.ranked);
    }

    #[test]
    fn reindexing_reuses_unchanged_files() {
        let encoder = encoder();
        let localizer = Localizer::new(&encoder, &Config::default());
        let mut store = EmbeddingStore::open_in_memory().unwrap();
        let snapshot = RepoSnapshot::new("demo", "head");

        let mut files = repo();
        let first = localizer.index_repository(&mut store, &snapshot, &files).unwrap();
        assert_eq!(first.files_indexed, 3);
        assert_eq!(first.files_reused, 0);

        files[1].content.push_str("\n// tweak");
        files.pop();
        let second = localizer.index_repository(&mut store, &snapshot, &files).unwrap();
        assert_eq!(second, IndexSummary { files_indexed: 1, files_reused: 1, files_failed: 0, files_removed: 1, embeddings_written: 1 });

        let corpus = store.load_corpus(&snapshot, None).unwrap();
        let out = localizer
            .localize("expense amount total", None, &files, corpus, LocalizationMode::Base)
            .unwrap();
        assert_eq!(out.ranked[0].route, "app/ExpenseActivity.java");
    }

    #[test]
    fn stored_corpus_is_narrowed_before_loading() {
        let encoder = encoder();
        let localizer = Localizer::new(&encoder, &Config::default());
        let mut store = EmbeddingStore::open_in_memory().unwrap();
        let snapshot = RepoSnapshot::new("demo", "head");
        let files = repo();
        localizer.index_repository(&mut store, &snapshot, &files).unwrap();

        let report = "Adding an expense amount does not update the total";
        let stored = localizer
            .localize_stored(report, Some(TRACE), &files, &store, &snapshot, LocalizationMode::Enhanced)
            .unwrap();
        assert_eq!(stored.corpus_size, 1);
        assert_eq!(stored.ranked[0].route, "app/ExpenseActivity.java");

        let in_memory = localizer.localize_files(report, Some(TRACE), &files, LocalizationMode::Enhanced).unwrap();
        assert_eq!(stored.ranked, in_memory.ranked);

        let base = localizer
            .localize_stored(report, None, &files, &store, &snapshot, LocalizationMode::Base)
            .unwrap();
        assert_eq!(base.corpus_size, 3);
    }

    #[test]
    fn files_without_identifiers_are_still_ranked() {
        let encoder = TextEncoder::new(Box::new(HashingEncoder::new(256)), MethodChunker::new(16));
        let localizer = Localizer::new(&encoder, &Config::default());
        let numbers: Vec<String> = (1..=40).map(|n| format!("{n},")).collect();
        let files = vec![
            source("Lookup.java", &format!("class Lookup {{ int[] t() {{ return new int[] {{ {} }}; }} }}", numbers.join(" "))),
            source("Other.java", "class Other { void run() { start(); } }"),
            source("Fn.java", "interface Fn<T> { T f(); }"),
        ];

        let corpus = localizer.encode_files(&files);
        assert!(corpus.failed.is_empty());

        let out = localizer.localize_files("table lookup returns wrong value", None, &files, LocalizationMode::Base).unwrap();
        let routes: Vec<&str> = out.ranked.iter().map(|r| r.route.as_str()).collect();
        assert_eq!(out.ranked.len(), 3);
        assert!(routes.contains(&"Lookup.java"));
        assert!(routes.contains(&"Fn.java"));
    }
}
