//! Top-k pooled cosine similarity ranker.

use crate::domain::{Embedding, FileRecord, RankedResult, RankingConfig};
use crate::error::{LocalizeError, Result};

/// Scores files by the mean of their `top_k` best query/chunk similarities.
///
/// With `top_k = 1` this is max-pooling over all pairs. Files without
/// embeddings score `-inf` and therefore sort after every real similarity.
pub struct SimilarityRanker {
    top_k: usize,
}

impl Default for SimilarityRanker {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SimilarityRanker {
    pub fn new(top_k: usize) -> Self {
        Self { top_k: top_k.max(1) }
    }

    pub fn from_config(config: &RankingConfig) -> Self {
        Self::new(config.top_k)
    }

    pub fn rank_files(&self, query: &[Embedding], corpus: &[FileRecord]) -> Result<Vec<RankedResult>> {
        let query_rows = normalized_rows(query.iter().map(|e| e.vector.as_slice()));
        let width = check_width(&query_rows, None)?;

        let mut results = Vec::with_capacity(corpus.len());
        for file in corpus {
            let score = self.score_rows(&query_rows, width, file)?;
            results.push(RankedResult::new(file.route.clone(), score));
        }

        sort_rankings(&mut results);
        tracing::debug!(files = results.len(), top_k = self.top_k, "ranked corpus");
        Ok(results)
    }

    /// Pooled similarity of a single file against the query.
    pub fn score_file(&self, query: &[Embedding], file: &FileRecord) -> Result<f32> {
        let query_rows = normalized_rows(query.iter().map(|e| e.vector.as_slice()));
        let width = check_width(&query_rows, None)?;
        self.score_rows(&query_rows, width, file)
    }

    fn score_rows(&self, query_rows: &[Vec<f32>], width: Option<usize>, file: &FileRecord) -> Result<f32> {
        if file.is_empty() || query_rows.is_empty() {
            return Ok(f32::NEG_INFINITY);
        }

        let file_rows = normalized_rows(file.vectors());
        check_width(&file_rows, width)?;

        let mut scores = Vec::with_capacity(query_rows.len() * file_rows.len());
        for q in query_rows {
            for f in &file_rows {
                scores.push(dot(q, f));
            }
        }
        Ok(top_k_mean(scores, self.top_k))
    }
}

/// Mean of the `k` largest scores, or of all of them when fewer exist.
pub fn top_k_mean(mut scores: Vec<f32>, k: usize) -> f32 {
    if scores.is_empty() {
        return f32::NEG_INFINITY;
    }
    scores.sort_by(|a, b| b.total_cmp(a));
    let take = k.max(1).min(scores.len());
    scores[..take].iter().sum::<f32>() / take as f32
}

/// Order by descending score; equal scores fall back to the route so output
/// does not depend on corpus order.
pub fn sort_rankings(results: &mut [RankedResult]) {
    results.sort_by(|a, b| {
        b.score.total_cmp(&a.score).then_with(|| a.route.cmp(&b.route))
    });
}

fn normalized_rows<'a>(vectors: impl IntoIterator<Item = &'a [f32]>) -> Vec<Vec<f32>> {
    vectors
        .into_iter()
        .map(|v| {
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-12);
            v.iter().map(|x| x / norm).collect()
        })
        .collect()
}

fn check_width(rows: &[Vec<f32>], expected: Option<usize>) -> Result<Option<usize>> {
    let mut width = expected;
    for row in rows {
        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                return Err(LocalizeError::DimensionMismatch { expected: w, actual: row.len() })
            }
            Some(_) => {}
        }
    }
    Ok(width)
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
