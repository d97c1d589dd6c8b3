//! File ranking by embedding similarity

use crate::domain::{Embedding, FileRecord, RankedResult, RankingConfig};
use crate::error::Result;

pub mod ranker;

pub use ranker::{sort_rankings, top_k_mean, SimilarityRanker};

/// Rank `corpus` against `query` with top-k pooling, best match first.
pub fn rank_files(
    query: &[Embedding],
    corpus: &[FileRecord],
    ranking: &RankingConfig,
) -> Result<Vec<RankedResult>> {
    SimilarityRanker::from_config(ranking).rank_files(query, corpus)
}

/// Keep only the best `limit` entries of an ordered ranking.
pub fn top_results(mut ranked: Vec<RankedResult>, limit: usize) -> Vec<RankedResult> {
    ranked.truncate(limit);
    ranked
}
