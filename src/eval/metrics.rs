//! Retrieval-quality metrics over per-bug ground-truth hits.
//!
//! Every function takes one `Vec<BuggyFileRanking>` per evaluated bug. A bug
//! without hits (or whose run failed) contributes an empty list: it counts
//! toward the denominators of MAP, MRR and Hits@k but never as a hit.

use crate::domain::{BuggyFileRanking, NOT_FOUND_RANK};
use serde::Serialize;

/// Cut-offs reported for Hits@k, largest first as they appear in reports.
pub const HITS_CUTOFFS: [usize; 5] = [50, 25, 10, 5, 1];

/// Lowest rank among a bug's hits.
pub fn best_rank(rankings: &[BuggyFileRanking]) -> Option<usize> {
    rankings.iter().map(|r| r.rank).min()
}

/// Best rank per bug, [`NOT_FOUND_RANK`] for bugs without hits.
pub fn best_ranks(all_rankings: &[Vec<BuggyFileRanking>]) -> Vec<usize> {
    all_rankings.iter().map(|r| best_rank(r).unwrap_or(NOT_FOUND_RANK)).collect()
}

/// Number of bugs whose best rank is within `k`.
pub fn hits_at_k(k: usize, best_ranks: &[usize]) -> usize {
    best_ranks.iter().filter(|&&rank| rank <= k).count()
}

fn sorted_ranks(rankings: &[BuggyFileRanking]) -> Vec<usize> {
    let mut ranks: Vec<usize> = rankings.iter().map(|r| r.rank).collect();
    ranks.sort_unstable();
    ranks
}

fn average_precision(rankings: &[BuggyFileRanking], k: usize) -> f64 {
    let precisions: Vec<f64> = sorted_ranks(rankings)
        .into_iter()
        .filter(|&rank| rank >= 1 && rank <= k)
        .enumerate()
        .map(|(seen, rank)| (seen + 1) as f64 / rank as f64)
        .collect();
    if precisions.is_empty() {
        0.0
    } else {
        precisions.iter().sum::<f64>() / precisions.len() as f64
    }
}

fn reciprocal_rank(rankings: &[BuggyFileRanking], k: usize) -> f64 {
    match best_rank(rankings) {
        Some(rank) if rank >= 1 && rank <= k => 1.0 / rank as f64,
        _ => 0.0,
    }
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

/// Mean average precision over all bugs.
pub fn calculate_map(all_rankings: &[Vec<BuggyFileRanking>]) -> f64 {
    map_at_k(usize::MAX, all_rankings)
}

/// MAP counting only hits ranked within `k`.
pub fn map_at_k(k: usize, all_rankings: &[Vec<BuggyFileRanking>]) -> f64 {
    mean(all_rankings.iter().map(|r| average_precision(r, k)))
}

/// Mean reciprocal rank of each bug's best hit.
pub fn calculate_mrr(all_rankings: &[Vec<BuggyFileRanking>]) -> f64 {
    mrr_at_k(usize::MAX, all_rankings)
}

pub fn mrr_at_k(k: usize, all_rankings: &[Vec<BuggyFileRanking>]) -> f64 {
    mean(all_rankings.iter().map(|r| reciprocal_rank(r, k)))
}

/// Best, worst and mean of the per-bug best ranks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Effectiveness {
    pub best: usize,
    pub worst: usize,
    pub mean: f64,
}

/// Effectiveness over bugs with at least one hit; `None` when no bug has one.
pub fn calculate_effectiveness(all_rankings: &[Vec<BuggyFileRanking>]) -> Option<Effectiveness> {
    let ranks: Vec<usize> = all_rankings.iter().filter_map(|r| best_rank(r)).collect();
    let best = *ranks.iter().min()?;
    let worst = *ranks.iter().max()?;
    let mean = ranks.iter().sum::<usize>() as f64 / ranks.len() as f64;
    Some(Effectiveness { best, worst, mean })
}

/// Relative change of a Hits@k figure attributable to boosting.
///
/// `None` when the unboosted figure is zero and the ratio is undefined.
pub fn calculate_improvement(hits_with_boost: f64, hits_without_boost: f64) -> Option<f64> {
    if hits_without_boost == 0.0 {
        return None;
    }
    Some((hits_with_boost - hits_without_boost) / hits_without_boost)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HitsAtK {
    pub k: usize,
    pub hits: usize,
    pub total: usize,
}

impl HitsAtK {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }
}

/// Aggregate metrics of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total_bugs: usize,
    pub hits: Vec<HitsAtK>,
    pub map: f64,
    pub mrr: f64,
    pub effectiveness: Option<Effectiveness>,
    pub improvement: Option<f64>,
}

impl MetricsSummary {
    pub fn compute(all_rankings: &[Vec<BuggyFileRanking>]) -> Self {
        let ranks = best_ranks(all_rankings);
        let total = all_rankings.len();
        Self {
            total_bugs: total,
            hits: HITS_CUTOFFS.iter().map(|&k| HitsAtK { k, hits: hits_at_k(k, &ranks), total }).collect(),
            map: calculate_map(all_rankings),
            mrr: calculate_mrr(all_rankings),
            effectiveness: calculate_effectiveness(all_rankings),
            improvement: None,
        }
    }

    pub fn hits_at(&self, k: usize) -> Option<HitsAtK> {
        self.hits.iter().find(|h| h.k == k).copied()
    }

    pub fn with_improvement(mut self, improvement: Option<f64>) -> Self {
        self.improvement = improvement;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bug(bug_id: u64, ranks: &[usize]) -> Vec<BuggyFileRanking> {
        ranks
            .iter()
            .enumerate()
            .map(|(i, &rank)| BuggyFileRanking { bug_id, file_path: format!("F{i}.java"), rank })
            .collect()
    }

    #[test]
    fn single_hit_at_rank_three() {
        let all = vec![bug(1, &[3])];
        assert!((calculate_map(&all) - 1.0 / 3.0).abs() < 1e-12);
        assert!((calculate_mrr(&all) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(hits_at_k(1, &best_ranks(&all)), 0);
        assert_eq!(hits_at_k(3, &best_ranks(&all)), 1);
    }

    #[test]
    fn map_processes_hits_in_rank_order() {
        // hits at 1 and 4 listed out of order: (1/1 + 2/4) / 2
        let all = vec![bug(1, &[4, 1])];
        assert!((calculate_map(&all) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn bugs_without_hits_count_as_zero() {
        let all = vec![bug(1, &[1]), bug(2, &[])];
        assert!((calculate_map(&all) - 0.5).abs() < 1e-12);
        assert!((calculate_mrr(&all) - 0.5).abs() < 1e-12);
        assert_eq!(best_ranks(&all), vec![1, NOT_FOUND_RANK]);
    }

    #[test]
    fn cutoff_variants_ignore_deep_hits() {
        let all = vec![bug(1, &[2, 20])];
        assert!((map_at_k(10, &all) - 0.5).abs() < 1e-12);
        assert!((calculate_map(&all) - (0.5 + 2.0 / 20.0) / 2.0).abs() < 1e-12);
        assert_eq!(mrr_at_k(1, &all), 0.0);
        assert_eq!(mrr_at_k(2, &all), 0.5);
    }

    #[test]
    fn effectiveness_over_found_bugs() {
        let all = vec![bug(1, &[2, 7]), bug(2, &[]), bug(3, &[10])];
        let eff = calculate_effectiveness(&all).unwrap();
        assert_eq!(eff.best, 2);
        assert_eq!(eff.worst, 10);
        assert!((eff.mean - 6.0).abs() < 1e-12);
        assert_eq!(calculate_effectiveness(&[bug(1, &[])]), None);
    }

    #[test]
    fn improvement_is_relative() {
        assert_eq!(calculate_improvement(6.0, 4.0), Some(0.5));
        assert_eq!(calculate_improvement(2.0, 4.0), Some(-0.5));
        assert_eq!(calculate_improvement(3.0, 0.0), None);
    }

    #[test]
    fn empty_batch_is_all_zero() {
        let summary = MetricsSummary::compute(&[]);
        assert_eq!(summary.map, 0.0);
        assert_eq!(summary.mrr, 0.0);
        assert_eq!(summary.hits_at(10).unwrap().ratio(), 0.0);
        assert!(summary.effectiveness.is_none());
    }

    #[test]
    fn summary_collects_all_cutoffs() {
        let all = vec![bug(1, &[1]), bug(2, &[7]), bug(3, &[30]), bug(4, &[])];
        let summary = MetricsSummary::compute(&all);
        let hits: Vec<usize> = summary.hits.iter().map(|h| h.hits).collect();
        assert_eq!(hits, vec![3, 2, 2, 1, 1]);
        assert_eq!(summary.hits_at(10).unwrap().ratio(), 0.5);
    }
}
