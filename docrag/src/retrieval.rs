//! Score normalization and hybrid (semantic + lexical) ranking.

use std::cmp::Ordering;

use crate::bm25::bm25_scores;
use crate::error::Result;
use crate::query::SearchResult;

/// Metadata key recording which ranking produced a result.
pub const META_SCORE_TYPE: &str = "score_type";

/// How many times `n_results` candidates the semantic stage over-fetches
/// when hybrid ranking is enabled.
pub const HYBRID_FETCH_FACTOR: usize = 3;

/// Min–max normalize scores into [0, 1].
///
/// A constant list maps to all 1.0 so a degenerate score distribution never
/// zeroes out a ranking signal.
pub fn normalize_scores(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }

    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max == min {
        return vec![1.0; scores.len()];
    }

    scores.iter().map(|score| (score - min) / (max - min)).collect()
}

/// Convex combination of pre-normalized semantic and lexical scores.
///
/// `semantic_weight = 1` reduces to pure semantic ranking, `0` to pure
/// lexical ranking over the candidate pool.
pub fn fuse_scores(semantic: &[f32], lexical: &[f32], semantic_weight: f32) -> Vec<f32> {
    debug_assert_eq!(semantic.len(), lexical.len());
    semantic
        .iter()
        .zip(lexical)
        .map(|(s, l)| semantic_weight * s + (1.0 - semantic_weight) * l)
        .collect()
}

/// Re-rank semantically retrieved candidates with BM25 and keep the best
/// `n_results`.
///
/// Both score lists are min–max normalized independently before fusion, so
/// the weight acts on comparable scales.
pub fn hybrid_rank(
    query_text: &str,
    candidates: Vec<SearchResult>,
    semantic_weight: f32,
    n_results: usize,
) -> Result<Vec<SearchResult>> {
    if candidates.is_empty() {
        return Ok(candidates);
    }

    let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
    let semantic: Vec<f32> = candidates.iter().map(|c| c.score).collect();
    let semantic_norm = normalize_scores(&semantic);
    let lexical_norm = normalize_scores(&bm25_scores(query_text, &texts));
    let combined = fuse_scores(&semantic_norm, &lexical_norm, semantic_weight);

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| combined[b].partial_cmp(&combined[a]).unwrap_or(Ordering::Equal));

    order
        .into_iter()
        .take(n_results)
        .map(|i| {
            let candidate = &candidates[i];
            let mut metadata = candidate.metadata.clone();
            metadata.insert(META_SCORE_TYPE.to_string(), "hybrid".to_string());
            SearchResult::new(
                candidate.chunk_id.clone(),
                candidate.text.clone(),
                combined[i].clamp(0.0, 1.0),
                metadata,
            )
        })
        .collect()
}
