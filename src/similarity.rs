//! Similarity scoring and top-K ranking.
//!
//! Scores are cosine similarity remapped from `[-1, 1]` to `[0, 1]` via
//! `(cos + 1) / 2`. The remap is monotonic, so ranking is unchanged, and the
//! documented `[0, 1]` range holds for arbitrary (including negative)
//! embeddings. A zero-norm vector on either side scores `0.0`.
//!
//! Search is brute force: every filtered candidate is scored, so a query
//! costs O(candidates × dimensions). There is no index acceleration.

use crate::models::{ScoredRecord, VectorRecord};
use crate::{Error, Result};
use std::cmp::Ordering;

/// Computes the similarity score between a query and a candidate vector.
///
/// Accumulates in `f64` and allocates nothing.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the lengths differ.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f64> {
    if query.len() != candidate.len() {
        return Err(Error::DimensionMismatch {
            expected: query.len(),
            actual: candidate.len(),
        });
    }

    let (mut dot, mut norm_q, mut norm_c) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (&q, &c) in query.iter().zip(candidate) {
        let (q, c) = (f64::from(q), f64::from(c));
        dot += q * c;
        norm_q += q * q;
        norm_c += c * c;
    }

    if norm_q == 0.0 || norm_c == 0.0 {
        return Ok(0.0);
    }

    let cosine = dot / (norm_q.sqrt() * norm_c.sqrt());
    if !cosine.is_finite() {
        return Ok(0.0);
    }
    Ok(f64::midpoint(cosine, 1.0).clamp(0.0, 1.0))
}

/// Orders scored records by descending score, then ascending id.
pub fn compare_scored(a: &ScoredRecord, b: &ScoredRecord) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.record.id.cmp(&b.record.id))
}

/// Scores every candidate against `query` and returns the best `top_k`.
///
/// The caller validates `query` against the store dimension once before
/// calling; a candidate with a different length still fails here rather
/// than being skipped.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if any candidate's length differs
/// from the query's.
pub fn rank_top_k<I>(query: &[f32], candidates: I, top_k: usize) -> Result<Vec<ScoredRecord>>
where
    I: IntoIterator<Item = VectorRecord>,
{
    let mut scored = Vec::new();
    for record in candidates {
        let score = cosine_similarity(query, &record.embedding)?;
        scored.push(ScoredRecord { record, score });
    }

    if scored.len() > top_k {
        scored.select_nth_unstable_by(top_k, compare_scored);
        scored.truncate(top_k);
    }
    scored.sort_by(compare_scored);
    Ok(scored)
}
