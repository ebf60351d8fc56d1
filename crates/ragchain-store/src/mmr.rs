//! Maximal Marginal Relevance (MMR) for diversity-aware retrieval.
//!
//! MMR reranks candidates to balance relevance and diversity:
//! MMR = λ × sim(query, doc) - (1-λ) × max(sim(doc, selected_docs))
//!
//! λ = 1.0: Pure relevance (plain similarity search)
//! λ = 0.5: Balanced relevance + diversity
//! λ = 0.0: Pure diversity

use ndarray::Array1;

/// Candidate for MMR reranking.
#[derive(Debug, Clone, Copy)]
pub struct MmrCandidate<'a> {
    /// Caller-side index (row in the store).
    pub index: usize,
    /// Similarity to the query.
    pub score: f32,
    pub embedding: &'a Array1<f32>,
}

/// Cosine similarity; zero-magnitude vectors score 0.
pub fn cosine_similarity(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    let denom = a.dot(a).sqrt() * b.dot(b).sqrt();
    if denom <= f32::EPSILON {
        0.0
    } else {
        a.dot(b) / denom
    }
}

/// Rerank candidates using Maximal Marginal Relevance.
///
/// Relevance is each candidate's precomputed `score`. `candidates` should be
/// sorted by relevance descending. Returns up to `k` `(index, score)` pairs
/// in selection order. Ties keep the earlier candidate, so equal inputs give
/// equal outputs.
pub fn mmr_rerank(
    candidates: Vec<MmrCandidate<'_>>,
    k: usize,
    lambda: f32,
) -> Vec<(usize, f32)> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let lambda = lambda.clamp(0.0, 1.0);
    let k = k.min(candidates.len());

    let mut selected: Vec<MmrCandidate<'_>> = Vec::with_capacity(k);
    let mut remaining = candidates;

    while selected.len() < k && !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_mmr = f32::NEG_INFINITY;

        for (idx, candidate) in remaining.iter().enumerate() {
            let mmr_score = compute_mmr_score(candidate, &selected, lambda);
            if mmr_score > best_mmr {
                best_mmr = mmr_score;
                best_idx = idx;
            }
        }

        selected.push(remaining.remove(best_idx));
    }

    selected.into_iter().map(|c| (c.index, c.score)).collect()
}

fn compute_mmr_score(candidate: &MmrCandidate<'_>, selected: &[MmrCandidate<'_>], lambda: f32) -> f32 {
    let relevance = candidate.score;

    let max_similarity = selected
        .iter()
        .map(|s| cosine_similarity(candidate.embedding, s.embedding))
        .fold(None, |acc: Option<f32>, sim| Some(acc.map_or(sim, |a| a.max(sim))))
        .unwrap_or(0.0);

    lambda * relevance - (1.0 - lambda) * max_similarity
}
