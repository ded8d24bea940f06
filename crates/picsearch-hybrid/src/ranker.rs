//! Lexical/semantic score fusion.
//!
//! Candidates come from the vector index (nearest first). Their BM25 scores
//! and distances are min-max normalized over the candidate set, blended as
//! `alpha * bm25 - (1 - alpha) * distance`, rescaled, sorted, cut to `k`, and
//! turned into percentages with a softmax.

use serde::{Deserialize, Serialize};

use picsearch_core::config::SearchSettings;
use picsearch_core::types::DocId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankerSettings {
    pub alpha: f32,
    pub rescale_offset: f32,
    pub rescale_factor: f32,
    pub candidate_multiplier: usize,
}

impl Default for RankerSettings {
    fn default() -> Self { Self::from(&SearchSettings::default()) }
}

impl From<&SearchSettings> for RankerSettings {
    fn from(s: &SearchSettings) -> Self {
        Self { alpha: s.alpha, rescale_offset: s.rescale_offset, rescale_factor: s.rescale_factor, candidate_multiplier: s.candidate_multiplier }
    }
}

/// A ranked document with every intermediate score, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedHit {
    pub id: DocId,
    pub path: String,
    pub bm25: f32,
    pub distance: f32,
    /// Rescaled blend of the normalized scores.
    pub combined: f32,
    pub confidence: f32,
}

/// Ranking of one candidate before its path is attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub id: DocId,
    pub bm25: f32,
    pub distance: f32,
    pub combined: f32,
    pub confidence: f32,
}

/// `(x - min) / (max - min)`; all zeros when every value is equal.
pub fn min_max_normalize(values: &[f32]) -> Vec<f32> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if values.is_empty() || !range.is_finite() || range <= 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Softmax scaled to sum to 100. Shifted by the maximum so large inputs
/// (the rescaled blend reaches ~100) do not overflow `exp`.
pub fn softmax_percent(values: &[f32]) -> Vec<f32> {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| 100.0 * e / sum).collect()
}

#[derive(Debug, Clone, Default)]
pub struct HybridRanker {
    settings: RankerSettings,
}

impl HybridRanker {
    pub fn new(settings: RankerSettings) -> Self { Self { settings } }

    pub fn settings(&self) -> &RankerSettings { &self.settings }

    /// How many vector candidates to retrieve for `k` results.
    pub fn candidate_count(&self, k: usize, corpus_size: usize) -> usize {
        k.saturating_mul(self.settings.candidate_multiplier).min(corpus_size)
    }

    /// Rank `candidates` (`(id, distance)` from the vector index) using
    /// `lexical_scores`, the full-corpus BM25 scores indexed by id.
    ///
    /// Ids missing from `lexical_scores` score 0. Returns at most `k` entries,
    /// best first, ties broken by lower id.
    pub fn rank(&self, candidates: &[(DocId, f32)], lexical_scores: &[f32], k: usize) -> Vec<ScoredCandidate> {
        if k == 0 || candidates.is_empty() {
            return Vec::new();
        }
        let mut by_id = candidates.to_vec();
        by_id.sort_by_key(|(id, _)| *id);

        let bm25: Vec<f32> = by_id.iter().map(|(id, _)| lexical_scores.get(*id as usize).copied().unwrap_or(0.0)).collect();
        let distances: Vec<f32> = by_id.iter().map(|(_, d)| *d).collect();
        let bm25_norm = min_max_normalize(&bm25);
        let distance_norm = min_max_normalize(&distances);

        let RankerSettings { alpha, rescale_offset, rescale_factor, .. } = self.settings;
        let mut scored: Vec<ScoredCandidate> = by_id
            .iter()
            .enumerate()
            .map(|(i, (id, distance))| {
                let blend = alpha * bm25_norm[i] - (1.0 - alpha) * distance_norm[i];
                ScoredCandidate { id: *id, bm25: bm25[i], distance: *distance, combined: (rescale_offset + blend) * rescale_factor, confidence: 0.0 }
            })
            .collect();
        // stable: equal scores stay in id order
        scored.sort_by(|a, b| b.combined.total_cmp(&a.combined));
        scored.truncate(k);

        let combined: Vec<f32> = scored.iter().map(|s| s.combined).collect();
        for (s, c) in scored.iter_mut().zip(softmax_percent(&combined)) {
            s.confidence = c;
        }
        scored
    }
}
