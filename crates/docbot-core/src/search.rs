//! Brute-force similarity ranking and the confidence gate.
//!
//! Tenant corpora are small, so ranking is a full linear scan: score every
//! chunk against the query vector, stable-sort descending, truncate. Any
//! approximate index could replace [`rank_chunks`] without changing the
//! contract.
//!
//! # Confidence Gate
//!
//! Only the **maximum** similarity is compared against the threshold: one
//! strongly relevant chunk is enough to answer even when the rest of the
//! retrieved context is noise. The **average** similarity is still reported
//! on every answer as the confidence metric.

use serde::Serialize;

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, SearchResult};

/// Rank `chunks` against `query_vec` and keep the best `top_k`.
///
/// Sorting is stable, so equal scores keep insertion order.
pub fn rank_chunks<'a, I>(query_vec: &[f32], chunks: I, top_k: usize) -> Vec<SearchResult>
where
    I: IntoIterator<Item = &'a Chunk>,
{
    rank_by(chunks, top_k, |c| cosine_similarity(query_vec, &c.vector))
}

/// Like [`rank_chunks`] with a caller-supplied score per chunk.
pub fn rank_by<'a, I, F>(chunks: I, top_k: usize, mut score: F) -> Vec<SearchResult>
where
    I: IntoIterator<Item = &'a Chunk>,
    F: FnMut(&Chunk) -> f32,
{
    if top_k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f32, &Chunk)> = chunks.into_iter().map(|c| (score(c), c)).collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(similarity, c)| SearchResult {
            text: c.text.clone(),
            source: c.source.clone(),
            similarity,
        })
        .collect()
}

/// Ranked results plus their aggregate similarity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Retrieval {
    pub results: Vec<SearchResult>,
    /// Mean similarity of `results`; `0.0` when empty.
    pub avg_similarity: f32,
    /// Best similarity of `results`; `0.0` when empty.
    pub max_similarity: f32,
}

impl Retrieval {
    pub fn from_results(results: Vec<SearchResult>) -> Self {
        if results.is_empty() {
            return Self::default();
        }
        let sum: f32 = results.iter().map(|r| r.similarity).sum();
        let max = results
            .iter()
            .map(|r| r.similarity)
            .fold(f32::NEG_INFINITY, f32::max);
        Self {
            avg_similarity: sum / results.len() as f32,
            max_similarity: max,
            results,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Distinct sources in ranked order.
    pub fn sources(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for r in &self.results {
            if !seen.contains(&r.source) {
                seen.push(r.source.clone());
            }
        }
        seen
    }
}

/// What the gate decided about a [`Retrieval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    /// The tenant has nothing stored. Not a low-confidence case.
    NoKnowledgeBase,
    /// Results exist but the best one is below the threshold.
    Insufficient,
    Sufficient,
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    pub threshold: f32,
}

impl ConfidenceGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn assess(&self, retrieval: &Retrieval) -> Assessment {
        if retrieval.is_empty() {
            Assessment::NoKnowledgeBase
        } else if retrieval.max_similarity < self.threshold {
            Assessment::Insufficient
        } else {
            Assessment::Sufficient
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, source: &str, vector: Vec<f32>) -> Chunk {
        Chunk {
            text: text.to_string(),
            source: source.to_string(),
            chunk_index: 0,
            tenant_id: "t".to_string(),
            vector,
            model: None,
        }
    }

    fn result(source: &str, similarity: f32) -> SearchResult {
        SearchResult {
            text: String::new(),
            source: source.to_string(),
            similarity,
        }
    }

    #[test]
    fn test_rank_sorted_and_truncated() {
        let chunks = vec![
            chunk("a", "s1", vec![0.0, 1.0]),
            chunk("b", "s2", vec![1.0, 0.0]),
            chunk("c", "s3", vec![1.0, 1.0]),
        ];
        let ranked = rank_chunks(&[1.0, 0.0], &chunks, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].text, "b");
        assert_eq!(ranked[1].text, "c");
        assert!(ranked[0].similarity >= ranked[1].similarity);
    }

    #[test]
    fn test_rank_ties_keep_insertion_order() {
        let chunks = vec![
            chunk("first", "s", vec![1.0, 0.0]),
            chunk("second", "s", vec![2.0, 0.0]),
            chunk("third", "s", vec![3.0, 0.0]),
        ];
        let ranked = rank_chunks(&[1.0, 0.0], &chunks, 3);
        let order: Vec<&str> = ranked.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rank_by_custom_score() {
        let chunks = vec![chunk("short", "s", vec![]), chunk("much longer", "s", vec![])];
        let ranked = rank_by(&chunks, 1, |c| c.text.len() as f32);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].text, "much longer");
        assert_eq!(ranked[0].similarity, 11.0);
    }

    #[test]
    fn test_rank_zero_top_k() {
        let chunks = vec![chunk("a", "s", vec![1.0])];
        assert!(rank_chunks(&[1.0], &chunks, 0).is_empty());
    }

    #[test]
    fn test_retrieval_aggregates() {
        let r = Retrieval::from_results(vec![result("a", 0.9), result("b", 0.1), result("a", 0.2)]);
        assert!((r.max_similarity - 0.9).abs() < 1e-6);
        assert!((r.avg_similarity - 0.4).abs() < 1e-6);
        assert_eq!(r.sources(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_gate_uses_max_not_average() {
        let gate = ConfidenceGate::new(0.30);
        // Average 0.2 is below the threshold but the best result clears it.
        let r = Retrieval::from_results(vec![result("a", 0.5), result("b", 0.05), result("c", 0.05)]);
        assert!(r.avg_similarity < 0.30);
        assert_eq!(gate.assess(&r), Assessment::Sufficient);

        let low = Retrieval::from_results(vec![result("a", 0.29)]);
        assert_eq!(gate.assess(&low), Assessment::Insufficient);

        assert_eq!(gate.assess(&Retrieval::default()), Assessment::NoKnowledgeBase);
    }
}
