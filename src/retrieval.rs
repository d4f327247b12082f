//! Retrieval with a confidence gate.
//!
//! Pulls the top chunks for a question from the tenant store and reports
//! both the ranked results and how much to trust them.

use std::sync::Arc;

use anyhow::Result;
use docbot_core::search::{Assessment, ConfidenceGate, Retrieval};
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::store::TenantStore;

pub struct Retriever {
    store: Arc<TenantStore>,
    gate: ConfidenceGate,
    default_top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<TenantStore>, config: &RetrievalConfig) -> Self {
        Self {
            store,
            gate: ConfidenceGate::new(config.confidence_threshold),
            default_top_k: config.top_k,
        }
    }

    pub fn store(&self) -> &Arc<TenantStore> {
        &self.store
    }

    /// Search `tenant_id` for `question`, using the configured `top_k`
    /// when none (or zero) is given.
    pub async fn retrieve(
        &self,
        question: &str,
        tenant_id: &str,
        top_k: Option<usize>,
    ) -> Result<Retrieval> {
        let k = top_k.filter(|&k| k > 0).unwrap_or(self.default_top_k);
        let results = self.store.search(question, tenant_id, k).await?;
        let retrieval = Retrieval::from_results(results);
        debug!(
            tenant = %tenant_id,
            results = retrieval.results.len(),
            max = retrieval.max_similarity,
            avg = retrieval.avg_similarity,
            "retrieved context"
        );
        Ok(retrieval)
    }

    pub fn assess(&self, retrieval: &Retrieval) -> Assessment {
        self.gate.assess(retrieval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docbot_core::embedding::EmbeddingProvider;
    use docbot_core::models::NewChunk;

    /// One axis per keyword, so unrelated texts score exactly zero.
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keywords"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let t = text.to_lowercase();
            Ok(["stake", "token", "volcano"]
                .iter()
                .map(|k| if t.contains(k) { 1.0 } else { 0.0 })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_gate_outcomes() {
        let store = Arc::new(TenantStore::in_memory(Arc::new(KeywordEmbedder)));
        store
            .add_documents(
                vec![NewChunk::new("Stake minimum is 100 tokens", "staking.md", 0)],
                "p1",
            )
            .await
            .unwrap();
        let retriever = Retriever::new(store, &RetrievalConfig::default());

        let empty = retriever.retrieve("anything", "p2", None).await.unwrap();
        assert_eq!(retriever.assess(&empty), Assessment::NoKnowledgeBase);

        let hit = retriever.retrieve("how do I stake", "p1", None).await.unwrap();
        assert_eq!(retriever.assess(&hit), Assessment::Sufficient);

        let miss = retriever.retrieve("volcano", "p1", Some(1)).await.unwrap();
        assert_eq!(miss.results.len(), 1);
        assert_eq!(miss.max_similarity, 0.0);
        assert_eq!(retriever.assess(&miss), Assessment::Insufficient);
    }

    #[tokio::test]
    async fn test_zero_top_k_uses_default() {
        let store = Arc::new(TenantStore::in_memory(Arc::new(KeywordEmbedder)));
        store
            .add_documents(
                vec![NewChunk::new("Stake minimum is 100 tokens", "staking.md", 0)],
                "p1",
            )
            .await
            .unwrap();
        let retriever = Retriever::new(store, &RetrievalConfig::default());

        let r = retriever.retrieve("how do I stake", "p1", Some(0)).await.unwrap();
        assert_eq!(r.results.len(), 1);
        assert_eq!(retriever.assess(&r), Assessment::Sufficient);
    }
}
