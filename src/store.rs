//! Multi-tenant chunk storage with brute-force vector search.
//!
//! Chunks live in memory, partitioned by tenant. Each partition has its own
//! lock, so a large ingest for one tenant never blocks searches for another.
//! After every mutation the whole store is written to a JSON snapshot:
//!
//! ```json
//! { "version": 1, "chunks": [ { "text": "...", "source": "...", ... } ] }
//! ```
//!
//! A bare JSON array of chunks is accepted on load for older data
//! directories. Missing or unreadable snapshots start the store empty.
//!
//! Search is a linear cosine scan over the tenant's partition. Fine for the
//! few thousand chunks a project's docs produce.
//!
//! # Embedding spaces
//!
//! Every chunk records the model that produced its vector. Vectors from
//! different models are never compared:
//!
//! - When the provider answers, chunks tagged with another model (for
//!   example hash vectors stored during an outage) are re-embedded before
//!   ranking.
//! - When the provider is down, the query and every chunk are compared in
//!   hash space instead.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use docbot_core::embedding::{
    cosine_similarity, hash_embedding, EmbeddingProvider, HASH_EMBEDDING_MODEL,
};
use docbot_core::models::{Chunk, NewChunk, SearchResult, TenantSummary};
use docbot_core::search::{rank_by, rank_chunks};

use crate::embedding::FallbackEmbedder;

const SNAPSHOT_VERSION: u32 = 1;

type Partition = Arc<RwLock<Vec<Chunk>>>;

#[derive(Serialize)]
struct SnapshotOut<'a> {
    version: u32,
    chunks: &'a [Chunk],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotIn {
    Versioned {
        #[serde(default)]
        #[allow(dead_code)]
        version: u32,
        chunks: Vec<Chunk>,
    },
    Legacy(Vec<Chunk>),
}

/// Tenant-partitioned document store.
pub struct TenantStore {
    partitions: RwLock<HashMap<String, Partition>>,
    embedder: FallbackEmbedder,
    snapshot_path: Option<PathBuf>,
    /// Serializes snapshot writers.
    writer: Mutex<()>,
}

impl TenantStore {
    /// A store that never touches disk.
    pub fn in_memory(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
            embedder: FallbackEmbedder::new(embedder),
            snapshot_path: None,
            writer: Mutex::new(()),
        }
    }

    /// Open the store backed by `snapshot_path`, loading whatever it holds.
    pub fn open(snapshot_path: impl Into<PathBuf>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let snapshot_path = snapshot_path.into();
        let mut partitions: HashMap<String, Partition> = HashMap::new();

        match read_snapshot(&snapshot_path) {
            Ok(Some(chunks)) => {
                let total = chunks.len();
                let mut grouped: HashMap<String, Vec<Chunk>> = HashMap::new();
                for chunk in chunks {
                    grouped.entry(chunk.tenant_id.clone()).or_default().push(chunk);
                }
                info!(
                    path = %snapshot_path.display(),
                    chunks = total,
                    tenants = grouped.len(),
                    "loaded document snapshot"
                );
                partitions = grouped
                    .into_iter()
                    .map(|(tenant, chunks)| (tenant, Arc::new(RwLock::new(chunks))))
                    .collect();
            }
            Ok(None) => {
                debug!(path = %snapshot_path.display(), "no document snapshot, starting empty");
            }
            Err(e) => {
                warn!(
                    path = %snapshot_path.display(),
                    error = %e,
                    "failed to load document snapshot, starting empty"
                );
            }
        }

        Self {
            partitions: RwLock::new(partitions),
            embedder: FallbackEmbedder::new(embedder),
            snapshot_path: Some(snapshot_path),
            writer: Mutex::new(()),
        }
    }

    pub fn embedder(&self) -> &FallbackEmbedder {
        &self.embedder
    }

    async fn partition(&self, tenant_id: &str) -> Option<Partition> {
        self.partitions.read().await.get(tenant_id).cloned()
    }

    async fn partition_or_create(&self, tenant_id: &str) -> Partition {
        if let Some(p) = self.partition(tenant_id).await {
            return p;
        }
        let mut map = self.partitions.write().await;
        map.entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Vec::new())))
            .clone()
    }

    /// Append `chunks` to `tenant_id`, embedding any that lack a vector.
    ///
    /// Supplied vectors are taken to come from the configured model. Returns
    /// the number added. Never deduplicates.
    pub async fn add_documents(&self, chunks: Vec<NewChunk>, tenant_id: &str) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let missing: Vec<String> = chunks
            .iter()
            .filter(|c| c.vector.is_none())
            .map(|c| c.text.clone())
            .collect();
        let mut computed = if missing.is_empty() {
            Vec::new().into_iter()
        } else {
            self.embedder.embed_batch(&missing).await.into_iter()
        };

        let mut stored = Vec::with_capacity(chunks.len());
        for c in chunks {
            let (vector, model) = match c.vector {
                Some(v) => (v, self.embedder.model_name().to_string()),
                None => computed
                    .next()
                    .map(|e| (e.vector, e.model))
                    .unwrap_or_default(),
            };
            stored.push(Chunk {
                text: c.text,
                source: c.source,
                chunk_index: c.chunk_index,
                tenant_id: tenant_id.to_string(),
                vector,
                model: Some(model),
            });
        }
        let added = stored.len();

        let partition = self.partition_or_create(tenant_id).await;
        partition.write().await.extend(stored);
        info!(tenant = %tenant_id, added, "added documents");

        self.save_snapshot().await;
        Ok(added)
    }

    /// Top `top_k` chunks of `tenant_id` by cosine similarity to `query`.
    ///
    /// An empty tenant returns no results without calling the embedder.
    pub async fn search(
        &self,
        query: &str,
        tenant_id: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let Some(partition) = self.partition(tenant_id).await else {
            return Ok(Vec::new());
        };
        if partition.read().await.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed(query).await;
        let (model, dims) = (self.embedder.model_name(), self.embedder.dims());

        if query_vec.model == model && self.backfill(tenant_id, &partition).await {
            let chunks = partition.read().await;
            return Ok(rank_chunks(
                &query_vec.vector,
                chunks.iter().filter(|c| c.is_embedded_with(model, dims)),
                top_k,
            ));
        }

        debug!(tenant = %tenant_id, "ranking in hash space");
        let query_hash = if query_vec.model == HASH_EMBEDDING_MODEL {
            query_vec.vector
        } else {
            hash_embedding(query)
        };
        let chunks = partition.read().await;
        Ok(rank_by(chunks.iter(), top_k, |c| {
            if c.model.as_deref() == Some(HASH_EMBEDDING_MODEL) {
                cosine_similarity(&query_hash, &c.vector)
            } else {
                cosine_similarity(&query_hash, &hash_embedding(&c.text))
            }
        }))
    }

    /// Re-embed the tenant's chunks whose vectors come from another model.
    ///
    /// Returns `false` when some chunks could not be re-embedded.
    async fn backfill(&self, tenant_id: &str, partition: &Partition) -> bool {
        let (model, dims) = (self.embedder.model_name(), self.embedder.dims());
        let pending: Vec<(usize, String)> = partition
            .read()
            .await
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_embedded_with(model, dims))
            .map(|(i, c)| (i, c.text.clone()))
            .collect();
        if pending.is_empty() {
            return true;
        }

        let texts: Vec<String> = pending.iter().map(|(_, t)| t.clone()).collect();
        let vectors = match self.embedder.primary().embed_batch(&texts).await {
            Ok(v) if v.len() == texts.len() => v,
            Ok(v) => {
                warn!(
                    tenant = %tenant_id,
                    expected = texts.len(),
                    got = v.len(),
                    "re-embedding batch size mismatch"
                );
                return false;
            }
            Err(e) => {
                warn!(tenant = %tenant_id, pending = texts.len(), error = %e, "re-embedding failed");
                return false;
            }
        };

        let mut updated = 0;
        {
            let mut chunks = partition.write().await;
            for ((i, text), vector) in pending.into_iter().zip(vectors) {
                // The partition may have been cleared or extended meanwhile.
                if let Some(c) = chunks.get_mut(i) {
                    if c.text == text && !c.is_embedded_with(model, dims) {
                        c.vector = vector;
                        c.model = Some(model.to_string());
                        updated += 1;
                    }
                }
            }
        }
        if updated > 0 {
            info!(tenant = %tenant_id, updated, model, "re-embedded chunks");
            self.save_snapshot().await;
        }
        true
    }

    /// Remove every chunk of `tenant_id`. Returns the number removed.
    pub async fn clear_tenant(&self, tenant_id: &str) -> usize {
        let Some(partition) = self.partition(tenant_id).await else {
            return 0;
        };
        let removed = {
            let mut chunks = partition.write().await;
            let n = chunks.len();
            chunks.clear();
            n
        };
        if removed > 0 {
            info!(tenant = %tenant_id, removed, "cleared tenant");
            self.save_snapshot().await;
        }
        removed
    }

    /// Remove every chunk of every tenant. Returns the number removed.
    pub async fn clear_all(&self) -> usize {
        let partitions: Vec<Partition> = self.partitions.read().await.values().cloned().collect();
        let mut removed = 0;
        for p in partitions {
            let mut chunks = p.write().await;
            removed += chunks.len();
            chunks.clear();
        }
        info!(removed, "cleared all tenants");
        self.save_snapshot().await;
        removed
    }

    /// Chunk count for one tenant, or across all tenants when `None`.
    pub async fn count(&self, tenant_id: Option<&str>) -> usize {
        match tenant_id {
            Some(t) => match self.partition(t).await {
                Some(p) => p.read().await.len(),
                None => 0,
            },
            None => {
                let partitions: Vec<Partition> =
                    self.partitions.read().await.values().cloned().collect();
                let mut total = 0;
                for p in partitions {
                    total += p.read().await.len();
                }
                total
            }
        }
    }

    /// Non-empty tenants, sorted by id.
    pub async fn list_tenants(&self) -> Vec<TenantSummary> {
        let partitions: Vec<(String, Partition)> = self
            .partitions
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut summaries = Vec::new();
        for (tenant_id, p) in partitions {
            let chunks = p.read().await;
            if chunks.is_empty() {
                continue;
            }
            let sources: BTreeSet<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
            summaries.push(TenantSummary {
                tenant_id,
                doc_count: chunks.len(),
                sources: sources.into_iter().map(String::from).collect(),
            });
        }
        summaries.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));
        summaries
    }

    /// Copy every partition, then write the copy to disk.
    ///
    /// Failures are logged; memory is never rolled back.
    async fn save_snapshot(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let _writer = self.writer.lock().await;

        let mut tenants: Vec<(String, Partition)> = self
            .partitions
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        tenants.sort_by(|a, b| a.0.cmp(&b.0));

        let mut all = Vec::new();
        for (_, p) in &tenants {
            all.extend(p.read().await.iter().cloned());
        }

        if let Err(e) = write_snapshot(path, &all).await {
            error!(path = %path.display(), error = %e, "failed to save document snapshot");
        } else {
            debug!(path = %path.display(), chunks = all.len(), "saved document snapshot");
        }
    }
}

fn read_snapshot(path: &Path) -> Result<Option<Vec<Chunk>>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: SnapshotIn = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(match parsed {
        SnapshotIn::Versioned { chunks, .. } => chunks,
        SnapshotIn::Legacy(chunks) => chunks,
    }))
}

async fn write_snapshot(path: &Path, chunks: &[Chunk]) -> Result<()> {
    let json = serde_json::to_vec(&SnapshotOut {
        version: SNAPSHOT_VERSION,
        chunks,
    })?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
