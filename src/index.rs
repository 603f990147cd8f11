//! In-memory similarity index over one document's chunks.
//!
//! The index is built once per uploaded report and lives in the session;
//! there is no incremental update, deletion, or persistence.

use crate::embedding::{cosine_similarity, Embedder, EmbeddingError};

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<(String, Vec<f32>)>,
}

impl VectorIndex {
    /// Embed every chunk and keep `(text, vector)` pairs in insertion order.
    pub async fn build(embedder: &dyn Embedder, chunks: Vec<String>) -> Result<Self, EmbeddingError> {
        if chunks.is_empty() {
            return Ok(Self::default());
        }
        let vectors = embedder.embed_batch(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                sent: chunks.len(),
                received: vectors.len(),
            });
        }
        tracing::info!(chunks = chunks.len(), embedder = embedder.name(), "vector index built");
        Ok(Self {
            entries: chunks.into_iter().zip(vectors).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `k` nearest chunks with their cosine scores, best first.
    /// Equal scores keep insertion order.
    pub async fn search(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, EmbeddingError> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        let query_embedding = embedder.embed(query).await?;
        Ok(rank(&query_embedding, &self.entries, k))
    }

    /// Chunk texts only, nearest first.
    pub async fn query(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        k: usize,
    ) -> Result<Vec<String>, EmbeddingError> {
        let hits = self.search(embedder, query, k).await?;
        Ok(hits.into_iter().map(|hit| hit.text).collect())
    }
}

fn rank(query: &[f32], entries: &[(String, Vec<f32>)], top_k: usize) -> Vec<SearchHit> {
    let mut scored: Vec<(usize, f32)> = entries
        .iter()
        .enumerate()
        .map(|(i, (_, emb))| (i, cosine_similarity(query, emb)))
        .collect();

    // sort_by is stable, so ties stay in insertion order
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored
        .into_iter()
        .map(|(i, score)| SearchHit {
            text: entries[i].0.clone(),
            score,
        })
        .collect()
}
