//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryStore`], a zero-dependency vector store
//! backed by a `BTreeMap` protected by a `tokio::sync::RwLock`. It is
//! suitable for development, testing, and small-scale use cases.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{PointPayload, RetrievedDocument, VectorPoint};
use crate::error::{RaglineError, Result};
use crate::vectorstore::{PointCursor, ScrollPage, ScrolledPoint, VectorStore};

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as `BTreeMap`s keyed by point id, so scans walk
/// points in a stable lexicographic order and cursors are plain ids. All
/// operations are async-safe via `tokio::sync::RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use ragline_core::{InMemoryStore, VectorStore};
///
/// let store = InMemoryStore::new();
/// store.ensure_collection("docs", 1536).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, StoredPoint>>>,
}

#[derive(Debug, Clone)]
struct StoredPoint {
    vector: Vec<f32>,
    payload: PointPayload,
}

impl InMemoryStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing_collection(collection: &str) -> RaglineError {
    RaglineError::Store {
        backend: "InMemory".to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

/// Compute cosine similarity between two vectors.
///
/// Both vectors are L2-normalized before computing the dot product.
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn ensure_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        for point in points {
            store.insert(
                point.id.clone(),
                StoredPoint { vector: point.vector.clone(), payload: point.payload.clone() },
            );
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;

        let mut scored: Vec<RetrievedDocument> = store
            .iter()
            .map(|(id, point)| RetrievedDocument {
                id: id.clone(),
                content: point.payload.content.clone(),
                metadata: Some(point.payload.metadata.clone()),
                score: cosine_similarity(&point.vector, embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        cursor: Option<&PointCursor>,
    ) -> Result<ScrollPage> {
        if limit == 0 {
            return Err(RaglineError::Store {
                backend: "InMemory".to_string(),
                message: "scroll limit must be greater than zero".to_string(),
            });
        }

        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;

        // Fetch one extra point to learn whether the scan is exhausted.
        let mut points: Vec<ScrolledPoint> = match cursor {
            Some(after) => store
                .range::<str, _>((Bound::Excluded(after.as_str()), Bound::Unbounded))
                .take(limit + 1)
                .map(|(id, point)| ScrolledPoint {
                    id: id.clone(),
                    payload: Some(point.payload.clone()),
                })
                .collect(),
            None => store
                .iter()
                .take(limit + 1)
                .map(|(id, point)| ScrolledPoint {
                    id: id.clone(),
                    payload: Some(point.payload.clone()),
                })
                .collect(),
        };

        let next_cursor = if points.len() > limit {
            points.truncate(limit);
            points.last().map(|p| PointCursor::new(p.id.clone()))
        } else {
            None
        };

        Ok(ScrollPage { points, next_cursor })
    }

    async fn delete_by_ids(&self, collection: &str, ids: &[String]) -> Result<Option<u64>> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        for id in ids {
            store.remove(id);
        }
        Ok(None)
    }
}
