//! Vector store trait for storing, searching, and scanning vector points.

use async_trait::async_trait;

use crate::document::{PointPayload, RetrievedDocument, VectorPoint};
use crate::error::Result;

/// An opaque position in a collection scan, returned by one
/// [`VectorStore::scroll`] call and passed to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointCursor(String);

impl PointCursor {
    pub fn new(inner: impl Into<String>) -> Self {
        Self(inner.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A point returned by a scan, with its payload but no vector.
#[derive(Debug, Clone)]
pub struct ScrolledPoint {
    pub id: String,
    pub payload: Option<PointPayload>,
}

/// One page of a collection scan.
///
/// `next_cursor` is `Some` while more points may remain and `None` once the
/// collection is exhausted. An absent cursor is the only end-of-scan signal;
/// a short or even empty page with a cursor still present means the scan must
/// continue.
#[derive(Debug, Clone)]
pub struct ScrollPage {
    pub points: Vec<ScrolledPoint>,
    pub next_cursor: Option<PointCursor>,
}

/// A storage backend for vector points with similarity search and scanning.
///
/// Implementations manage named collections of [`VectorPoint`]s and support
/// upserting, paged scanning, deleting by id, and searching by vector
/// similarity.
///
/// # Example
///
/// ```rust,ignore
/// use ragline_core::{VectorStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.ensure_collection("docs", 1536).await?;
/// store.upsert("docs", &points).await?;
/// let hits = store.search("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection if it does not already exist.
    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Upsert points into a collection. Re-upserting an existing id replaces
    /// that point.
    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<()>;

    /// Search for the `top_k` most similar points to the given embedding.
    ///
    /// Returns results ordered by descending similarity score.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>>;

    /// Fetch one page of at most `limit` points, resuming from `cursor`.
    ///
    /// Pass `None` to start from the beginning and the returned
    /// `next_cursor` to continue. `limit` must be greater than zero.
    async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        cursor: Option<&PointCursor>,
    ) -> Result<ScrollPage>;

    /// Delete points by their ids from a collection.
    ///
    /// Returns the backend's operation id when it reports one.
    async fn delete_by_ids(&self, collection: &str, ids: &[String]) -> Result<Option<u64>>;
}
