//! Relevance reranking of retrieved candidates.

use async_trait::async_trait;

use crate::error::Result;

/// A candidate's position in the original input slice together with the
/// relevance score assigned by the reranker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedIndex {
    /// Index into the `documents` slice passed to [`Reranker::rerank`].
    pub index: usize,
    /// Relevance of the candidate to the query. Higher is more relevant.
    pub relevance_score: f32,
}

/// Scores candidate documents against a query.
///
/// Implementations return at most `top_n` entries. Each entry refers back to
/// the input slice by index, so callers can recover the full document and its
/// metadata after reranking.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rank `documents` by relevance to `query`, returning the best `top_n`.
    async fn rerank(
        &self,
        query: &str,
        documents: &[&str],
        top_n: usize,
    ) -> Result<Vec<RankedIndex>>;
}

/// A reranker that preserves the input order and assigns every candidate a
/// relevance of `1.0`. Useful for tests and for running the retrieval path
/// without a scoring provider.
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    async fn rerank(
        &self,
        _query: &str,
        documents: &[&str],
        top_n: usize,
    ) -> Result<Vec<RankedIndex>> {
        Ok((0..top_n.min(documents.len()))
            .map(|index| RankedIndex { index, relevance_score: 1.0 })
            .collect())
    }
}
