//! Configuration for the ragline pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RaglineError, Result};

/// The collection all sources are indexed into.
pub const DEFAULT_COLLECTION: &str = "knowledge-sources";

/// Tuning parameters shared by ingestion, deindexing, and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RagConfig {
    /// Name of the vector store collection.
    pub collection: String,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of similarity candidates fetched per query.
    pub search_k: usize,
    /// Number of candidates the reranker keeps.
    pub rerank_top_n: usize,
    /// Number of points upserted per store call during ingestion.
    pub upsert_batch_size: usize,
    /// Page size used when scanning the full collection.
    pub scroll_page_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            search_k: 5,
            rerank_top_n: 5,
            upsert_batch_size: 64,
            scroll_page_size: 1000,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the vector store collection name.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.config.collection = collection.into();
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of similarity candidates fetched per query.
    pub fn search_k(mut self, k: usize) -> Self {
        self.config.search_k = k;
        self
    }

    /// Set the number of candidates the reranker keeps.
    pub fn rerank_top_n(mut self, n: usize) -> Self {
        self.config.rerank_top_n = n;
        self
    }

    /// Set the number of points upserted per store call.
    pub fn upsert_batch_size(mut self, size: usize) -> Self {
        self.config.upsert_batch_size = size;
        self
    }

    /// Set the page size for full-collection scans.
    pub fn scroll_page_size(mut self, size: usize) -> Self {
        self.config.scroll_page_size = size;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RaglineError::Config`] if:
    /// - `collection` is empty
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `search_k`, `rerank_top_n`, `upsert_batch_size`, or
    ///   `scroll_page_size` is zero
    pub fn build(self) -> Result<RagConfig> {
        if self.config.collection.is_empty() {
            return Err(RaglineError::Config("collection must not be empty".to_string()));
        }
        if self.config.chunk_size == 0 {
            return Err(RaglineError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RaglineError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        for (value, name) in [
            (self.config.search_k, "search_k"),
            (self.config.rerank_top_n, "rerank_top_n"),
            (self.config.upsert_batch_size, "upsert_batch_size"),
            (self.config.scroll_page_size, "scroll_page_size"),
        ] {
            if value == 0 {
                return Err(RaglineError::Config(format!("{name} must be greater than zero")));
            }
        }
        Ok(self.config)
    }
}

/// Bounds for the same-host web crawl behind `url` sources.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// How many link hops to follow from the start page (depth 0).
    pub max_depth: usize,
    /// Timeout applied to each page request.
    pub request_timeout: Duration,
    /// Path prefixes that are never crawled.
    pub excluded_paths: Vec<String>,
    /// User agent presented to crawled sites.
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            request_timeout: Duration::from_secs(10),
            excluded_paths: vec![
                "/admin".to_string(),
                "/login".to_string(),
                "/api".to_string(),
            ],
            user_agent: concat!("ragline/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
