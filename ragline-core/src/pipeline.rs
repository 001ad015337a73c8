//! Ingestion pipeline: load → chunk → embed → upsert.
//!
//! The [`IngestionPipeline`] turns a [`Source`] into vector points by
//! resolving its text, splitting it into overlapping chunks, embedding the
//! chunks in one batch, and upserting the points in bounded batches.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragline_core::{IngestionPipeline, RagConfig, InMemoryStore};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedder(Arc::new(my_embedder))
//!     .store(Arc::new(InMemoryStore::new()))
//!     .build()?;
//!
//! pipeline.ensure_collection().await?;
//! let report = pipeline.ingest(&source).await?;
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::chunking::TextSplitter;
use crate::config::{CrawlConfig, RagConfig};
use crate::document::{point_id, IngestReport, PointMetadata, PointPayload, Source, VectorPoint};
use crate::embedding::EmbeddingProvider;
use crate::error::{RaglineError, Result};
use crate::loader::SourceLoader;
use crate::vectorstore::VectorStore;

/// The ingestion half of the pipeline.
///
/// Construct one via [`IngestionPipeline::builder()`]. Re-ingesting a source
/// replaces its existing points, since point ids are derived from the source
/// id and chunk index.
pub struct IngestionPipeline {
    config: RagConfig,
    loader: SourceLoader,
    splitter: TextSplitter,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Create the configured collection if it does not already exist.
    ///
    /// The collection is created with the dimensionality reported by the
    /// configured [`EmbeddingProvider`].
    pub async fn ensure_collection(&self) -> Result<()> {
        let dimensions = self.embedder.dimensions();
        self.store.ensure_collection(&self.config.collection, dimensions).await.map_err(|e| {
            error!(collection = %self.config.collection, error = %e, "failed to ensure collection");
            e
        })
    }

    /// Ingest a single source: load → chunk → embed → upsert.
    ///
    /// A source whose resolved text is empty is reported as successfully
    /// ingested with zero chunks.
    ///
    /// # Errors
    ///
    /// Returns the underlying failure for loading, embedding, or a first
    /// upsert batch. Returns [`RaglineError::PartialIndex`] when a later
    /// upsert batch fails after earlier batches were already written, so the
    /// caller knows the collection holds an incomplete source.
    pub async fn ingest(&self, source: &Source) -> Result<IngestReport> {
        self.ensure_collection().await?;

        let text = self.loader.load(source).await.map_err(|e| {
            error!(source.id = %source.id, error = %e, "failed to load source content");
            e
        })?;

        let chunks = match self.splitter.split(&text) {
            Ok(chunks) => chunks,
            Err(RaglineError::EmptyInput) => {
                info!(source.id = %source.id, chunk_count = 0, "source produced no text to index");
                return Ok(IngestReport { source_id: source.id.clone(), chunk_count: 0 });
            }
            Err(e) => return Err(e),
        };

        let texts: Vec<&str> = chunks.iter().map(|c| c.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await.map_err(|e| {
            error!(source.id = %source.id, error = %e, "embedding failed during ingestion");
            e
        })?;

        if embeddings.len() != chunks.len() {
            return Err(RaglineError::Pipeline(format!(
                "embedding count mismatch: {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        // One timestamp for the whole call, shared by every chunk.
        let created_at = Utc::now();
        let chunk_count = chunks.len();

        let points: Vec<VectorPoint> = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (chunk, vector))| VectorPoint {
                id: point_id(&source.id, index),
                vector,
                payload: PointPayload {
                    content: chunk.clone(),
                    metadata: PointMetadata {
                        source_id: source.id.clone(),
                        source_type: source.source_type,
                        source_name: source.name.clone(),
                        chunk_index: index,
                        chunk_count,
                        created_at,
                    },
                },
            })
            .collect();

        let mut written = 0usize;
        for batch in points.chunks(self.config.upsert_batch_size) {
            if let Err(e) = self.store.upsert(&self.config.collection, batch).await {
                error!(
                    source.id = %source.id,
                    written,
                    expected = points.len(),
                    error = %e,
                    "upsert failed during ingestion"
                );
                if written == 0 {
                    return Err(e);
                }
                return Err(RaglineError::PartialIndex {
                    source_id: source.id.clone(),
                    written,
                    expected: points.len(),
                });
            }
            written += batch.len();
        }

        info!(source.id = %source.id, chunk_count, "ingested source");

        Ok(IngestReport { source_id: source.id.clone(), chunk_count })
    }
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// `embedder` and `store` are required; `config` and `crawl_config` fall
/// back to their defaults.
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    crawl_config: Option<CrawlConfig>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
}

impl IngestionPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the crawl bounds used for `url` sources.
    pub fn crawl_config(mut self, crawl_config: CrawlConfig) -> Self {
        self.crawl_config = Some(crawl_config);
        self
    }

    /// Set the embedding provider.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the vector store backend.
    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the [`IngestionPipeline`], validating that required fields are
    /// set and that the chunking parameters are consistent.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config = self.config.unwrap_or_default();
        let crawl_config = self.crawl_config.unwrap_or_default();
        let embedder =
            self.embedder.ok_or_else(|| RaglineError::Config("embedder is required".to_string()))?;
        let store =
            self.store.ok_or_else(|| RaglineError::Config("store is required".to_string()))?;

        let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap)?;
        let loader = SourceLoader::new(crawl_config)?;

        Ok(IngestionPipeline { config, loader, splitter, embedder, store })
    }
}
