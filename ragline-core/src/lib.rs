//! # ragline-core
//!
//! Retrieval-augmented answering over a single vector collection.
//!
//! ## Overview
//!
//! Sources (inline text, remote PDFs, or crawlable sites) are chunked,
//! embedded, and upserted into a vector store; questions are answered by
//! retrieving the most similar chunks, reranking them, and prompting a chat
//! model with a numbered context block. The crate provides:
//!
//! - [`IngestionPipeline`] - load → chunk → embed → upsert
//! - [`Deindexer`] - remove every point belonging to a source
//! - [`RetrievalOrchestrator`] - embed → search → rerank → generate
//! - [`QdrantStore`] and [`InMemoryStore`] - [`VectorStore`] backends
//! - [`CohereEmbeddingProvider`] and [`CohereReranker`] - Cohere-backed
//!   [`EmbeddingProvider`] and [`Reranker`]
//! - [`OpenAiChatModel`] - chat completions against an OpenAI-compatible
//!   endpoint with a rotating token pool
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragline_core::{
//!     CohereEmbeddingProvider, CohereReranker, IngestionPipeline, OpenAiChatModel,
//!     QdrantStore, RetrievalOrchestrator,
//! };
//!
//! let store = Arc::new(QdrantStore::new("http://localhost:6334", None)?);
//! let embedder = Arc::new(CohereEmbeddingProvider::from_env()?);
//!
//! let pipeline = IngestionPipeline::builder()
//!     .embedder(embedder.clone())
//!     .store(store.clone())
//!     .build()?;
//! pipeline.ingest(&source).await?;
//!
//! let orchestrator = RetrievalOrchestrator::builder()
//!     .embedder(embedder)
//!     .store(store)
//!     .reranker(Arc::new(CohereReranker::from_env()?))
//!     .chat(Arc::new(OpenAiChatModel::from_env()?))
//!     .build()?;
//! let result = orchestrator.answer("how do I configure retries?").await?;
//! ```

pub mod chunking;
pub mod cohere;
pub mod config;
pub mod crawl;
pub mod deindex;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod loader;
pub mod pipeline;
pub mod qdrant;
pub mod reranker;
pub mod retrieval;
pub mod vectorstore;

pub use chunking::TextSplitter;
pub use cohere::{CohereEmbeddingProvider, CohereReranker};
pub use config::{CrawlConfig, RagConfig, RagConfigBuilder, DEFAULT_COLLECTION};
pub use crawl::Crawler;
pub use deindex::Deindexer;
pub use document::{
    point_id, AnswerResult, AttributionMetadata, DeindexOutcome, IngestReport, PointMetadata,
    PointPayload, RetrievedDocument, Source, SourceAttribution, SourceType, VectorPoint,
};
pub use embedding::EmbeddingProvider;
pub use error::{RaglineError, Result};
pub use generation::{ChatModel, OpenAiChatModel, TokenPool};
pub use inmemory::InMemoryStore;
pub use loader::SourceLoader;
pub use pipeline::{IngestionPipeline, IngestionPipelineBuilder};
pub use qdrant::QdrantStore;
pub use reranker::{NoOpReranker, RankedIndex, Reranker};
pub use retrieval::{RetrievalOrchestrator, RetrievalOrchestratorBuilder};
pub use vectorstore::{PointCursor, ScrollPage, ScrolledPoint, VectorStore};
