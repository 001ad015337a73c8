//! Error types for the `ragline-core` crate.

use thiserror::Error;

/// Errors that can occur across the ingestion, deindexing, and retrieval flows.
#[derive(Debug, Error)]
pub enum RaglineError {
    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A request carried missing or malformed fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The source produced no text content to index.
    #[error("Empty input: source produced no text content")]
    EmptyInput,

    /// A retrieval call was made with an empty query.
    #[error("Empty query: a non-empty query is required")]
    EmptyQuery,

    /// The source type is not one of `pdf`, `text`, or `url`.
    #[error("Unsupported source type: {0}")]
    UnsupportedSourceType(String),

    /// A remote document could not be fetched.
    #[error("Fetch error ({url}): {message}")]
    Fetch {
        /// The URL that failed.
        url: String,
        /// A description of the failure.
        message: String,
    },

    /// Fetched bytes could not be converted to text.
    #[error("Extraction error ({kind}): {message}")]
    Extract {
        /// The content kind being extracted (e.g. `pdf`).
        kind: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    Store {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A paged scan misbehaved (e.g. the cursor failed to advance).
    #[error("Scroll error: {0}")]
    Scroll(String),

    /// An ingestion wrote some chunks before the store failed.
    ///
    /// The caller can deindex the source to clear the partial remainder.
    #[error("Partial index for source '{source_id}': wrote {written} of {expected} chunks")]
    PartialIndex {
        /// The source whose ingestion was interrupted.
        source_id: String,
        /// Chunks committed before the failure.
        written: usize,
        /// Chunks the ingestion intended to commit.
        expected: usize,
    },

    /// An error occurred during result reranking.
    #[error("Rerank error ({provider}): {message}")]
    Rerank {
        /// The reranker that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during answer generation.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The chat model that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error in pipeline orchestration.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl RaglineError {
    /// A stable machine-readable category for this error.
    ///
    /// The HTTP layer uses this as the `error` field of its envelope; the
    /// human-readable `Display` output goes into `details`.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Validation(_) => "validation",
            Self::EmptyInput => "empty_input",
            Self::EmptyQuery => "empty_query",
            Self::UnsupportedSourceType(_) => "unsupported_source_type",
            Self::Fetch { .. } => "fetch",
            Self::Extract { .. } => "extract",
            Self::Embedding { .. } => "embedding",
            Self::Store { .. } | Self::Scroll(_) => "store",
            Self::PartialIndex { .. } => "partial_index",
            Self::Rerank { .. } => "rerank",
            Self::Generation { .. } => "generation",
            Self::Pipeline(_) => "pipeline",
        }
    }
}

/// A convenience result type for ragline operations.
pub type Result<T> = std::result::Result<T, RaglineError>;
