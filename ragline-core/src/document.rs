//! Data types for sources, vector points, and retrieval results.
//!
//! Field names matter here: the payload layout (`content` plus a camelCase
//! `metadata` object) is the wire contract between ingestion and retrieval,
//! and any point already in the collection was written with these names.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RaglineError;

/// A knowledge source submitted for indexing.
///
/// For `text` sources `content` holds the text itself; for `pdf` and `url`
/// sources it holds the location to fetch from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Caller-assigned source identifier.
    pub id: String,
    /// What `content` is and how to acquire text from it.
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// Raw text, or a URL to a PDF or web page.
    pub content: String,
    /// Human-readable source name, echoed into point metadata.
    pub name: String,
    /// When the source was registered by the caller.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Whether the caller believes the source is currently indexed.
    #[serde(default)]
    pub is_indexed: bool,
}

/// The kind of content a [`Source`] carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// A URL pointing at a PDF document.
    Pdf,
    /// Inline text content.
    Text,
    /// A web page to crawl.
    Url,
}

impl SourceType {
    /// The lowercase wire spelling of this source type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "text",
            Self::Url => "url",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = RaglineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(Self::Pdf),
            "text" => Ok(Self::Text),
            "url" => Ok(Self::Url),
            other => Err(RaglineError::UnsupportedSourceType(other.to_string())),
        }
    }
}

/// Per-chunk metadata stored alongside the chunk text in the vector store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PointMetadata {
    /// The source this chunk belongs to.
    pub source_id: String,
    /// The source's type.
    pub source_type: SourceType,
    /// The source's human-readable name.
    pub source_name: String,
    /// Zero-based position of this chunk within the source.
    pub chunk_index: usize,
    /// Total number of chunks the source produced.
    pub chunk_count: usize,
    /// Timestamp of the ingestion call that wrote this chunk.
    pub created_at: DateTime<Utc>,
}

/// The payload stored on each vector point: chunk text plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointPayload {
    /// The chunk text.
    pub content: String,
    /// Provenance and position of the chunk.
    pub metadata: PointMetadata,
}

/// A vector point ready for upserting.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    /// Point identifier, as produced by [`point_id`].
    pub id: String,
    /// The chunk's embedding.
    pub vector: Vec<f32>,
    /// The chunk text and metadata.
    pub payload: PointPayload,
}

/// Deterministic point id for a chunk: UUID v5 of `"{source_id}:{chunk_index}"`.
///
/// Re-ingesting a source overwrites its points in place instead of
/// accumulating duplicates, and the id is always a valid store point id.
pub fn point_id(source_id: &str, chunk_index: usize) -> String {
    let name = format!("{source_id}:{chunk_index}");
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
}

/// A chunk returned from similarity search.
#[derive(Debug, Clone)]
pub struct RetrievedDocument {
    /// The point id.
    pub id: String,
    /// The chunk text.
    pub content: String,
    /// Chunk metadata, when the stored payload was readable.
    pub metadata: Option<PointMetadata>,
    /// Similarity score (higher is more relevant).
    pub score: f32,
}

/// How many chunks an ingestion call committed for a source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// The ingested source.
    pub source_id: String,
    /// Number of chunks written. Zero means the source had no indexable text.
    pub chunk_count: usize,
}

/// The result of removing a source from the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeindexOutcome {
    /// Points belonging to the source were found and deleted.
    Removed {
        /// How many points were deleted.
        deleted_count: usize,
        /// The ids of the deleted points.
        point_ids: Vec<String>,
        /// Backend operation id for the delete, when the backend reports one.
        operation_id: Option<u64>,
    },
    /// No point in the collection belonged to the source.
    NoMatch {
        /// Sorted, distinct source ids that are present in the collection.
        available_source_ids: Vec<String>,
    },
}

/// Attribution metadata echoed back with each cited source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttributionMetadata {
    /// The source's human-readable name, or `Unknown`.
    pub source_name: String,
    /// The source's type, or `unknown`.
    pub source_type: String,
    /// Position of the cited chunk within its source.
    pub chunk_index: usize,
}

/// One cited source in an [`AnswerResult`], aligned with the `[i]` markers
/// in the generated answer's context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceAttribution {
    /// One-based citation number.
    pub index: usize,
    /// Relevance score assigned by the reranker.
    pub relevance_score: f32,
    /// The first 200 characters of the chunk, with a trailing ellipsis.
    pub preview: String,
    /// Provenance of the cited chunk.
    pub metadata: AttributionMetadata,
}

/// A grounded answer with its supporting citations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    /// The generated answer text.
    pub answer: String,
    /// The original query, echoed back.
    pub query: String,
    /// Cited chunks in citation order.
    pub sources: Vec<SourceAttribution>,
    /// Number of cited chunks.
    pub total_sources: usize,
}
