//! Retrieval orchestrator: embed → search → rerank → generate.
//!
//! The [`RetrievalOrchestrator`] answers a question from the indexed
//! collection. Retrieved chunks are reranked, numbered, and handed to the
//! chat model as a `[i]`-cited context block; the response pairs the
//! generated answer with an attribution entry per citation.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::document::{AnswerResult, AttributionMetadata, PointMetadata, SourceAttribution};
use crate::embedding::EmbeddingProvider;
use crate::error::{RaglineError, Result};
use crate::generation::ChatModel;
use crate::reranker::{RankedIndex, Reranker};
use crate::vectorstore::VectorStore;

/// Returned when the collection has nothing relevant to the query.
const NO_CONTEXT_ANSWER: &str =
    "I couldn't find any relevant information to answer your question.";

/// Returned when the chat model produces no usable content.
const FALLBACK_ANSWER: &str = "Sorry, I couldn't generate a response.";

/// How many characters of each cited chunk are echoed back as a preview.
const PREVIEW_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Answer the user's question based on the provided context.

Guidelines:
- Use only the information from the provided context
- If the context doesn't contain enough information, say so
- Be specific and cite relevant parts when possible
- Keep your answer clear and concise";

fn build_user_prompt(context: &str, query: &str) -> String {
    format!(
        "Context: {context}\n\nQuestion: {query}\n\nPlease provide a comprehensive answer based on the context above."
    )
}

/// Order citations by descending relevance, breaking ties by the candidate's
/// original search rank.
fn sort_by_relevance(ranked: &mut [RankedIndex]) {
    ranked.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
}

fn preview(content: &str) -> String {
    let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}

fn attribution(metadata: Option<&PointMetadata>) -> AttributionMetadata {
    match metadata {
        Some(m) => AttributionMetadata {
            source_name: m.source_name.clone(),
            source_type: m.source_type.as_str().to_string(),
            chunk_index: m.chunk_index,
        },
        None => AttributionMetadata {
            source_name: "Unknown".to_string(),
            source_type: "unknown".to_string(),
            chunk_index: 0,
        },
    }
}

/// The query half of the pipeline.
///
/// Construct one via [`RetrievalOrchestrator::builder()`].
///
/// # Example
///
/// ```rust,ignore
/// use ragline_core::{RetrievalOrchestrator, NoOpReranker};
///
/// let orchestrator = RetrievalOrchestrator::builder()
///     .embedder(embedder)
///     .store(store)
///     .reranker(Arc::new(NoOpReranker))
///     .chat(chat)
///     .build()?;
///
/// let result = orchestrator.answer("how do I configure retries?").await?;
/// ```
pub struct RetrievalOrchestrator {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    reranker: Arc<dyn Reranker>,
    chat: Arc<dyn ChatModel>,
}

impl RetrievalOrchestrator {
    /// Create a new [`RetrievalOrchestratorBuilder`].
    pub fn builder() -> RetrievalOrchestratorBuilder {
        RetrievalOrchestratorBuilder::default()
    }

    /// Answer a question from the indexed collection.
    ///
    /// # Errors
    ///
    /// Returns [`RaglineError::EmptyQuery`] for a blank query, and the
    /// underlying failure when embedding, search, reranking, or generation
    /// fails. An empty collection is not an error: the result carries a
    /// canned answer and no sources.
    pub async fn answer(&self, query: &str) -> Result<AnswerResult> {
        if query.trim().is_empty() {
            return Err(RaglineError::EmptyQuery);
        }

        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during retrieval");
            e
        })?;

        let hits = self
            .store
            .search(&self.config.collection, &query_embedding, self.config.search_k)
            .await
            .map_err(|e| {
                error!(collection = %self.config.collection, error = %e, "search failed");
                e
            })?;

        if hits.is_empty() {
            info!("no candidates retrieved for query");
            return Ok(AnswerResult {
                answer: NO_CONTEXT_ANSWER.to_string(),
                query: query.to_string(),
                sources: Vec::new(),
                total_sources: 0,
            });
        }

        debug!(candidates = hits.len(), "retrieved candidates");

        let contents: Vec<&str> = hits.iter().map(|h| h.content.as_str()).collect();
        let top_n = self.config.rerank_top_n.min(hits.len());
        let mut ranked = self.reranker.rerank(query, &contents, top_n).await.map_err(|e| {
            error!(error = %e, "reranking failed");
            e
        })?;

        if ranked.iter().any(|r| r.index >= hits.len()) {
            return Err(RaglineError::Pipeline(
                "reranker returned an index out of range".to_string(),
            ));
        }

        sort_by_relevance(&mut ranked);

        let context = ranked
            .iter()
            .enumerate()
            .map(|(i, r)| format!("[{}] {}", i + 1, hits[r.index].content))
            .collect::<Vec<_>>()
            .join("\n\n");
        let user_prompt = build_user_prompt(&context, query);

        let answer = self
            .chat
            .complete(SYSTEM_PROMPT, &user_prompt)
            .await
            .map_err(|e| {
                error!(error = %e, "generation failed");
                e
            })?
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string());

        let sources: Vec<SourceAttribution> = ranked
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let hit = &hits[r.index];
                SourceAttribution {
                    index: i + 1,
                    relevance_score: r.relevance_score,
                    preview: preview(&hit.content),
                    metadata: attribution(hit.metadata.as_ref()),
                }
            })
            .collect();

        let total_sources = sources.len();
        info!(total_sources, "answered query");

        Ok(AnswerResult { answer, query: query.to_string(), sources, total_sources })
    }
}

/// Builder for constructing a [`RetrievalOrchestrator`].
///
/// All components are required; `config` falls back to its default.
#[derive(Default)]
pub struct RetrievalOrchestratorBuilder {
    config: Option<RagConfig>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
    reranker: Option<Arc<dyn Reranker>>,
    chat: Option<Arc<dyn ChatModel>>,
}

impl RetrievalOrchestratorBuilder {
    /// Set the orchestrator configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider used for queries.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the vector store backend.
    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the reranker applied to search candidates.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Set the chat model that generates the final answer.
    pub fn chat(mut self, chat: Arc<dyn ChatModel>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Build the [`RetrievalOrchestrator`], validating that all components
    /// are set.
    pub fn build(self) -> Result<RetrievalOrchestrator> {
        let config = self.config.unwrap_or_default();
        let embedder =
            self.embedder.ok_or_else(|| RaglineError::Config("embedder is required".to_string()))?;
        let store =
            self.store.ok_or_else(|| RaglineError::Config("store is required".to_string()))?;
        let reranker =
            self.reranker.ok_or_else(|| RaglineError::Config("reranker is required".to_string()))?;
        let chat = self.chat.ok_or_else(|| RaglineError::Config("chat is required".to_string()))?;

        Ok(RetrievalOrchestrator { config, embedder, store, reranker, chat })
    }
}
