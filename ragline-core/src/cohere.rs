//! Cohere providers: embeddings through the OpenAI-compatible endpoint,
//! relevance scoring through the native v2 rerank endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RaglineError, Result};
use crate::reranker::{RankedIndex, Reranker};

/// Cohere's OpenAI-compatible embeddings endpoint.
const COHERE_EMBEDDINGS_URL: &str = "https://api.cohere.ai/compatibility/v1/embeddings";

/// Cohere's native rerank endpoint.
const COHERE_RERANK_URL: &str = "https://api.cohere.com/v2/rerank";

/// The default embedding model.
const DEFAULT_EMBED_MODEL: &str = "embed-v4.0";

/// The default rerank model.
const DEFAULT_RERANK_MODEL: &str = "rerank-v3.5";

/// The default dimensionality of `embed-v4.0` embeddings.
const DEFAULT_DIMENSIONS: usize = 1536;

/// An [`EmbeddingProvider`] backed by Cohere's OpenAI-compatible API.
///
/// # Configuration
///
/// - `model` – defaults to `embed-v4.0`.
/// - `api_key` – from the constructor or the `COHERE_API_KEY` environment variable.
///
/// # Example
///
/// ```rust,ignore
/// use ragline_core::CohereEmbeddingProvider;
///
/// let provider = CohereEmbeddingProvider::from_env()?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct CohereEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
    url: String,
}

impl CohereEmbeddingProvider {
    /// Create a new provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RaglineError::Embedding {
                provider: "Cohere".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_EMBED_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            url: COHERE_EMBEDDINGS_URL.into(),
        })
    }

    /// Create a new provider using the `COHERE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("COHERE_API_KEY").map_err(|_| RaglineError::Embedding {
            provider: "Cohere".into(),
            message: "COHERE_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the embedding model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the dimensionality reported for this provider's embeddings.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }

    /// Override the embeddings endpoint URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

// ── Embeddings request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    encoding_format: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct CompatErrorResponse {
    error: CompatErrorDetail,
}

#[derive(Deserialize)]
struct CompatErrorDetail {
    message: String,
}

#[async_trait]
impl EmbeddingProvider for CohereEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "Cohere", text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RaglineError::Embedding {
            provider: "Cohere".into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "Cohere",
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            encoding_format: "float",
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Cohere", error = %e, "embedding request failed");
                RaglineError::Embedding {
                    provider: "Cohere".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<CompatErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = "Cohere", %status, "embedding API error");
            return Err(RaglineError::Embedding {
                provider: "Cohere".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "Cohere", error = %e, "failed to parse embedding response");
            RaglineError::Embedding {
                provider: "Cohere".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        if embedding_response.data.len() != texts.len() {
            return Err(RaglineError::Embedding {
                provider: "Cohere".into(),
                message: format!(
                    "API returned {} embeddings for {} inputs",
                    embedding_response.data.len(),
                    texts.len()
                ),
            });
        }

        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A [`Reranker`] backed by Cohere's v2 rerank API.
///
/// Scores each candidate document against the query with `rerank-v3.5` and
/// returns the most relevant candidates with their original indices.
pub struct CohereReranker {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl CohereReranker {
    /// Create a new reranker with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RaglineError::Rerank {
                provider: "Cohere".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_RERANK_MODEL.into(),
            url: COHERE_RERANK_URL.into(),
        })
    }

    /// Create a new reranker using the `COHERE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("COHERE_API_KEY").map_err(|_| RaglineError::Rerank {
            provider: "Cohere".into(),
            message: "COHERE_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the rerank model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the rerank endpoint URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

// ── Rerank request/response types ──────────────────────────────────

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

#[derive(Deserialize)]
struct RerankErrorResponse {
    message: String,
}

#[async_trait]
impl Reranker for CohereReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[&str],
        top_n: usize,
    ) -> Result<Vec<RankedIndex>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "Cohere",
            candidates = documents.len(),
            top_n,
            model = %self.model,
            "reranking candidates"
        );

        let request_body = RerankRequest {
            model: &self.model,
            query,
            documents: documents.to_vec(),
            top_n: top_n.min(documents.len()),
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Cohere", error = %e, "rerank request failed");
                RaglineError::Rerank {
                    provider: "Cohere".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<RerankErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);

            error!(provider = "Cohere", %status, "rerank API error");
            return Err(RaglineError::Rerank {
                provider: "Cohere".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let rerank_response: RerankResponse = response.json().await.map_err(|e| {
            error!(provider = "Cohere", error = %e, "failed to parse rerank response");
            RaglineError::Rerank {
                provider: "Cohere".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(rerank_response
            .results
            .into_iter()
            .map(|r| RankedIndex { index: r.index, relevance_score: r.relevance_score })
            .collect())
    }
}
