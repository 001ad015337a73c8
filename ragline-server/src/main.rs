use std::sync::Arc;

use ragline_server::server::{run_server, AppState, ServerConfig};

use ragline_core::{
    CohereEmbeddingProvider, CohereReranker, Deindexer, IngestionPipeline, OpenAiChatModel,
    QdrantStore, RagConfig, RetrievalOrchestrator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let qdrant_url =
        std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6334".to_string());
    let qdrant_api_key = std::env::var("QDRANT_API_KEY").ok();
    let store = Arc::new(QdrantStore::new(&qdrant_url, qdrant_api_key)?);

    let embedder = Arc::new(CohereEmbeddingProvider::from_env()?);
    let reranker = Arc::new(CohereReranker::from_env()?);
    let chat = {
        let model = OpenAiChatModel::from_env()?;
        Arc::new(match std::env::var("GENERATION_BASE_URL") {
            Ok(base_url) => model.with_base_url(base_url),
            Err(_) => model,
        })
    };

    let config = RagConfig::default();

    let pipeline = Arc::new(
        IngestionPipeline::builder()
            .config(config.clone())
            .embedder(embedder.clone())
            .store(store.clone())
            .build()?,
    );
    pipeline.ensure_collection().await?;

    let deindexer = Arc::new(Deindexer::new(config.clone(), store.clone()));

    let orchestrator = Arc::new(
        RetrievalOrchestrator::builder()
            .config(config)
            .embedder(embedder)
            .store(store)
            .reranker(reranker)
            .chat(chat)
            .build()?,
    );

    let state = AppState {
        pipeline,
        deindexer,
        orchestrator,
    };

    let host = std::env::var("RAGLINE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("RAGLINE_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8088);

    run_server(ServerConfig { host, port }, state).await
}
