//! End-to-end flows over the in-memory store: ingest, deindex, and answer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use ragline_core::{
    ChatModel, Deindexer, DeindexOutcome, EmbeddingProvider, IngestionPipeline, InMemoryStore,
    NoOpReranker, PointCursor, RagConfig, RaglineError, RankedIndex, Reranker, Result,
    RetrievalOrchestrator, RetrievedDocument, ScrollPage, ScrolledPoint, Source, SourceType,
    VectorPoint, VectorStore,
};

// ── Scripted components ────────────────────────────────────────────

/// Deterministic embedder: a normalized vector derived from the text bytes.
struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; 8];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % 8] += f32::from(byte) / 255.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        8
    }
}

/// Embedder that returns pre-assigned vectors for known texts.
struct ScriptedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl ScriptedEmbedder {
    fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        Self { vectors: entries.iter().map(|(text, v)| (text.to_string(), v.clone())).collect() }
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors.get(text).cloned().ok_or_else(|| RaglineError::Embedding {
            provider: "Scripted".to_string(),
            message: format!("no scripted vector for {text:?}"),
        })
    }

    fn dimensions(&self) -> usize {
        8
    }
}

/// Embedder whose batch output never lines up with its input.
struct MismatchedEmbedder;

#[async_trait]
impl EmbeddingProvider for MismatchedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.5; 8])
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(vec![vec![0.5; 8]; texts.len() + 1])
    }

    fn dimensions(&self) -> usize {
        8
    }
}

/// Reranker that hands out a fixed score per candidate position.
struct ScriptedReranker {
    scores: Vec<f32>,
}

#[async_trait]
impl Reranker for ScriptedReranker {
    async fn rerank(
        &self,
        _query: &str,
        documents: &[&str],
        top_n: usize,
    ) -> Result<Vec<RankedIndex>> {
        assert_eq!(documents.len(), self.scores.len());
        assert_eq!(top_n, documents.len());
        Ok(self
            .scores
            .iter()
            .enumerate()
            .map(|(index, &relevance_score)| RankedIndex { index, relevance_score })
            .collect())
    }
}

/// Chat model that records the prompts it was given.
struct RecordingChat {
    prompts: Mutex<Vec<(String, String)>>,
    reply: Option<String>,
}

impl RecordingChat {
    fn replying(reply: &str) -> Self {
        Self { prompts: Mutex::new(Vec::new()), reply: Some(reply.to_string()) }
    }

    fn silent() -> Self {
        Self { prompts: Mutex::new(Vec::new()), reply: None }
    }

    fn last_user_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().map(|(_, user)| user.clone()).unwrap()
    }
}

#[async_trait]
impl ChatModel for RecordingChat {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Option<String>> {
        self.prompts.lock().unwrap().push((system_prompt.to_string(), user_prompt.to_string()));
        Ok(self.reply.clone())
    }
}

/// Store that starts rejecting upserts after a number of successful calls.
struct FlakyStore {
    inner: InMemoryStore,
    fail_after: usize,
    upserts: AtomicUsize,
}

impl FlakyStore {
    fn failing_after(fail_after: usize) -> Self {
        Self { inner: InMemoryStore::new(), fail_after, upserts: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl VectorStore for FlakyStore {
    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.inner.ensure_collection(name, dimensions).await
    }

    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<()> {
        if self.upserts.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
            return Err(RaglineError::Store {
                backend: "Flaky".to_string(),
                message: "upsert rejected".to_string(),
            });
        }
        self.inner.upsert(collection, points).await
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        self.inner.search(collection, embedding, top_k).await
    }

    async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        cursor: Option<&PointCursor>,
    ) -> Result<ScrollPage> {
        self.inner.scroll(collection, limit, cursor).await
    }

    async fn delete_by_ids(&self, collection: &str, ids: &[String]) -> Result<Option<u64>> {
        self.inner.delete_by_ids(collection, ids).await
    }
}

// ── Fixtures ───────────────────────────────────────────────────────

const P0: &str =
    "The ragline service indexes knowledge sources into a single shared collection for retrieval.";
const P1: &str =
    "Embedding batches preserve input order so chunk vectors line up with their original texts.";
const P2: &str =
    "Scanning the collection uses cursor pages and stops only when the cursor disappears.";
const P3: &str =
    "Reranked citations are numbered so the generated answer can point back at its sources.";
const P4: &str =
    "Deindexing removes every point that belongs to one source and nothing else at all.";

const QUERY: &str = "which paragraph wins";

/// Paragraphs long enough that the splitter keeps each one as its own chunk.
fn five_paragraphs() -> String {
    [P0, P1, P2, P3, P4].join("\n\n")
}

fn axis(x: f32, y: f32) -> Vec<f32> {
    vec![x, y, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
}

/// Vectors whose similarity to the query vector descends chunk by chunk, so
/// search returns the paragraphs in their original order.
fn scripted_embedder() -> ScriptedEmbedder {
    ScriptedEmbedder::new(&[
        (QUERY, axis(1.0, 0.0)),
        (P0, axis(1.0, 0.0)),
        (P1, axis(0.8, 0.6)),
        (P2, axis(0.6, 0.8)),
        (P3, axis(0.4, 0.916_515_1)),
        (P4, axis(0.2, 0.979_795_9)),
    ])
}

fn text_source(id: &str, name: &str, content: &str) -> Source {
    Source {
        id: id.to_string(),
        source_type: SourceType::Text,
        content: content.to_string(),
        name: name.to_string(),
        created_at: Utc::now(),
        is_indexed: false,
    }
}

fn paragraph_config() -> RagConfig {
    RagConfig::builder().chunk_size(120).chunk_overlap(20).build().unwrap()
}

fn pipeline_with(
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
) -> IngestionPipeline {
    IngestionPipeline::builder().config(config).embedder(embedder).store(store).build().unwrap()
}

async fn scroll_all(store: &dyn VectorStore, collection: &str) -> Vec<ScrolledPoint> {
    let mut out = Vec::new();
    let mut cursor = None;
    loop {
        let page = store.scroll(collection, 100, cursor.as_ref()).await.unwrap();
        out.extend(page.points);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    out
}

// ── Ingestion ──────────────────────────────────────────────────────

#[tokio::test]
async fn ingest_reports_chunks_and_stores_points() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = pipeline_with(paragraph_config(), Arc::new(HashEmbedder), store.clone());

    let report = pipeline.ingest(&text_source("src-a", "Alpha notes", P0)).await.unwrap();
    assert_eq!(report.source_id, "src-a");
    assert_eq!(report.chunk_count, 1);

    let points = scroll_all(store.as_ref(), "knowledge-sources").await;
    assert_eq!(points.len(), 1);

    let payload = points[0].payload.clone().unwrap();
    assert_eq!(payload.content, P0);
    assert_eq!(payload.metadata.source_id, "src-a");
    assert_eq!(payload.metadata.source_name, "Alpha notes");
    assert_eq!(payload.metadata.source_type, SourceType::Text);
    assert_eq!(payload.metadata.chunk_index, 0);
    assert_eq!(payload.metadata.chunk_count, 1);
}

#[tokio::test]
async fn reingesting_a_source_replaces_points_instead_of_duplicating() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = pipeline_with(paragraph_config(), Arc::new(HashEmbedder), store.clone());

    let source = text_source("src-a", "Alpha notes", &five_paragraphs());
    let first = pipeline.ingest(&source).await.unwrap();
    let second = pipeline.ingest(&source).await.unwrap();
    assert_eq!(first.chunk_count, 5);
    assert_eq!(second.chunk_count, 5);

    let points = scroll_all(store.as_ref(), "knowledge-sources").await;
    assert_eq!(points.len(), 5);
}

#[tokio::test]
async fn whitespace_source_indexes_zero_chunks() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = pipeline_with(paragraph_config(), Arc::new(HashEmbedder), store.clone());

    let report = pipeline.ingest(&text_source("src-a", "Empty", "   \n\t  ")).await.unwrap();
    assert_eq!(report.chunk_count, 0);

    // The collection exists but holds nothing.
    let points = scroll_all(store.as_ref(), "knowledge-sources").await;
    assert!(points.is_empty());
}

#[tokio::test]
async fn embedding_count_mismatch_is_a_pipeline_error() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = pipeline_with(paragraph_config(), Arc::new(MismatchedEmbedder), store);

    let err = pipeline.ingest(&text_source("src-a", "Alpha notes", P0)).await.unwrap_err();
    assert_eq!(err.category(), "pipeline");
}

#[tokio::test]
async fn upsert_failure_after_partial_write_reports_progress() {
    let config = RagConfig::builder()
        .chunk_size(120)
        .chunk_overlap(20)
        .upsert_batch_size(2)
        .build()
        .unwrap();

    // First batch of two points lands, the second batch is rejected.
    let store = Arc::new(FlakyStore::failing_after(1));
    let pipeline = pipeline_with(config.clone(), Arc::new(HashEmbedder), store);
    let err =
        pipeline.ingest(&text_source("src-a", "Alpha notes", &five_paragraphs())).await.unwrap_err();
    match err {
        RaglineError::PartialIndex { source_id, written, expected } => {
            assert_eq!(source_id, "src-a");
            assert_eq!(written, 2);
            assert_eq!(expected, 5);
        }
        other => panic!("expected PartialIndex, got {other:?}"),
    }

    // A failure on the very first batch surfaces as the store's own error.
    let store = Arc::new(FlakyStore::failing_after(0));
    let pipeline = pipeline_with(config, Arc::new(HashEmbedder), store);
    let err =
        pipeline.ingest(&text_source("src-a", "Alpha notes", &five_paragraphs())).await.unwrap_err();
    assert_eq!(err.category(), "store");
}

// ── Deindexing ─────────────────────────────────────────────────────

#[tokio::test]
async fn deindex_removes_only_the_target_source() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = pipeline_with(paragraph_config(), Arc::new(HashEmbedder), store.clone());
    pipeline.ingest(&text_source("src-a", "Alpha notes", &five_paragraphs())).await.unwrap();
    pipeline.ingest(&text_source("src-b", "Beta notes", P1)).await.unwrap();

    let deindexer = Deindexer::new(paragraph_config(), store.clone());
    let outcome = deindexer.deindex("src-a").await.unwrap();
    match outcome {
        DeindexOutcome::Removed { deleted_count, point_ids, operation_id } => {
            assert_eq!(deleted_count, 5);
            assert_eq!(point_ids.len(), 5);
            assert_eq!(operation_id, None);
        }
        other => panic!("expected Removed, got {other:?}"),
    }

    let remaining = scroll_all(store.as_ref(), "knowledge-sources").await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].payload.clone().unwrap().metadata.source_id, "src-b");
}

#[tokio::test]
async fn deindexing_an_unknown_source_lists_what_is_indexed() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = pipeline_with(paragraph_config(), Arc::new(HashEmbedder), store.clone());
    pipeline.ingest(&text_source("src-b", "Beta notes", P1)).await.unwrap();
    pipeline.ingest(&text_source("src-a", "Alpha notes", P0)).await.unwrap();

    let deindexer = Deindexer::new(paragraph_config(), store);
    let outcome = deindexer.deindex("ghost").await.unwrap();
    match outcome {
        DeindexOutcome::NoMatch { available_source_ids } => {
            assert_eq!(available_source_ids, ["src-a", "src-b"]);
        }
        other => panic!("expected NoMatch, got {other:?}"),
    }
}

#[tokio::test]
async fn deindexing_a_blank_source_id_is_rejected() {
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryStore::new());
    let deindexer = Deindexer::new(RagConfig::default(), store);

    let err = deindexer.deindex("   ").await.unwrap_err();
    assert_eq!(err.category(), "validation");
}

// ── Retrieval ──────────────────────────────────────────────────────

#[tokio::test]
async fn answers_cite_sources_in_rerank_order() {
    let store = Arc::new(InMemoryStore::new());
    let embedder = Arc::new(scripted_embedder());
    let pipeline = pipeline_with(paragraph_config(), embedder.clone(), store.clone());
    pipeline.ingest(&text_source("src-a", "Alpha notes", &five_paragraphs())).await.unwrap();

    let chat = Arc::new(RecordingChat::replying("Grounded answer."));
    let orchestrator = RetrievalOrchestrator::builder()
        .config(paragraph_config())
        .embedder(embedder)
        .store(store)
        .reranker(Arc::new(ScriptedReranker { scores: vec![0.9, 0.2, 0.7, 0.95, 0.4] }))
        .chat(chat.clone())
        .build()
        .unwrap();

    let result = orchestrator.answer(QUERY).await.unwrap();
    assert_eq!(result.answer, "Grounded answer.");
    assert_eq!(result.query, QUERY);
    assert_eq!(result.total_sources, 5);
    assert_eq!(result.sources.len(), 5);

    // Search returns the paragraphs in original order, so the scripted
    // scores land on chunks 0..5 and sorting yields this citation order.
    let cited_chunks: Vec<usize> =
        result.sources.iter().map(|s| s.metadata.chunk_index).collect();
    assert_eq!(cited_chunks, [3, 0, 2, 4, 1]);

    let scores: Vec<f32> = result.sources.iter().map(|s| s.relevance_score).collect();
    assert_eq!(scores, [0.95, 0.9, 0.7, 0.4, 0.2]);

    for (i, attribution) in result.sources.iter().enumerate() {
        assert_eq!(attribution.index, i + 1);
        assert!(attribution.preview.ends_with("..."));
        assert_eq!(attribution.metadata.source_name, "Alpha notes");
        assert_eq!(attribution.metadata.source_type, "text");
    }
    assert_eq!(result.sources[0].preview, format!("{P3}..."));

    // The prompt numbers context blocks in the same citation order.
    let prompt = chat.last_user_prompt();
    assert!(prompt.starts_with(&format!("Context: [1] {P3}")));
    assert!(prompt.contains(&format!("[2] {P0}")));
    assert!(prompt.contains(&format!("[5] {P1}")));
    assert!(prompt.contains(&format!("Question: {QUERY}")));
}

#[tokio::test]
async fn noop_reranker_preserves_similarity_order() {
    let store = Arc::new(InMemoryStore::new());
    let embedder = Arc::new(scripted_embedder());
    let pipeline = pipeline_with(paragraph_config(), embedder.clone(), store.clone());
    pipeline.ingest(&text_source("src-a", "Alpha notes", &five_paragraphs())).await.unwrap();

    let orchestrator = RetrievalOrchestrator::builder()
        .config(paragraph_config())
        .embedder(embedder)
        .store(store)
        .reranker(Arc::new(NoOpReranker))
        .chat(Arc::new(RecordingChat::replying("ok")))
        .build()
        .unwrap();

    let result = orchestrator.answer(QUERY).await.unwrap();
    let cited_chunks: Vec<usize> =
        result.sources.iter().map(|s| s.metadata.chunk_index).collect();
    assert_eq!(cited_chunks, [0, 1, 2, 3, 4]);
    assert!(result.sources.iter().all(|s| s.relevance_score == 1.0));
}

#[tokio::test]
async fn blank_queries_are_rejected() {
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryStore::new());
    let orchestrator = RetrievalOrchestrator::builder()
        .embedder(Arc::new(HashEmbedder))
        .store(store)
        .reranker(Arc::new(NoOpReranker))
        .chat(Arc::new(RecordingChat::silent()))
        .build()
        .unwrap();

    let err = orchestrator.answer("   ").await.unwrap_err();
    assert_eq!(err.category(), "empty_query");
}

#[tokio::test]
async fn empty_collection_returns_canned_answer() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = pipeline_with(RagConfig::default(), Arc::new(HashEmbedder), store.clone());
    pipeline.ensure_collection().await.unwrap();

    let orchestrator = RetrievalOrchestrator::builder()
        .embedder(Arc::new(HashEmbedder))
        .store(store)
        .reranker(Arc::new(NoOpReranker))
        .chat(Arc::new(RecordingChat::silent()))
        .build()
        .unwrap();

    let result = orchestrator.answer("anything at all").await.unwrap();
    assert_eq!(result.answer, "I couldn't find any relevant information to answer your question.");
    assert!(result.sources.is_empty());
    assert_eq!(result.total_sources, 0);
}

#[tokio::test]
async fn silent_chat_model_falls_back_to_apology() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = pipeline_with(paragraph_config(), Arc::new(HashEmbedder), store.clone());
    pipeline.ingest(&text_source("src-a", "Alpha notes", P0)).await.unwrap();

    let orchestrator = RetrievalOrchestrator::builder()
        .config(paragraph_config())
        .embedder(Arc::new(HashEmbedder))
        .store(store)
        .reranker(Arc::new(NoOpReranker))
        .chat(Arc::new(RecordingChat::silent()))
        .build()
        .unwrap();

    let result = orchestrator.answer(P0).await.unwrap();
    assert_eq!(result.answer, "Sorry, I couldn't generate a response.");
    assert_eq!(result.total_sources, 1);
}
