//! Qdrant vector store backend.
//!
//! Provides [`QdrantStore`] which implements [`VectorStore`] using the
//! [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragline_core::qdrant::QdrantStore;
//!
//! let store = QdrantStore::new("http://localhost:6334", None)?;
//! store.ensure_collection("knowledge-sources", 1536).await?;
//! store.upsert("knowledge-sources", &points).await?;
//! let hits = store.search("knowledge-sources", &query_embedding, 5).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId, PointStruct, PointsIdsList,
    ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::debug;

use crate::document::{PointMetadata, PointPayload, RetrievedDocument, VectorPoint};
use crate::error::{RaglineError, Result};
use crate::vectorstore::{PointCursor, ScrollPage, ScrolledPoint, VectorStore};

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Wraps a [`qdrant_client::Qdrant`] client and maps collections to Qdrant
/// collections with cosine distance. Point payloads are stored as Qdrant
/// payload objects with the same JSON shape the rest of the pipeline uses.
pub struct QdrantStore {
    client: Qdrant,
}

impl QdrantStore {
    /// Create a new Qdrant store connecting to the given URL, optionally
    /// authenticating with an API key.
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build().map_err(Self::map_err)?;
        Ok(Self { client })
    }

    /// Create a new Qdrant store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RaglineError {
        RaglineError::Store { backend: "qdrant".to_string(), message: e.to_string() }
    }

    /// Extract a string from a Qdrant payload value.
    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Render a Qdrant point id as a string.
    fn point_id_to_string(id: &PointId) -> Option<String> {
        match &id.point_id_options {
            Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
            Some(PointIdOptions::Num(n)) => Some(n.to_string()),
            None => None,
        }
    }

    /// Parse a string back into a Qdrant point id. Numeric strings become
    /// numeric ids so cursors and deletes round-trip exactly.
    fn parse_point_id(id: &str) -> PointId {
        match id.parse::<u64>() {
            Ok(n) => n.into(),
            Err(_) => id.to_string().into(),
        }
    }
}

/// Convert a Qdrant payload value into a `serde_json` value.
fn value_to_json(value: &QdrantValue) -> serde_json::Value {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(*b),
        Some(Kind::IntegerValue(i)) => serde_json::Value::Number((*i).into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(*d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s.clone()),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.iter().map(value_to_json).collect())
        }
        Some(Kind::StructValue(obj)) => serde_json::Value::Object(
            obj.fields.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect(),
        ),
    }
}

/// Deserialize a full Qdrant payload map into a [`PointPayload`], returning
/// `None` when the payload does not have the expected shape.
fn payload_to_json(payload: &HashMap<String, QdrantValue>) -> Option<PointPayload> {
    let object: serde_json::Map<String, serde_json::Value> =
        payload.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect();
    serde_json::from_value(serde_json::Value::Object(object)).ok()
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let collections = self.client.list_collections().await.map_err(Self::map_err)?;
        let exists = collections.collections.iter().any(|c| c.name == name);
        if exists {
            debug!(collection = name, "qdrant collection already exists, skipping creation");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let point_structs: Vec<PointStruct> = points
            .iter()
            .map(|point| {
                let payload_value =
                    serde_json::to_value(&point.payload).map_err(|e| RaglineError::Store {
                        backend: "qdrant".to_string(),
                        message: format!("failed to serialize payload: {e}"),
                    })?;
                let payload = Payload::try_from(payload_value).map_err(Self::map_err)?;
                Ok(PointStruct::new(point.id.clone(), point.vector.clone(), payload))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, point_structs).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = points.len(), "upserted points to qdrant");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, embedding.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        let results = response
            .result
            .into_iter()
            .map(|scored| {
                let id = scored
                    .id
                    .as_ref()
                    .and_then(Self::point_id_to_string)
                    .unwrap_or_default();

                let content = scored
                    .payload
                    .get("content")
                    .and_then(Self::extract_string)
                    .unwrap_or_default();

                let metadata: Option<PointMetadata> = scored
                    .payload
                    .get("metadata")
                    .map(value_to_json)
                    .and_then(|v| serde_json::from_value(v).ok());

                RetrievedDocument { id, content, metadata, score: scored.score }
            })
            .collect();

        Ok(results)
    }

    async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        cursor: Option<&PointCursor>,
    ) -> Result<ScrollPage> {
        let mut builder = ScrollPointsBuilder::new(collection)
            .limit(limit as u32)
            .with_payload(true)
            .with_vectors(false);
        if let Some(cursor) = cursor {
            builder = builder.offset(Self::parse_point_id(cursor.as_str()));
        }

        let response = self.client.scroll(builder).await.map_err(Self::map_err)?;

        let points = response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point.id.as_ref().and_then(Self::point_id_to_string)?;
                let payload = payload_to_json(&point.payload);
                Some(ScrolledPoint { id, payload })
            })
            .collect();

        let next_cursor = response
            .next_page_offset
            .as_ref()
            .and_then(Self::point_id_to_string)
            .map(PointCursor::new);

        Ok(ScrollPage { points, next_cursor })
    }

    async fn delete_by_ids(&self, collection: &str, ids: &[String]) -> Result<Option<u64>> {
        if ids.is_empty() {
            return Ok(None);
        }

        let point_ids: Vec<PointId> = ids.iter().map(|id| Self::parse_point_id(id)).collect();

        let response = self
            .client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(PointsIdsList { ids: point_ids })
                    .wait(true),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = ids.len(), "deleted points from qdrant");
        Ok(response.result.and_then(|r| r.operation_id))
    }
}
