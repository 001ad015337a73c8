//! Removal of a source's points from the collection.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::RagConfig;
use crate::document::DeindexOutcome;
use crate::error::{RaglineError, Result};
use crate::vectorstore::VectorStore;

/// Finds and deletes every point belonging to one source.
///
/// The collection is scanned page by page and points are matched on the
/// `sourceId` in their payload, so points written before the current id
/// scheme are still found and removed.
pub struct Deindexer {
    config: RagConfig,
    store: Arc<dyn VectorStore>,
}

impl Deindexer {
    /// Create a new deindexer over the configured collection.
    pub fn new(config: RagConfig, store: Arc<dyn VectorStore>) -> Self {
        Self { config, store }
    }

    /// Remove every point belonging to `source_id` from the collection.
    ///
    /// Returns [`DeindexOutcome::NoMatch`] with the distinct source ids that
    /// are present when nothing belongs to `source_id`. Points with
    /// unreadable payloads are skipped with a warning.
    pub async fn deindex(&self, source_id: &str) -> Result<DeindexOutcome> {
        if source_id.trim().is_empty() {
            return Err(RaglineError::Validation("sourceId is required".to_string()));
        }

        let mut matched: Vec<String> = Vec::new();
        let mut seen_sources: BTreeSet<String> = BTreeSet::new();
        let mut cursor = None;

        loop {
            let page = self
                .store
                .scroll(&self.config.collection, self.config.scroll_page_size, cursor.as_ref())
                .await?;

            debug!(
                source_id,
                page_points = page.points.len(),
                has_more = page.next_cursor.is_some(),
                "scanned collection page"
            );

            for point in page.points {
                let Some(payload) = point.payload else {
                    warn!(point.id = %point.id, "skipping point with unreadable payload");
                    continue;
                };
                let owner = payload.metadata.source_id;
                if owner == source_id {
                    matched.push(point.id);
                }
                seen_sources.insert(owner);
            }

            match page.next_cursor {
                Some(next) => {
                    if cursor.as_ref() == Some(&next) {
                        return Err(RaglineError::Scroll("scan cursor did not advance".to_string()));
                    }
                    cursor = Some(next);
                }
                None => break,
            }
        }

        if matched.is_empty() {
            debug!(source_id, known_sources = seen_sources.len(), "no points matched source");
            return Ok(DeindexOutcome::NoMatch {
                available_source_ids: seen_sources.into_iter().collect(),
            });
        }

        let operation_id = self.store.delete_by_ids(&self.config.collection, &matched).await?;
        let deleted_count = matched.len();

        info!(source_id, deleted_count, "deindexed source");

        Ok(DeindexOutcome::Removed { deleted_count, point_ids: matched, operation_id })
    }
}
