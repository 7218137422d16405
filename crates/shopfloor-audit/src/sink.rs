//! Audit entry persistence.

use async_trait::async_trait;
use serde_json::json;
use shopfloor_store::{to_data, Direction, DocumentStore};
use std::sync::Arc;

use crate::entry::AuditLogEntry;
use crate::error::{AuditError, AuditResult};

/// Destination for audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one entry.
    ///
    /// # Returns
    ///
    /// ID assigned to the stored entry
    async fn persist(&self, entry: &AuditLogEntry) -> AuditResult<String>;
}

/// Sink writing into a document store collection with auto-assigned IDs.
#[derive(Clone)]
pub struct StoreAuditSink {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl std::fmt::Debug for StoreAuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreAuditSink")
            .field("collection", &self.collection)
            .finish()
    }
}

impl StoreAuditSink {
    /// Create a sink over `collection`.
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Target collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Most recent entries, newest first.
    pub async fn recent(&self, limit: usize) -> AuditResult<Vec<AuditLogEntry>> {
        let docs = self
            .store
            .query_ordered(&self.collection, "created_at", Direction::Descending, Some(limit))
            .await?;
        docs.iter()
            .map(|doc| doc.decode::<AuditLogEntry>().map_err(AuditError::from))
            .collect()
    }

    /// Every entry about one record, oldest first.
    pub async fn for_record(&self, record_id: &str) -> AuditResult<Vec<AuditLogEntry>> {
        let docs = self
            .store
            .query_eq(&self.collection, "record_id", &json!(record_id))
            .await?;
        let mut entries = docs
            .iter()
            .map(|doc| doc.decode::<AuditLogEntry>())
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }
}

#[async_trait]
impl AuditSink for StoreAuditSink {
    async fn persist(&self, entry: &AuditLogEntry) -> AuditResult<String> {
        let data = to_data(entry)?;
        Ok(self.store.add(&self.collection, data).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::AuditAction;
    use chrono::{Duration, Utc};
    use serde_json::Map;
    use shopfloor_store::MemoryDocumentStore;

    fn entry(record_id: &str, age_secs: i64) -> AuditLogEntry {
        AuditLogEntry {
            action: AuditAction::Update,
            resource: "orders".into(),
            record_id: record_id.into(),
            actor_id: "u-1".into(),
            before: None,
            after: None,
            metadata: Map::new(),
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[tokio::test]
    async fn test_persist_and_query() {
        let memory = Arc::new(MemoryDocumentStore::new());
        let sink = StoreAuditSink::new(memory.clone(), "audit_logs");

        sink.persist(&entry("o-1", 30)).await.unwrap();
        sink.persist(&entry("o-2", 20)).await.unwrap();
        sink.persist(&entry("o-1", 10)).await.unwrap();

        let recent = sink.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].record_id, "o-1");
        assert_eq!(recent[1].record_id, "o-2");

        let history = sink.for_record("o-1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].created_at < history[1].created_at);
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported() {
        let memory = Arc::new(MemoryDocumentStore::new());
        memory.fail_writes(true);
        let sink = StoreAuditSink::new(memory, "audit_logs");
        assert!(sink.persist(&entry("o-1", 0)).await.is_err());
    }
}
