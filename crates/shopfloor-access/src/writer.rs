//! Chunked batch writes.
//!
//! Cascades and bootstrap can touch more documents than one batch may carry.
//! [`BatchWriter`] fills a batch up to the configured limit, commits it, and
//! starts the next one. Each commit is atomic on its own; the sequence is not.

use serde_json::{Map, Value};
use shopfloor_store::{DocumentStore, StoreResult, WriteBatch};

pub(crate) struct BatchWriter<'a> {
    store: &'a dyn DocumentStore,
    limit: usize,
    batch: WriteBatch,
    written: usize,
    commits: usize,
}

impl<'a> BatchWriter<'a> {
    pub(crate) fn new(store: &'a dyn DocumentStore, limit: usize) -> Self {
        Self {
            store,
            limit,
            batch: WriteBatch::with_limit(limit),
            written: 0,
            commits: 0,
        }
    }

    async fn make_room(&mut self) -> StoreResult<()> {
        if self.batch.is_full() {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> StoreResult<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.batch, WriteBatch::with_limit(self.limit));
        let len = batch.len();
        self.store.commit(batch).await?;
        self.written += len;
        self.commits += 1;
        Ok(())
    }

    pub(crate) async fn set(&mut self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        self.make_room().await?;
        self.batch.set(collection, id, data)
    }

    pub(crate) async fn update(
        &mut self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<()> {
        self.make_room().await?;
        self.batch.update(collection, id, fields)
    }

    pub(crate) async fn delete(&mut self, collection: &str, id: &str) -> StoreResult<()> {
        self.make_room().await?;
        self.batch.delete(collection, id)
    }

    /// Commit whatever is left.
    ///
    /// # Returns
    ///
    /// `(writes, commits)` over the writer's lifetime
    pub(crate) async fn finish(mut self) -> StoreResult<(usize, usize)> {
        self.flush().await?;
        Ok((self.written, self.commits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shopfloor_store::MemoryDocumentStore;

    #[tokio::test]
    async fn test_splits_into_capped_commits() {
        let store = MemoryDocumentStore::new();
        let mut writer = BatchWriter::new(&store, 2);
        for i in 0..5 {
            writer.set("rows", &i.to_string(), json!({ "i": i })).await.unwrap();
        }
        let (written, commits) = writer.finish().await.unwrap();

        assert_eq!(written, 5);
        assert_eq!(commits, 3);
        assert_eq!(store.len("rows").await, 5);
    }

    #[tokio::test]
    async fn test_empty_writer_commits_nothing() {
        let store = MemoryDocumentStore::new();
        let writer = BatchWriter::new(&store, 10);
        assert_eq!(writer.finish().await.unwrap(), (0, 0));
        assert_eq!(store.write_count(), 0);
    }
}
