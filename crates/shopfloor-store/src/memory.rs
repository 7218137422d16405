//! In-memory document store
//!
//! Collections are `BTreeMap`s guarded by a single `tokio::sync::RwLock`, so
//! batch commits are atomic with respect to every other call. State is lost
//! on drop. Intended for tests and local development.
//!
//! Two hooks make it useful as a test double:
//! - [`MemoryDocumentStore::write_count`] counts successful document writes,
//!   so idempotence can be asserted as "zero new writes".
//! - [`MemoryDocumentStore::fail_writes`] / [`MemoryDocumentStore::fail_reads`]
//!   make subsequent calls fail with [`StoreError::Unavailable`].

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::document::{Direction, Document, DocumentStore, WriteBatch, WriteOp};
use crate::error::{StoreError, StoreResult};

type Collection = BTreeMap<String, Value>;

/// In-memory [`DocumentStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    writes: Arc<AtomicU64>,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of document writes applied so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, AtomicOrdering::SeqCst);
    }

    /// Make every subsequent read fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, AtomicOrdering::SeqCst);
    }

    /// Copy of a collection's contents, keyed by document ID.
    pub async fn snapshot(&self, collection: &str) -> BTreeMap<String, Value> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of documents in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        Ok(())
    }

    fn check_readable(&self) -> StoreResult<()> {
        if self.fail_reads.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("read rejected".to_string()));
        }
        Ok(())
    }

    fn count_writes(&self, n: usize) {
        self.writes.fetch_add(n as u64, AtomicOrdering::SeqCst);
    }

    async fn filter<F>(&self, collection: &str, keep: F) -> StoreResult<Vec<Document>>
    where
        F: Fn(&Value) -> bool + Send,
    {
        self.check_readable()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| keep(data))
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn require_object(collection: &str, id: &str, data: &Value) -> StoreResult<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(StoreError::InvalidDocument(format!("{}/{}", collection, id)))
    }
}

fn merge_fields(target: &mut Value, fields: &Map<String, Value>) {
    if let Value::Object(existing) = target {
        for (key, value) in fields {
            existing.insert(key.clone(), value.clone());
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: by type first, then by value.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.check_readable()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        self.check_writable()?;
        require_object(collection, id, &data)?;
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        self.count_writes(1);
        Ok(())
    }

    async fn add(&self, collection: &str, data: Value) -> StoreResult<String> {
        let id = Uuid::now_v7().to_string();
        self.set(collection, &id, data).await?;
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<()> {
        self.check_writable()?;
        let mut collections = self.collections.write().await;
        let existing = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        merge_fields(existing, &fields);
        self.count_writes(1);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.check_writable()?;
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        self.count_writes(1);
        Ok(())
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>> {
        self.filter(collection, |_| true).await
    }

    async fn query_eq(&self, collection: &str, field: &str, value: &Value) -> StoreResult<Vec<Document>> {
        self.filter(collection, |data| data.get(field) == Some(value))
            .await
    }

    async fn query_array_contains(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>> {
        self.filter(collection, |data| {
            data.get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value))
        })
        .await
    }

    async fn query_ordered(
        &self,
        collection: &str,
        field: &str,
        direction: Direction,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>> {
        let mut docs = self
            .filter(collection, |data| data.get(field).is_some())
            .await?;
        docs.sort_by(|a, b| {
            let ordering = match (a.field(field), b.field(field)) {
                (Some(x), Some(y)) => compare_values(x, y),
                _ => Ordering::Equal,
            };
            match direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        });
        if let Some(limit) = limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        self.check_writable()?;
        if batch.is_empty() {
            return Ok(());
        }

        let mut collections = self.collections.write().await;

        // Validate against a staged copy so a failing op leaves nothing applied.
        let mut staged = collections.clone();
        let ops = batch.into_ops();
        let count = ops.len();
        for op in ops {
            match op {
                WriteOp::Set { collection, id, data } => {
                    require_object(&collection, &id, &data)?;
                    staged.entry(collection).or_default().insert(id, data);
                }
                WriteOp::Update { collection, id, fields } => {
                    let existing = staged
                        .get_mut(&collection)
                        .and_then(|docs| docs.get_mut(&id))
                        .ok_or_else(|| StoreError::not_found(&collection, &id))?;
                    merge_fields(existing, &fields);
                }
                WriteOp::Delete { collection, id } => {
                    if let Some(docs) = staged.get_mut(&collection) {
                        docs.remove(&id);
                    }
                }
            }
        }

        *collections = staged;
        self.count_writes(count);
        Ok(())
    }
}
