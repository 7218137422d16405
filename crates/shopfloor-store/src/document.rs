//! Document store abstraction
//!
//! This module provides the persistence seam the authorization subsystem is
//! written against: a document database with collections of JSON objects,
//! point reads and writes, simple queries, and capped write batches.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Maximum number of writes a single batch may carry.
pub const MAX_BATCH_WRITES: usize = 500;

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document ID within its collection
    pub id: String,
    /// Document body (always a JSON object)
    pub data: Value,
}

impl Document {
    /// Create a document.
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self { id: id.into(), data }
    }

    /// Read a top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Decode the body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(self.data.clone()).map_err(StoreError::from)
    }
}

/// Serialize a value into a document body.
///
/// # Errors
///
/// `InvalidDocument` if the value does not serialize to a JSON object.
pub fn to_data<T: Serialize>(value: &T) -> StoreResult<Value> {
    let data = serde_json::to_value(value)?;
    if data.is_object() {
        Ok(data)
    } else {
        Err(StoreError::InvalidDocument(format!(
            "expected an object, got {}",
            data
        )))
    }
}

/// Serialize a value into a field map for partial updates.
pub fn to_fields<T: Serialize>(value: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::InvalidDocument(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// A single write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or replace a document.
    Set {
        /// Collection name
        collection: String,
        /// Document ID
        id: String,
        /// Full document body
        data: Value,
    },
    /// Shallow-merge fields into an existing document.
    Update {
        /// Collection name
        collection: String,
        /// Document ID
        id: String,
        /// Top-level fields to overwrite
        fields: Map<String, Value>,
    },
    /// Remove a document (no-op if absent).
    Delete {
        /// Collection name
        collection: String,
        /// Document ID
        id: String,
    },
}

/// An ordered group of writes committed together.
///
/// Batches are capped: pushing beyond the limit fails rather than silently
/// splitting, so callers decide where to cut.
///
/// # Example
///
/// ```
/// use shopfloor_store::WriteBatch;
/// use serde_json::json;
///
/// let mut batch = WriteBatch::with_limit(2);
/// batch.set("roles", "a", json!({})).unwrap();
/// batch.delete("roles", "b").unwrap();
/// assert!(batch.is_full());
/// assert!(batch.delete("roles", "c").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
    limit: usize,
}

impl Default for WriteBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBatch {
    /// Create a batch with the store's maximum size.
    pub fn new() -> Self {
        Self::with_limit(MAX_BATCH_WRITES)
    }

    /// Create a batch with a smaller cap. The cap never exceeds
    /// [`MAX_BATCH_WRITES`] and is at least one.
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.clamp(1, MAX_BATCH_WRITES);
        Self {
            ops: Vec::with_capacity(limit.min(64)),
            limit,
        }
    }

    fn push(&mut self, op: WriteOp) -> StoreResult<()> {
        if self.ops.len() >= self.limit {
            return Err(StoreError::BatchLimitExceeded { limit: self.limit });
        }
        self.ops.push(op);
        Ok(())
    }

    /// Queue a create-or-replace.
    pub fn set(&mut self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        if !data.is_object() {
            return Err(StoreError::InvalidDocument(format!("{}/{}", collection, id)));
        }
        self.push(WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
        })
    }

    /// Queue a shallow merge into an existing document.
    pub fn update(&mut self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<()> {
        self.push(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        })
    }

    /// Queue a delete.
    pub fn delete(&mut self, collection: &str, id: &str) -> StoreResult<()> {
        self.push(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }

    /// Number of queued writes.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// True when another write would exceed the cap.
    pub fn is_full(&self) -> bool {
        self.ops.len() >= self.limit
    }

    /// The batch's cap.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Queued writes, in order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Consume the batch into its writes.
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Document store trait.
///
/// Every call is an independent async round-trip; there are no multi-call
/// transactions. Only a single [`WriteBatch`] commit is atomic.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document by ID.
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Create or replace a document.
    async fn set(&self, collection: &str, id: &str, data: Value) -> StoreResult<()>;

    /// Create a document with a store-assigned ID.
    async fn add(&self, collection: &str, data: Value) -> StoreResult<String>;

    /// Shallow-merge fields into an existing document.
    ///
    /// # Errors
    ///
    /// `NotFound` if the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<()>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// List every document in a collection.
    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>>;

    /// Documents whose top-level `field` equals `value`.
    async fn query_eq(&self, collection: &str, field: &str, value: &Value) -> StoreResult<Vec<Document>>;

    /// Documents whose top-level array `field` contains `value`.
    async fn query_array_contains(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>>;

    /// Documents that have `field`, ordered by it, optionally truncated.
    async fn query_ordered(
        &self,
        collection: &str,
        field: &str,
        direction: Direction,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>>;

    /// Apply every write in the batch, or none of them.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}
