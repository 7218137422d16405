//! # Shopfloor Document Store
//!
//! Persistence seam for the Shopfloor authorization and audit crates.
//!
//! ## Overview
//!
//! The shopfloor-store crate provides:
//! - **DocumentStore**: Async trait over a document database (collections of JSON objects)
//! - **WriteBatch**: Atomic multi-document commits, capped at [`MAX_BATCH_WRITES`]
//! - **MemoryDocumentStore**: In-memory backend with write counting and failure injection
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shopfloor_store::{DocumentStore, MemoryDocumentStore, StoreResult, WriteBatch};
//! use serde_json::json;
//!
//! async fn example() -> StoreResult<()> {
//!     let store = MemoryDocumentStore::new();
//!
//!     let mut batch = WriteBatch::new();
//!     batch.set("roles", "qa_reviewer", json!({ "label": "QA Reviewer" }))?;
//!     store.commit(batch).await?;
//!
//!     assert!(store.get("roles", "qa_reviewer").await?.is_some());
//!     Ok(())
//! }
//! ```

pub mod document;
pub mod error;
pub mod memory;

// Re-export main types for convenience
pub use document::{
    to_data, to_fields, Direction, Document, DocumentStore, WriteBatch, WriteOp, MAX_BATCH_WRITES,
};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryDocumentStore;
