//! # Shopfloor Audit Trail
//!
//! Records who changed what, and when, for every business mutation.
//!
//! ## Overview
//!
//! The shopfloor-audit crate handles:
//! - **Events**: Create/update/delete reports with before and after snapshots
//! - **Enrichment**: Session id, change summary, timestamp, actor contact
//!   details and (client side) environment facts
//! - **Delivery**: Debounced batches written concurrently to the
//!   `audit_logs` collection
//!
//! Recording is fire-and-forget. [`AuditTrail::record`] never fails and never
//! blocks the business operation; delivery errors are logged and dropped.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shopfloor_audit::{AuditAction, AuditConfig, AuditEvent, AuditTrail, EnvironmentFacts};
//! use shopfloor_store::MemoryDocumentStore;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! async fn example() {
//!     let trail = AuditTrail::with_store(Arc::new(MemoryDocumentStore::new()), AuditConfig::from_env())
//!         .with_client_context(EnvironmentFacts::detect());
//!
//!     trail.record(
//!         AuditEvent::new(AuditAction::Create, "customers", "c-9", "u-1")
//!             .after(json!({ "name": "Acme" })),
//!     );
//!
//!     // Entries are written after the debounce delay, or now on flush
//!     trail.flush().await;
//! }
//! ```

pub mod config;
pub mod entry;
pub mod environment;
pub mod error;
pub mod session;
pub mod sink;
pub mod summary;
pub mod trail;

// Re-export main types for convenience
pub use config::{AuditConfig, ConfigError};
pub use entry::{AuditAction, AuditEvent, AuditLogEntry};
pub use environment::{EnvironmentFacts, ScreenGeometry};
pub use error::{AuditError, AuditResult};
pub use session::session_id;
pub use sink::{AuditSink, StoreAuditSink};
pub use summary::summarize;
pub use trail::{AuditStats, AuditTrail};
