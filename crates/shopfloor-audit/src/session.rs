//! Per-process session identifier.

use std::sync::OnceLock;
use uuid::Uuid;

static SESSION_ID: OnceLock<String> = OnceLock::new();

/// Identifier generated once per process and attached to every audit entry,
/// so work from one client instance can be correlated.
pub fn session_id() -> &'static str {
    SESSION_ID.get_or_init(|| format!("session_{}", Uuid::now_v7().simple()))
}
