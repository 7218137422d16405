//! Batched, best-effort audit delivery.
//!
//! [`AuditTrail::record`] enriches an event and pushes it onto an in-memory
//! queue, then returns. A background task waits for the debounce delay and
//! dispatches the whole queue concurrently. Only one batch is in flight at a
//! time; entries recorded meanwhile wait for the next cycle. Failed writes
//! are logged and dropped.
//!
//! The queue is unbounded and lives only in memory: entries not yet flushed
//! are lost if the process dies.

use chrono::{SecondsFormat, Utc};
use futures::future::join_all;
use futures::FutureExt;
use serde_json::{json, Map};
use shopfloor_org::{Anonymous, IdentityProvider};
use shopfloor_store::DocumentStore;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::AuditConfig;
use crate::entry::{AuditEvent, AuditLogEntry};
use crate::environment::EnvironmentFacts;
use crate::session::session_id;
use crate::sink::{AuditSink, StoreAuditSink};
use crate::summary::summarize;

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditStats {
    /// Entries accepted by `record`
    pub recorded: u64,
    /// Entries the sink stored
    pub delivered: u64,
    /// Entries the sink rejected
    pub failed: u64,
    /// Batches dispatched
    pub batches: u64,
}

#[derive(Default)]
struct QueueState {
    queue: Mutex<Vec<AuditLogEntry>>,
    scheduled: AtomicBool,
    in_flight: tokio::sync::Mutex<()>,
    recorded: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    batches: AtomicU64,
}

impl QueueState {
    fn push(&self, entry: AuditLogEntry) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    fn take(&self) -> Vec<AuditLogEntry> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Dispatch one batch. Callers must hold `in_flight`.
    ///
    /// A sink that panics counts as a failed write for that entry.
    async fn dispatch(&self, sink: &dyn AuditSink) -> usize {
        let batch = self.take();
        if batch.is_empty() {
            return 0;
        }

        let writes = batch
            .iter()
            .map(|entry| AssertUnwindSafe(async move { sink.persist(entry).await }).catch_unwind());
        let results = join_all(writes).await;

        let mut failed = 0u64;
        for (entry, result) in batch.iter().zip(results) {
            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    failed += 1;
                    tracing::warn!(
                        action = %entry.action,
                        resource = %entry.resource,
                        record_id = %entry.record_id,
                        error = %e,
                        "Failed to write audit entry"
                    );
                }
                Err(_) => {
                    failed += 1;
                    tracing::error!(
                        action = %entry.action,
                        resource = %entry.resource,
                        record_id = %entry.record_id,
                        "Audit sink panicked while writing entry"
                    );
                }
            }
        }

        let delivered = batch.len() as u64 - failed;
        self.delivered.fetch_add(delivered, Ordering::Relaxed);
        self.failed.fetch_add(failed, Ordering::Relaxed);
        self.batches.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(size = batch.len(), delivered, failed, "Audit batch flushed");
        batch.len()
    }
}

/// Spawn the debounced flush unless one is already pending.
fn schedule(state: Arc<QueueState>, sink: Arc<dyn AuditSink>, delay: Duration) {
    if state.scheduled.swap(true, Ordering::SeqCst) {
        return;
    }

    let handle = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            state.scheduled.store(false, Ordering::SeqCst);
            tracing::warn!(
                pending = state.len(),
                "No async runtime; audit entries stay queued until flushed"
            );
            return;
        }
    };

    handle.spawn(async move {
        tokio::time::sleep(delay).await;
        {
            let _guard = state.in_flight.lock().await;
            state.dispatch(sink.as_ref()).await;
        }

        // Clear before checking, so a concurrent record either sees the flag
        // down and schedules itself, or is picked up here.
        state.scheduled.store(false, Ordering::SeqCst);
        if state.len() > 0 {
            schedule(state, sink, delay);
        }
    });
}

/// Audit trail.
///
/// Cloning yields another handle to the same queue.
///
/// # Example
///
/// ```rust,no_run
/// use shopfloor_audit::{AuditAction, AuditConfig, AuditEvent, AuditTrail};
/// use shopfloor_store::MemoryDocumentStore;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// async fn ship_order(trail: &AuditTrail) {
///     // ... business write succeeded ...
///     trail.record(
///         AuditEvent::new(AuditAction::Update, "orders", "o-17", "u-1")
///             .before(json!({ "status": "packed" }))
///             .after(json!({ "status": "shipped" })),
///     );
/// }
///
/// # async fn setup() {
/// let trail = AuditTrail::with_store(Arc::new(MemoryDocumentStore::new()), AuditConfig::from_env());
/// ship_order(&trail).await;
/// trail.flush().await;
/// # }
/// ```
#[derive(Clone)]
pub struct AuditTrail {
    sink: Arc<dyn AuditSink>,
    identity: Arc<dyn IdentityProvider>,
    environment: Option<EnvironmentFacts>,
    config: AuditConfig,
    state: Arc<QueueState>,
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("config", &self.config)
            .field("client_context", &self.environment.is_some())
            .field("pending", &self.pending())
            .finish()
    }
}

impl AuditTrail {
    /// Create a trail delivering to `sink`, with default configuration and
    /// no known actor identity.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            identity: Arc::new(Anonymous),
            environment: None,
            config: AuditConfig::default(),
            state: Arc::new(QueueState::default()),
        }
    }

    /// Create a trail writing into the configured collection of `store`.
    pub fn with_store(store: Arc<dyn DocumentStore>, config: AuditConfig) -> Self {
        let sink = StoreAuditSink::new(store, config.collection.clone());
        Self::new(Arc::new(sink)).with_config(config)
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: AuditConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve actor contact details from `identity`.
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    /// Attach environment facts to every entry (client context).
    pub fn with_client_context(mut self, facts: EnvironmentFacts) -> Self {
        self.environment = Some(facts);
        self
    }

    /// Build the enriched entry for an event.
    pub fn enrich(&self, event: AuditEvent) -> AuditLogEntry {
        let now = Utc::now();
        let summary = summarize(
            event.action,
            &event.resource,
            event.before.as_ref(),
            event.after.as_ref(),
            self.config.summary_max_fields,
        );

        let mut metadata = Map::new();
        metadata.insert("session_id".to_string(), json!(session_id()));
        metadata.insert("change_summary".to_string(), json!(summary));
        metadata.insert(
            "timestamp".to_string(),
            json!(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        if let Some(actor) = self.identity.current_actor() {
            metadata.insert("user_id".to_string(), json!(actor.id));
            if let Some(email) = actor.email {
                metadata.insert("user_email".to_string(), json!(email));
            }
            if let Some(name) = actor.display_name {
                metadata.insert("user_name".to_string(), json!(name));
            }
        }
        if let Some(facts) = &self.environment {
            match serde_json::to_value(facts) {
                Ok(value) => {
                    metadata.insert("environment".to_string(), value);
                }
                Err(e) => tracing::warn!(error = %e, "Could not serialize environment facts"),
            }
        }
        for (key, value) in event.extra {
            metadata.insert(key, value);
        }

        AuditLogEntry {
            action: event.action,
            resource: event.resource,
            record_id: event.record_id,
            actor_id: event.actor_id,
            before: event.before,
            after: event.after,
            metadata,
            created_at: now,
        }
    }

    /// Record a completed mutation.
    ///
    /// Returns immediately. Delivery happens later on the async runtime and
    /// its failures are only logged.
    pub fn record(&self, event: AuditEvent) {
        let entry = self.enrich(event);
        tracing::debug!(
            action = %entry.action,
            resource = %entry.resource,
            record_id = %entry.record_id,
            "Audit entry queued"
        );
        self.state.push(entry);
        schedule(self.state.clone(), self.sink.clone(), self.config.flush_delay());
    }

    /// Deliver everything queued now, waiting for any in-flight batch first.
    ///
    /// # Returns
    ///
    /// Number of entries dispatched
    pub async fn flush(&self) -> usize {
        let _guard = self.state.in_flight.lock().await;
        let mut total = 0;
        loop {
            let n = self.state.dispatch(self.sink.as_ref()).await;
            if n == 0 {
                break;
            }
            total += n;
        }
        total
    }

    /// Entries waiting for delivery.
    pub fn pending(&self) -> usize {
        self.state.len()
    }

    /// Delivery counters.
    pub fn stats(&self) -> AuditStats {
        AuditStats {
            recorded: self.state.recorded.load(Ordering::Relaxed),
            delivered: self.state.delivered.load(Ordering::Relaxed),
            failed: self.state.failed.load(Ordering::Relaxed),
            batches: self.state.batches.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::AuditAction;
    use crate::error::{AuditError, AuditResult};
    use async_trait::async_trait;
    use shopfloor_org::{ActorIdentity, SessionIdentity};
    use shopfloor_store::StoreError;
    use std::sync::atomic::AtomicUsize;

    /// Counts calls and the peak number of concurrent persists.
    #[derive(Default)]
    struct CountingSink {
        calls: AtomicUsize,
        active: AtomicUsize,
        peak: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl AuditSink for CountingSink {
        async fn persist(&self, _entry: &AuditLogEntry) -> AuditResult<String> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(AuditError::Store(StoreError::Unavailable("offline".into())));
            }
            Ok(n.to_string())
        }
    }

    fn event() -> AuditEvent {
        AuditEvent::new(AuditAction::Update, "orders", "o-1", "u-1")
            .before(json!({ "status": "open" }))
            .after(json!({ "status": "closed" }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_flush_after_delay() {
        let sink = Arc::new(CountingSink::default());
        let trail = AuditTrail::new(sink.clone());

        trail.record(event());
        trail.record(event());
        assert_eq!(trail.pending(), 2);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(trail.pending(), 0);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
        assert_eq!(trail.stats().batches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_is_dispatched_concurrently() {
        let sink = Arc::new(CountingSink::default());
        let trail = AuditTrail::new(sink.clone());

        for _ in 0..5 {
            trail.record(event());
        }
        trail.flush().await;

        assert_eq!(sink.calls.load(Ordering::SeqCst), 5);
        assert_eq!(sink.peak.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_counted_not_raised() {
        let sink = Arc::new(CountingSink::default());
        sink.fail.store(true, Ordering::SeqCst);
        let trail = AuditTrail::new(sink.clone());

        trail.record(event());
        assert_eq!(trail.flush().await, 1);

        let stats = trail.stats();
        assert_eq!(stats.recorded, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.delivered, 0);
    }

    /// Panics on its first write, then stores normally.
    #[derive(Default)]
    struct PanicOnceSink {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AuditSink for PanicOnceSink {
        async fn persist(&self, _entry: &AuditLogEntry) -> AuditResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                panic!("sink blew up");
            }
            Ok(n.to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_sink_does_not_stall_the_queue() {
        let sink = Arc::new(PanicOnceSink::default());
        let trail = AuditTrail::new(sink.clone());

        trail.record(event());
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);

        trail.record(event());
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(trail.pending(), 0);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
        let stats = trail.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.batches, 2);
    }

    #[test]
    fn test_record_without_runtime_stays_queued() {
        let trail = AuditTrail::new(Arc::new(CountingSink::default()));
        trail.record(event());
        assert_eq!(trail.pending(), 1);
    }

    #[test]
    fn test_enrichment_metadata() {
        let identity = SessionIdentity::signed_in(
            ActorIdentity::new("u-1")
                .with_email("ana@example.com")
                .with_display_name("Ana"),
        );
        let trail = AuditTrail::new(Arc::new(CountingSink::default()))
            .with_identity(Arc::new(identity))
            .with_client_context(EnvironmentFacts::default().with_timezone("Europe/Oslo"));

        let entry = trail.enrich(event().metadata("session_id", json!("override")));

        assert_eq!(entry.change_summary(), Some("Updated Status"));
        assert_eq!(entry.metadata["user_id"], "u-1");
        assert_eq!(entry.metadata["user_email"], "ana@example.com");
        assert_eq!(entry.metadata["user_name"], "Ana");
        assert_eq!(entry.metadata["environment"]["timezone"], "Europe/Oslo");
        assert_eq!(entry.session_id(), Some("override"));
        assert!(entry.metadata["timestamp"].is_string());
    }

    #[test]
    fn test_server_trail_has_no_environment() {
        let trail = AuditTrail::new(Arc::new(CountingSink::default()));
        let entry = trail.enrich(event());
        assert!(!entry.metadata.contains_key("environment"));
        assert!(!entry.metadata.contains_key("user_id"));
        assert!(!entry.metadata.contains_key("user_email"));
        assert_eq!(entry.session_id(), Some(session_id()));
    }
}
