//! Permission cache-invalidation bus
//!
//! This module provides a storage-independent observer list that tells
//! long-lived consumers "permission data changed". No payload is carried;
//! subscribers re-derive their own state. Publishes are not debounced.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;

/// Bus error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    /// The bus was dropped
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Handle returned by [`PermissionCacheBus::subscribe`].
pub type SubscriptionId = u64;

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Bus statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Total publishes
    pub publishes: u64,
    /// Total callback invocations that returned normally
    pub deliveries: u64,
    /// Total callback invocations that panicked
    pub subscriber_panics: u64,
    /// Registered callbacks
    pub active_subscriptions: usize,
}

/// Async view of the bus: yields the generation after each publish.
pub struct CacheWatch {
    receiver: broadcast::Receiver<u64>,
}

impl CacheWatch {
    /// Wait for the next change and return its generation.
    ///
    /// Missed publishes are coalesced: a lagging watcher skips straight to
    /// the most recent generation.
    pub async fn changed(&mut self) -> BusResult<u64> {
        loop {
            match self.receiver.recv().await {
                Ok(generation) => return Ok(generation),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Permission watcher lagged, coalescing");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(BusError::ChannelClosed),
            }
        }
    }
}

/// Publish/subscribe channel for permission cache invalidation.
///
/// Cloning the bus yields another handle to the same subscriber list.
///
/// # Example
///
/// ```rust
/// use shopfloor_events::PermissionCacheBus;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let bus = PermissionCacheBus::new();
/// let hits = Arc::new(AtomicUsize::new(0));
///
/// let counter = hits.clone();
/// let id = bus.subscribe(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// bus.publish();
/// assert!(bus.unsubscribe(id));
/// bus.publish();
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct PermissionCacheBus {
    subscribers: Arc<RwLock<BTreeMap<SubscriptionId, Callback>>>,
    next_id: Arc<AtomicU64>,
    generation: Arc<AtomicU64>,
    deliveries: Arc<AtomicU64>,
    panics: Arc<AtomicU64>,
    sender: broadcast::Sender<u64>,
}

impl std::fmt::Debug for PermissionCacheBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionCacheBus")
            .field("generation", &self.generation())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Default for PermissionCacheBus {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionCacheBus {
    /// Create a new bus.
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create with a custom watch channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            subscribers: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            generation: Arc::new(AtomicU64::new(0)),
            deliveries: Arc::new(AtomicU64::new(0)),
            panics: Arc::new(AtomicU64::new(0)),
            sender,
        }
    }

    /// Register a callback invoked on every publish.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::new(callback));
        id
    }

    /// Remove a callback.
    ///
    /// # Returns
    ///
    /// `true` if the subscription existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some()
    }

    /// Async watcher receiving the generation after each publish.
    pub fn watch(&self) -> CacheWatch {
        CacheWatch {
            receiver: self.sender.subscribe(),
        }
    }

    /// Announce that permission data changed.
    ///
    /// Every callback runs synchronously on the caller's task. A panicking
    /// callback is logged and does not stop delivery to the rest.
    ///
    /// # Returns
    ///
    /// The new generation
    pub fn publish(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Snapshot so callbacks may subscribe or unsubscribe re-entrantly.
        let callbacks: Vec<(SubscriptionId, Callback)> = self
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(id, cb)| (*id, cb.clone()))
            .collect();

        for (id, callback) in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback())) {
                Ok(()) => {
                    self.deliveries.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    self.panics.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(subscription = id, generation, "Permission cache subscriber panicked");
                }
            }
        }

        // No watchers is not an error.
        let _ = self.sender.send(generation);

        tracing::debug!(generation, "Permission cache invalidated");
        generation
    }

    /// Alias of [`subscribe`](Self::subscribe).
    pub fn on_permission_cache_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(callback)
    }

    /// Alias of [`publish`](Self::publish). The resolver keeps no cache, so
    /// clearing means telling consumers to re-read.
    pub fn clear_permission_cache(&self) -> u64 {
        self.publish()
    }

    /// Number of publishes so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Get bus stats.
    pub fn stats(&self) -> BusStats {
        BusStats {
            publishes: self.generation(),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            subscriber_panics: self.panics.load(Ordering::Relaxed),
            active_subscriptions: self.subscriber_count(),
        }
    }
}
