//! # Shopfloor Events
//!
//! Cross-consumer cache invalidation for Shopfloor permission data.
//!
//! ## Overview
//!
//! Any path that mutates roles or permission rows publishes on the
//! [`PermissionCacheBus`]. Long-lived consumers (views rendering
//! permission-gated UI, background workers holding derived state) subscribe
//! and re-read what they need. The bus is fully decoupled from storage and
//! from the resolver.
//!
//! ## Usage
//!
//! ### Callbacks
//!
//! ```rust
//! use shopfloor_events::PermissionCacheBus;
//!
//! let bus = PermissionCacheBus::new();
//! let id = bus.on_permission_cache_change(|| {
//!     // re-derive menu visibility, etc.
//! });
//!
//! bus.clear_permission_cache();
//! bus.unsubscribe(id);
//! ```
//!
//! ### Async watchers
//!
//! ```rust,no_run
//! use shopfloor_events::PermissionCacheBus;
//!
//! async fn refresh_loop(bus: PermissionCacheBus) {
//!     let mut watch = bus.watch();
//!     while let Ok(generation) = watch.changed().await {
//!         println!("permissions changed (generation {})", generation);
//!     }
//! }
//! ```

pub mod bus;

// Re-export main types
pub use bus::{BusError, BusResult, BusStats, CacheWatch, PermissionCacheBus, SubscriptionId};
