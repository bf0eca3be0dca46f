//! Feature gate checked before any webhook processing.
//!
//! Flags live in the database so operators can kill a processing path
//! without a deploy, but reading them on every event would put the
//! database in the hot path twice. The gate caches each flag for a short
//! TTL; a toggle takes effect within that window.
//!
//! Semantics are fail-closed: an absent flag row means disabled, and
//! that answer is cached like any other. A flag-store *error* is not an
//! answer at all and propagates, so processing stops rather than running
//! against an operator's intent.

use std::{collections::HashMap, sync::Arc, time::Duration, time::Instant};

use housecall_core::{Clock, CoreError};
use tokio::sync::Mutex;
use tracing::debug;

/// Source of flag state, usually the `system_config` table.
#[async_trait::async_trait]
pub trait FlagStore: Send + Sync {
    /// Reads a flag. `None` means no row exists for this feature.
    async fn flag_enabled(&self, feature: &str) -> Result<Option<bool>, CoreError>;
}

#[async_trait::async_trait]
impl FlagStore for housecall_core::storage::feature_flags::Repository {
    async fn flag_enabled(&self, feature: &str) -> Result<Option<bool>, CoreError> {
        self.is_enabled(feature).await
    }
}

struct CachedFlag {
    enabled: bool,
    fetched_at: Instant,
}

/// TTL-cached view of the feature flags.
pub struct FeatureGate {
    store: Arc<dyn FlagStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    cache: Mutex<HashMap<String, CachedFlag>>,
}

impl FeatureGate {
    /// Creates a gate over `store` with the given cache TTL.
    pub fn new(store: Arc<dyn FlagStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl, cache: Mutex::new(HashMap::new()) }
    }

    /// Whether a feature is enabled.
    ///
    /// Serves from cache while the entry is fresh; otherwise reads the
    /// store and caches the result. An absent flag is disabled.
    ///
    /// # Errors
    ///
    /// Returns the store error when the flag cannot be read and no fresh
    /// cache entry exists.
    pub async fn is_enabled(&self, feature: &str) -> Result<bool, CoreError> {
        let now = self.clock.now();

        {
            let cache = self.cache.lock().await;
            if let Some(entry) = cache.get(feature) {
                if now.duration_since(entry.fetched_at) < self.ttl {
                    return Ok(entry.enabled);
                }
            }
        }

        // Stale or missing; read through. Concurrent callers may race a
        // duplicate read, which is harmless.
        let enabled = self.store.flag_enabled(feature).await?.unwrap_or(false);
        debug!(feature, enabled, "feature flag refreshed");

        let mut cache = self.cache.lock().await;
        cache.insert(feature.to_string(), CachedFlag { enabled, fetched_at: now });

        Ok(enabled)
    }

    /// Drops the cached entry for a feature, forcing the next check to
    /// hit the store.
    pub async fn invalidate(&self, feature: &str) {
        self.cache.lock().await.remove(feature);
    }
}
