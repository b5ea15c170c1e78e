//! Time-bounded caches of resolved authority.
//!
//! [`ExpiringCache`] is a thin generic wrapper over `moka`'s async cache with
//! a fixed time-to-live. [`PermissionCache`] holds the two per-user caches the
//! engine needs: resolved permission maps and resolved warehouse scopes.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use depot_core::UserId;
use moka::future::Cache;
use serde::Serialize;

use crate::resolution::EffectivePermissions;
use crate::scope::WarehouseScope;
use crate::{Error, Result};

// ============================================================================
// ExpiringCache
// ============================================================================

/// A concurrent key/value cache whose entries expire a fixed time after
/// insertion.
///
/// Last writer wins. Readers never block on another caller's population
/// unless they opt into [`get_or_try_insert_with`](Self::get_or_try_insert_with).
#[derive(Clone)]
pub struct ExpiringCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, V>,
    ttl: Duration,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache holding at most `max_entries` entries for `ttl` each.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
            ttl,
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the live value for `key`, if any.
    pub async fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).await
    }

    /// Stores `value` under `key` with a fresh time-to-live.
    pub async fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value).await;
    }

    /// Returns the live value for `key`, or runs `init` to produce it.
    ///
    /// Concurrent callers missing on the same key share a single `init`
    /// run. A failed `init` is not cached.
    pub async fn get_or_try_insert_with<F>(&self, key: K, init: F) -> Result<V>
    where
        F: Future<Output = Result<V>>,
    {
        self.inner
            .try_get_with(key, init)
            .await
            .map_err(Error::from)
    }

    /// Drops the entry for `key`.
    pub async fn invalidate(&self, key: &K) {
        self.inner.invalidate(key).await;
    }

    /// Drops every entry.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Number of live entries after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

// ============================================================================
// PermissionCache
// ============================================================================

/// Entry counts of the permission cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Users with a cached permission map.
    pub permission_entries: u64,
    /// Users with a cached warehouse scope.
    pub warehouse_entries: u64,
    /// Time-to-live of each entry, in seconds.
    pub ttl_secs: u64,
}

/// Per-user caches of resolved permissions and warehouse scopes.
#[derive(Clone)]
pub struct PermissionCache {
    permissions: ExpiringCache<UserId, Arc<EffectivePermissions>>,
    warehouses: ExpiringCache<UserId, Arc<WarehouseScope>>,
}

impl PermissionCache {
    /// Creates both caches with the same capacity and time-to-live.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            permissions: ExpiringCache::new(max_entries, ttl),
            warehouses: ExpiringCache::new(max_entries, ttl),
        }
    }

    /// The permission-map cache.
    pub fn permissions(&self) -> &ExpiringCache<UserId, Arc<EffectivePermissions>> {
        &self.permissions
    }

    /// The warehouse-scope cache.
    pub fn warehouses(&self) -> &ExpiringCache<UserId, Arc<WarehouseScope>> {
        &self.warehouses
    }

    /// Evicts everything cached for one user.
    pub async fn invalidate_user(&self, user_id: UserId) {
        self.permissions.invalidate(&user_id).await;
        self.warehouses.invalidate(&user_id).await;
    }

    /// Evicts every user.
    pub fn invalidate_all(&self) {
        self.permissions.invalidate_all();
        self.warehouses.invalidate_all();
    }

    /// Current entry counts.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            permission_entries: self.permissions.entry_count().await,
            warehouse_entries: self.warehouses.entry_count().await,
            ttl_secs: self.permissions.ttl().as_secs(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
