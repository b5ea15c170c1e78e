//! The authorization engine.
//!
//! [`AclEngine`] ties the store, the capability detector, and the
//! permission cache together. It is cheap to clone (Arc internals) and is
//! meant to be shared by every request-handling task.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use depot_acl::{AclConfig, AclEngine, MemoryStore};
//! use depot_core::{Caller, UserId};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = Arc::new(MemoryStore::new());
//! store.grant("operator", "view_inbound", true, true);
//!
//! let engine = AclEngine::new(store, AclConfig::default());
//! let caller = Caller::new(UserId::new(7), "operator");
//! assert!(engine.has_permission(&caller, "view_inbound").await.unwrap());
//! assert!(!engine.has_permission(&caller, "delete_inbound").await.unwrap());
//! # });
//! ```

use std::fmt;
use std::sync::Arc;

use depot_core::{
    Caller, EffectivePermission, PermissionCatalog, PermissionCode, UserId,
};

use crate::cache::{CacheStats, PermissionCache};
use crate::capability::{Capabilities, CapabilityDetector, CapabilityState};
use crate::config::AclConfig;
use crate::resolution::{Bypass, EffectivePermissions, Resolution};
use crate::scope::WarehouseScope;
use crate::store::AclStore;
use crate::Result;

// ============================================================================
// PermissionCheck
// ============================================================================

/// Outcome of an any-of or all-of permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionCheck {
    /// The caller may proceed.
    Granted,
    /// The caller may not proceed.
    Denied {
        /// For any-of checks, every required code; for all-of checks, the
        /// codes that were not granted.
        codes: Vec<PermissionCode>,
    },
}

impl PermissionCheck {
    /// Whether the check passed.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

// ============================================================================
// AclEngine
// ============================================================================

/// Resolves effective permissions and warehouse scopes for callers.
#[derive(Clone)]
pub struct AclEngine {
    inner: Arc<AclEngineInner>,
}

struct AclEngineInner {
    store: Arc<dyn AclStore>,
    detector: CapabilityDetector,
    cache: PermissionCache,
    catalog: PermissionCatalog,
    config: AclConfig,
}

impl AclEngine {
    /// Creates an engine over `store` using the built-in catalog.
    pub fn new(store: Arc<dyn AclStore>, config: AclConfig) -> Self {
        Self::with_catalog(store, config, PermissionCatalog::builtin())
    }

    /// Creates an engine over `store` with an explicit catalog.
    pub fn with_catalog(
        store: Arc<dyn AclStore>,
        config: AclConfig,
        catalog: PermissionCatalog,
    ) -> Self {
        let cache = PermissionCache::new(config.cache_max_entries, config.cache_ttl());
        Self {
            inner: Arc::new(AclEngineInner {
                store,
                detector: CapabilityDetector::new(),
                cache,
                catalog,
                config,
            }),
        }
    }

    /// The permission catalog.
    pub fn catalog(&self) -> &PermissionCatalog {
        &self.inner.catalog
    }

    /// The engine configuration.
    pub fn config(&self) -> &AclConfig {
        &self.inner.config
    }

    // ------------------------------------------------------------------------
    // Capabilities
    // ------------------------------------------------------------------------

    /// Detected schema capabilities, probing the store on first use.
    pub async fn capabilities(&self) -> Capabilities {
        self.inner.detector.detect(self.inner.store.as_ref()).await
    }

    /// Current capability detection state.
    pub fn capability_state(&self) -> CapabilityState {
        self.inner.detector.state()
    }

    /// Pins capabilities without probing, until the next full cache clear.
    pub fn force_capabilities(&self, capabilities: Capabilities) {
        self.inner.detector.force(capabilities);
    }

    // ------------------------------------------------------------------------
    // Permission resolution
    // ------------------------------------------------------------------------

    /// Resolves the caller's effective permissions.
    ///
    /// `super_admin` bypasses in every mode. In legacy mode `admin` and every
    /// other authenticated role bypass too, since the legacy schema cannot
    /// express fine-grained grants. In full mode role grants are merged with
    /// user overrides and cached per user.
    pub async fn resolve_permissions(&self, caller: &Caller) -> Result<Resolution> {
        if caller.role.is_super_admin() {
            return Ok(Resolution::AllGranted(Bypass::SuperAdmin));
        }

        if self.capabilities().await.is_legacy() {
            let bypass = if caller.role.is_admin() {
                Bypass::LegacyAdmin
            } else {
                Bypass::LegacyUser
            };
            return Ok(Resolution::AllGranted(bypass));
        }

        let map = self.cached_permissions(caller).await?;
        Ok(Resolution::Explicit(map))
    }

    async fn cached_permissions(&self, caller: &Caller) -> Result<Arc<EffectivePermissions>> {
        let cache = self.inner.cache.permissions();

        if let Some(hit) = cache.get(&caller.user_id).await {
            if hit.role() == &caller.role {
                return Ok(hit);
            }
            log::debug!(
                "Cached permissions for user {} were resolved as '{}', caller is now '{}'",
                caller.user_id,
                hit.role(),
                caller.role
            );
            cache.invalidate(&caller.user_id).await;
        }

        if self.inner.config.single_flight {
            return cache
                .get_or_try_insert_with(caller.user_id, self.load_permissions(caller))
                .await;
        }

        let map = self.load_permissions(caller).await?;
        cache.insert(caller.user_id, map.clone()).await;
        Ok(map)
    }

    async fn load_permissions(&self, caller: &Caller) -> Result<Arc<EffectivePermissions>> {
        let store = &self.inner.store;
        let (grants, overrides) = tokio::try_join!(
            store.role_grants(&caller.role),
            store.user_overrides(caller.user_id)
        )?;
        log::debug!(
            "Resolved permissions for user {} ({}): {} role grants, {} overrides",
            caller.user_id,
            caller.role,
            grants.len(),
            overrides.len()
        );
        Ok(Arc::new(EffectivePermissions::merge(
            caller.role.clone(),
            &grants,
            &overrides,
        )))
    }

    /// Whether the caller holds `code`.
    pub async fn has_permission(&self, caller: &Caller, code: &str) -> Result<bool> {
        Ok(self.resolve_permissions(caller).await?.allows(code))
    }

    /// Whether the caller holds every one of `codes`.
    pub async fn has_all_permissions<C: AsRef<str>>(
        &self,
        caller: &Caller,
        codes: &[C],
    ) -> Result<bool> {
        Ok(self.resolve_permissions(caller).await?.missing(codes).is_empty())
    }

    /// Passes when the caller holds at least one of `codes`.
    pub async fn check_any<C: AsRef<str>>(
        &self,
        caller: &Caller,
        codes: &[C],
    ) -> Result<PermissionCheck> {
        let resolution = self.resolve_permissions(caller).await?;
        if resolution.allows_any(codes) {
            return Ok(PermissionCheck::Granted);
        }
        Ok(PermissionCheck::Denied {
            codes: codes.iter().map(|c| PermissionCode::new(c.as_ref())).collect(),
        })
    }

    /// Passes only when the caller holds every one of `codes`.
    pub async fn check_all<C: AsRef<str>>(
        &self,
        caller: &Caller,
        codes: &[C],
    ) -> Result<PermissionCheck> {
        let resolution = self.resolve_permissions(caller).await?;
        let missing = resolution.missing(codes);
        if missing.is_empty() {
            return Ok(PermissionCheck::Granted);
        }
        Ok(PermissionCheck::Denied {
            codes: missing
                .into_iter()
                .map(|c| PermissionCode::new(c.as_ref()))
                .collect(),
        })
    }

    /// Every decision for the caller. Under a bypass, one granted decision per
    /// catalog entry.
    pub async fn effective_permissions(&self, caller: &Caller) -> Result<Vec<EffectivePermission>> {
        let resolution = self.resolve_permissions(caller).await?;
        Ok(match &resolution {
            Resolution::AllGranted(_) => self
                .inner
                .catalog
                .codes()
                .map(|code| resolution.decision(code.as_str()))
                .collect(),
            Resolution::Explicit(map) => map.iter().cloned().collect(),
        })
    }

    /// Codes whose UI element the caller should see. Under a bypass, the
    /// whole catalog.
    pub async fn visible_permissions(&self, caller: &Caller) -> Result<Vec<PermissionCode>> {
        Ok(match self.resolve_permissions(caller).await? {
            Resolution::AllGranted(_) => self.inner.catalog.codes().cloned().collect(),
            Resolution::Explicit(map) => map.visible_codes().cloned().collect(),
        })
    }

    // ------------------------------------------------------------------------
    // Warehouse scope
    // ------------------------------------------------------------------------

    /// Resolves the warehouses the caller may access.
    ///
    /// `super_admin` is unrestricted. Without the assignment table, the
    /// session warehouse is the only accessible one. Otherwise zero stored
    /// assignments mean unrestricted and any rows form the allow-list.
    pub async fn resolve_warehouse_scope(&self, caller: &Caller) -> Result<Arc<WarehouseScope>> {
        if caller.role.is_super_admin() {
            return Ok(Arc::new(WarehouseScope::Unrestricted));
        }

        if !self.capabilities().await.warehouse_scoping {
            return Ok(Arc::new(WarehouseScope::from_session(
                &caller.role,
                caller.warehouse_id,
            )));
        }

        let cache = self.inner.cache.warehouses();
        if let Some(hit) = cache.get(&caller.user_id).await {
            return Ok(hit);
        }

        if self.inner.config.single_flight {
            return cache
                .get_or_try_insert_with(caller.user_id, self.load_warehouse_scope(caller))
                .await;
        }

        let scope = self.load_warehouse_scope(caller).await?;
        cache.insert(caller.user_id, scope.clone()).await;
        Ok(scope)
    }

    async fn load_warehouse_scope(&self, caller: &Caller) -> Result<Arc<WarehouseScope>> {
        let rows = self.inner.store.warehouse_assignments(caller.user_id).await?;
        log::debug!(
            "Resolved warehouse scope for user {}: {} assignments",
            caller.user_id,
            rows.len()
        );
        Ok(Arc::new(WarehouseScope::from_assignments(&caller.role, &rows)))
    }

    // ------------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------------

    /// Evicts cached authority.
    ///
    /// With a user, only that user's entries go and capabilities stay
    /// memoized. Without one, every entry goes and capabilities are forgotten
    /// so the next request probes the schema again.
    pub async fn clear_permission_cache(&self, user_id: Option<UserId>) {
        match user_id {
            Some(user_id) => {
                self.inner.cache.invalidate_user(user_id).await;
                log::info!("Permission cache cleared for user {user_id}");
            }
            None => {
                self.inner.cache.invalidate_all();
                self.inner.detector.reset();
                log::info!("Permission cache cleared for all users; capabilities reset");
            }
        }
    }

    /// Current cache entry counts.
    pub async fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats().await
    }
}

impl fmt::Debug for AclEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AclEngine")
            .field("capabilities", &self.inner.detector.state())
            .field("config", &self.inner.config)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityMode;
    use crate::memory_store::MemoryStore;
    use crate::Error;
    use depot_core::{PermissionSource, WarehouseId};

    fn engine_over(store: &Arc<MemoryStore>) -> AclEngine {
        AclEngine::new(store.clone(), AclConfig::default())
    }

    fn operator(id: i64) -> Caller {
        Caller::new(UserId::new(id), "operator")
    }

    // ------------------------------------------------------------------------
    // Permission resolution
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_override_allows_despite_role_deny() {
        let store = Arc::new(MemoryStore::new());
        store.grant("operator", "view_qc", false, false);
        store.set_override(UserId::new(1), "view_qc", true, true);
        let engine = engine_over(&store);

        assert!(engine.has_permission(&operator(1), "view_qc").await.unwrap());
        // another operator without the override is denied
        assert!(!engine.has_permission(&operator(2), "view_qc").await.unwrap());
    }

    #[tokio::test]
    async fn test_override_denies_despite_role_allow() {
        let store = Arc::new(MemoryStore::new());
        store.grant("operator", "delete_inbound", true, true);
        store.set_override(UserId::new(1), "delete_inbound", false, false);
        let engine = engine_over(&store);

        assert!(!engine.has_permission(&operator(1), "delete_inbound").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_code_denied_in_full_mode() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        assert!(!engine.has_permission(&operator(1), "view_qc").await.unwrap());
    }

    #[tokio::test]
    async fn test_super_admin_bypasses_without_store_reads() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        let caller = Caller::new(UserId::new(1), "super_admin");

        let res = engine.resolve_permissions(&caller).await.unwrap();
        assert_eq!(res.bypass(), Some(Bypass::SuperAdmin));
        assert!(res.allows("anything_at_all"));
        let calls = store.calls();
        assert_eq!(calls.role_grants, 0);
        assert_eq!(calls.permission_probes, 0);
    }

    #[tokio::test]
    async fn test_super_admin_bypasses_even_when_store_fails() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let engine = engine_over(&store);
        let caller = Caller::new(UserId::new(1), "super_admin");

        let check = engine.check_all(&caller, &["manage_users", "manage_roles"]).await;
        assert_eq!(check.unwrap(), PermissionCheck::Granted);
        let scope = engine.resolve_warehouse_scope(&caller).await.unwrap();
        assert!(scope.is_unrestricted());
    }

    #[tokio::test]
    async fn test_legacy_user_passes_every_check() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        engine.force_capabilities(Capabilities::LEGACY);
        let picker = Caller::new(UserId::new(4), "picker");

        let res = engine.resolve_permissions(&picker).await.unwrap();
        assert_eq!(res.bypass(), Some(Bypass::LegacyUser));
        assert!(engine.has_permission(&picker, "delete_inbound").await.unwrap());
        assert_eq!(store.calls().role_grants, 0);
    }

    #[tokio::test]
    async fn test_legacy_admin_bypass() {
        let store = Arc::new(MemoryStore::legacy());
        let engine = engine_over(&store);
        let admin = Caller::new(UserId::new(2), "admin");

        let res = engine.resolve_permissions(&admin).await.unwrap();
        assert_eq!(res.bypass(), Some(Bypass::LegacyAdmin));
    }

    #[tokio::test]
    async fn test_admin_in_full_mode_uses_grants() {
        let store = Arc::new(MemoryStore::new());
        store.grant("admin", "manage_users", true, true);
        let engine = engine_over(&store);
        let admin = Caller::new(UserId::new(2), "admin");

        let res = engine.resolve_permissions(&admin).await.unwrap();
        assert_eq!(res.bypass(), None);
        assert!(res.allows("manage_users"));
        assert!(!res.allows("manage_backups"));
    }

    #[tokio::test]
    async fn test_check_any_names_all_required_codes() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);

        let check = engine
            .check_any(&operator(1), &["approve_qc", "manage_users"])
            .await
            .unwrap();
        assert_eq!(
            check,
            PermissionCheck::Denied {
                codes: vec![PermissionCode::new("approve_qc"), PermissionCode::new("manage_users")]
            }
        );
    }

    #[tokio::test]
    async fn test_check_all_names_missing_subset() {
        let store = Arc::new(MemoryStore::new());
        store.grant("operator", "view_inbound", true, true);
        let engine = engine_over(&store);

        let check = engine
            .check_all(&operator(1), &["view_inbound", "edit_inbound"])
            .await
            .unwrap();
        assert_eq!(
            check,
            PermissionCheck::Denied {
                codes: vec![PermissionCode::new("edit_inbound")]
            }
        );

        store.grant("operator", "edit_inbound", true, true);
        engine.clear_permission_cache(Some(UserId::new(1))).await;
        let check = engine
            .check_all(&operator(1), &["view_inbound", "edit_inbound"])
            .await
            .unwrap();
        assert!(check.is_granted());
        assert!(
            engine
                .has_all_permissions(&operator(1), &["view_inbound", "edit_inbound"])
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_store_failure_in_full_mode_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let engine = engine_over(&store);

        let err = engine.resolve_permissions(&operator(1)).await.unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
        // capability detection itself never failed
        assert_eq!(
            engine.capability_state().capabilities().map(|c| c.permissions),
            Some(CapabilityMode::Full)
        );
    }

    #[tokio::test]
    async fn test_failed_resolution_is_not_cached() {
        let store = Arc::new(MemoryStore::new());
        store.grant("operator", "view_qc", true, true);
        store.set_failing(true);
        let engine = engine_over(&store);

        assert!(engine.resolve_permissions(&operator(1)).await.is_err());
        store.set_failing(false);
        assert!(engine.has_permission(&operator(1), "view_qc").await.unwrap());
    }

    // ------------------------------------------------------------------------
    // Caching
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_resolution_idempotent_within_ttl() {
        let store = Arc::new(MemoryStore::new());
        store.grant("operator", "view_qc", true, true);
        let engine = engine_over(&store);

        let first = engine.resolve_permissions(&operator(1)).await.unwrap();
        let second = engine.resolve_permissions(&operator(1)).await.unwrap();
        assert_eq!(first, second);
        match (&first, &second) {
            (Resolution::Explicit(a), Resolution::Explicit(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("expected explicit resolutions"),
        }
        assert_eq!(store.calls().role_grants, 1);
        assert_eq!(store.calls().user_overrides, 1);
    }

    #[tokio::test]
    async fn test_stale_until_invalidated() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        assert!(!engine.has_permission(&operator(1), "view_qc").await.unwrap());

        store.set_override(UserId::new(1), "view_qc", true, true);
        // served from cache
        assert!(!engine.has_permission(&operator(1), "view_qc").await.unwrap());

        engine.clear_permission_cache(Some(UserId::new(1))).await;
        assert!(engine.has_permission(&operator(1), "view_qc").await.unwrap());
    }

    #[tokio::test]
    async fn test_user_clear_rereads_stores_but_not_capabilities() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        let caller = operator(1);

        engine.resolve_permissions(&caller).await.unwrap();
        engine.resolve_warehouse_scope(&caller).await.unwrap();
        let before = store.calls();

        engine.clear_permission_cache(Some(caller.user_id)).await;
        engine.resolve_permissions(&caller).await.unwrap();
        engine.resolve_warehouse_scope(&caller).await.unwrap();
        let after = store.calls();

        assert_eq!(after.role_grants, before.role_grants + 1);
        assert_eq!(after.user_overrides, before.user_overrides + 1);
        assert_eq!(after.warehouse_assignments, before.warehouse_assignments + 1);
        assert_eq!(after.permission_probes, before.permission_probes);
        assert_eq!(after.warehouse_probes, before.warehouse_probes);
    }

    #[tokio::test]
    async fn test_user_clear_leaves_other_users_cached() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);

        engine.resolve_permissions(&operator(1)).await.unwrap();
        engine.resolve_permissions(&operator(2)).await.unwrap();
        engine.clear_permission_cache(Some(UserId::new(1))).await;
        engine.resolve_permissions(&operator(2)).await.unwrap();

        assert_eq!(store.calls().role_grants, 2);
    }

    #[tokio::test]
    async fn test_full_clear_resets_capabilities() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        engine.resolve_permissions(&operator(1)).await.unwrap();
        assert_eq!(store.calls().permission_probes, 1);

        engine.clear_permission_cache(None).await;
        assert_eq!(engine.capability_state(), CapabilityState::Unknown);

        engine.resolve_permissions(&operator(1)).await.unwrap();
        let calls = store.calls();
        assert_eq!(calls.permission_probes, 2);
        assert_eq!(calls.role_grants, 2);
    }

    #[tokio::test]
    async fn test_full_clear_picks_up_migrated_schema() {
        let store = Arc::new(MemoryStore::legacy());
        let engine = engine_over(&store);
        assert!(engine.capabilities().await.is_legacy());

        store.set_permission_schema(true);
        store.set_warehouse_schema(true);
        assert!(engine.capabilities().await.is_legacy());

        engine.clear_permission_cache(None).await;
        assert_eq!(engine.capabilities().await, Capabilities::FULL);
    }

    #[tokio::test]
    async fn test_role_change_is_not_served_stale() {
        let store = Arc::new(MemoryStore::new());
        store.grant("operator", "view_qc", false, true);
        store.grant("qc", "view_qc", true, true);
        let engine = engine_over(&store);

        assert!(!engine.has_permission(&operator(1), "view_qc").await.unwrap());
        let promoted = Caller::new(UserId::new(1), "qc");
        assert!(engine.has_permission(&promoted, "view_qc").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolution_is_consistent() {
        let store = Arc::new(MemoryStore::new());
        store.grant("operator", "view_inbound", true, true);
        let engine = engine_over(&store);

        let mut handles = Vec::new();
        for _ in 0..32 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.has_permission(&operator(1), "view_inbound").await
            }));
        }
        for h in handles {
            assert!(h.await.unwrap().unwrap());
        }
        assert_eq!(store.calls().permission_probes, 1);
        assert!(store.calls().role_grants >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight_dedupes_concurrent_misses() {
        let store = Arc::new(MemoryStore::new());
        store.grant("operator", "view_inbound", true, true);
        let engine = AclEngine::new(
            store.clone(),
            AclConfig {
                single_flight: true,
                ..Default::default()
            },
        );
        engine.capabilities().await;

        let mut handles = Vec::new();
        for _ in 0..32 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.has_permission(&operator(1), "view_inbound").await
            }));
        }
        for h in handles {
            assert!(h.await.unwrap().unwrap());
        }
        assert_eq!(store.calls().role_grants, 1);
    }

    // ------------------------------------------------------------------------
    // Warehouse scope
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_zero_assignments_unrestricted() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);

        let scope = engine.resolve_warehouse_scope(&operator(1)).await.unwrap();
        assert!(scope.is_unrestricted());
        assert!(scope.allows(WarehouseId::new(5)));
    }

    #[tokio::test]
    async fn test_assignments_restrict() {
        let store = Arc::new(MemoryStore::new());
        store.assign_warehouse(UserId::new(1), WarehouseId::new(3), true);
        let engine = engine_over(&store);

        let scope = engine.resolve_warehouse_scope(&operator(1)).await.unwrap();
        assert!(scope.allows(WarehouseId::new(3)));
        assert!(!scope.allows(WarehouseId::new(5)));
    }

    #[tokio::test]
    async fn test_warehouse_scope_cached() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);

        engine.resolve_warehouse_scope(&operator(1)).await.unwrap();
        engine.resolve_warehouse_scope(&operator(1)).await.unwrap();
        assert_eq!(store.calls().warehouse_assignments, 1);
    }

    #[tokio::test]
    async fn test_session_scope_without_assignment_table() {
        let store = Arc::new(MemoryStore::new());
        store.set_warehouse_schema(false);
        store.assign_warehouse(UserId::new(1), WarehouseId::new(9), true);
        let engine = engine_over(&store);

        let caller = operator(1).with_warehouse(WarehouseId::new(2));
        let scope = engine.resolve_warehouse_scope(&caller).await.unwrap();
        assert_eq!(scope.accessible(), Some(vec![WarehouseId::new(2)]));
        assert_eq!(store.calls().warehouse_assignments, 0);

        let scope = engine.resolve_warehouse_scope(&operator(1)).await.unwrap();
        assert_eq!(scope.accessible(), Some(vec![]));
    }

    #[tokio::test]
    async fn test_warehouse_scoping_independent_of_permission_mode() {
        let store = Arc::new(MemoryStore::new());
        store.set_permission_schema(false);
        store.assign_warehouse(UserId::new(1), WarehouseId::new(3), false);
        let engine = engine_over(&store);

        // legacy permissions, but assignments still scope warehouses
        assert!(engine.resolve_permissions(&operator(1)).await.unwrap().bypass().is_some());
        let scope = engine.resolve_warehouse_scope(&operator(1)).await.unwrap();
        assert!(!scope.allows(WarehouseId::new(5)));
    }

    #[tokio::test]
    async fn test_warehouse_store_failure_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let engine = engine_over(&store);
        assert!(engine.resolve_warehouse_scope(&operator(1)).await.is_err());
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_visible_permissions() {
        let store = Arc::new(MemoryStore::new());
        store.grant("operator", "view_inbound", true, true);
        store.grant("operator", "view_reports", true, false);
        store.set_override(UserId::new(1), "view_qc", false, true);
        let engine = engine_over(&store);

        let visible = engine.visible_permissions(&operator(1)).await.unwrap();
        assert_eq!(
            visible,
            vec![PermissionCode::new("view_inbound"), PermissionCode::new("view_qc")]
        );
    }

    #[tokio::test]
    async fn test_bypass_sees_whole_catalog() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        let caller = Caller::new(UserId::new(1), "super_admin");

        let visible = engine.visible_permissions(&caller).await.unwrap();
        assert_eq!(visible.len(), engine.catalog().len());

        let effective = engine.effective_permissions(&caller).await.unwrap();
        assert_eq!(effective.len(), engine.catalog().len());
        assert!(effective.iter().all(|p| p.can_access && p.source == PermissionSource::Legacy));
    }

    #[tokio::test]
    async fn test_cache_stats() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        engine.resolve_permissions(&operator(1)).await.unwrap();
        engine.resolve_permissions(&operator(2)).await.unwrap();
        engine.resolve_warehouse_scope(&operator(1)).await.unwrap();

        let stats = engine.cache_stats().await;
        assert_eq!(stats.permission_entries, 2);
        assert_eq!(stats.warehouse_entries, 1);
        assert_eq!(stats.ttl_secs, 60);
    }

    #[test]
    fn test_engine_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AclEngine>();
    }
}
