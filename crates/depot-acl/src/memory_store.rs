//! In-memory [`AclStore`] for development servers and tests.
//!
//! Each read is counted so callers can observe cache hits and capability
//! probes. Schema availability and store failures can be toggled at runtime.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use depot_core::{
    Permission, PermissionCatalog, PermissionCode, RoleGrant, RoleName, UserId, UserOverride,
    WarehouseAssignment, WarehouseId,
};

use crate::store::AclStore;
use crate::{Error, Result};

#[derive(Default)]
struct Tables {
    permissions: Vec<Permission>,
    grants: BTreeMap<(RoleName, PermissionCode), RoleGrant>,
    overrides: BTreeMap<(UserId, PermissionCode), UserOverride>,
    assignments: BTreeMap<(UserId, WarehouseId), WarehouseAssignment>,
}

/// Snapshot of how many times each store was read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    /// Permission schema probes.
    pub permission_probes: u64,
    /// Warehouse schema probes.
    pub warehouse_probes: u64,
    /// Role grant reads.
    pub role_grants: u64,
    /// User override reads.
    pub user_overrides: u64,
    /// Warehouse assignment reads.
    pub warehouse_assignments: u64,
}

#[derive(Default)]
struct Counters {
    permission_probes: AtomicU64,
    warehouse_probes: AtomicU64,
    role_grants: AtomicU64,
    user_overrides: AtomicU64,
    warehouse_assignments: AtomicU64,
}

/// A thread-safe, counting, in-memory authority store.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    permission_schema: AtomicBool,
    warehouse_schema: AtomicBool,
    failing: AtomicBool,
    calls: Counters,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty store with both schema extensions present.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            permission_schema: AtomicBool::new(true),
            warehouse_schema: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            calls: Counters::default(),
        }
    }

    /// A store seeded with the built-in permission catalog.
    pub fn with_builtin_catalog() -> Self {
        let store = Self::new();
        store.write(|t| t.permissions = PermissionCatalog::builtin().iter().cloned().collect());
        store
    }

    /// A store that looks like a legacy deployment: neither extension exists.
    pub fn legacy() -> Self {
        let store = Self::new();
        store.set_permission_schema(false);
        store.set_warehouse_schema(false);
        store
    }

    /// Toggles whether the permission extension probe succeeds.
    pub fn set_permission_schema(&self, present: bool) {
        self.permission_schema.store(present, Ordering::SeqCst);
    }

    /// Toggles whether the warehouse extension probe succeeds.
    pub fn set_warehouse_schema(&self, present: bool) {
        self.warehouse_schema.store(present, Ordering::SeqCst);
    }

    /// Makes every data read (not the probes) fail, simulating an
    /// unreachable database.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Adds a catalog entry.
    pub fn add_permission(&self, permission: Permission) {
        self.write(|t| t.permissions.push(permission));
    }

    /// Inserts or replaces the grant for (role, code).
    pub fn grant(&self, role: &str, code: &str, can_access: bool, is_visible: bool) {
        let grant = RoleGrant {
            role: RoleName::new(role),
            code: PermissionCode::new(code),
            can_access,
            is_visible,
        };
        self.write(|t| {
            t.grants
                .insert((grant.role.clone(), grant.code.clone()), grant);
        });
    }

    /// Inserts or replaces the override for (user, code).
    pub fn set_override(&self, user_id: UserId, code: &str, can_access: bool, is_visible: bool) {
        let ov = UserOverride {
            user_id,
            code: PermissionCode::new(code),
            can_access,
            is_visible,
        };
        self.write(|t| {
            t.overrides.insert((user_id, ov.code.clone()), ov);
        });
    }

    /// Removes the override for (user, code), if any.
    pub fn remove_override(&self, user_id: UserId, code: &str) {
        self.write(|t| {
            t.overrides.remove(&(user_id, PermissionCode::new(code)));
        });
    }

    /// Assigns a warehouse to a user.
    pub fn assign_warehouse(&self, user_id: UserId, warehouse_id: WarehouseId, is_default: bool) {
        self.write(|t| {
            t.assignments.insert(
                (user_id, warehouse_id),
                WarehouseAssignment {
                    user_id,
                    warehouse_id,
                    is_default,
                },
            );
        });
    }

    /// Removes every warehouse assignment of a user.
    pub fn clear_assignments(&self, user_id: UserId) {
        self.write(|t| t.assignments.retain(|(uid, _), _| *uid != user_id));
    }

    /// How many times each store has been read so far.
    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            permission_probes: self.calls.permission_probes.load(Ordering::SeqCst),
            warehouse_probes: self.calls.warehouse_probes.load(Ordering::SeqCst),
            role_grants: self.calls.role_grants.load(Ordering::SeqCst),
            user_overrides: self.calls.user_overrides.load(Ordering::SeqCst),
            warehouse_assignments: self.calls.warehouse_assignments.load(Ordering::SeqCst),
        }
    }

    fn write(&self, f: impl FnOnce(&mut Tables)) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        f(&mut tables);
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::store("memory store is unavailable"));
        }
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        Ok(f(&tables))
    }
}

#[async_trait]
impl AclStore for MemoryStore {
    async fn probe_permission_schema(&self) -> Result<()> {
        self.calls.permission_probes.fetch_add(1, Ordering::SeqCst);
        if self.permission_schema.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::SchemaUnavailable("role_permissions".into()))
        }
    }

    async fn probe_warehouse_schema(&self) -> Result<()> {
        self.calls.warehouse_probes.fetch_add(1, Ordering::SeqCst);
        if self.warehouse_schema.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::SchemaUnavailable("user_warehouses".into()))
        }
    }

    async fn permissions(&self) -> Result<Vec<Permission>> {
        self.read(|t| t.permissions.clone())
    }

    async fn role_grants(&self, role: &RoleName) -> Result<Vec<RoleGrant>> {
        self.calls.role_grants.fetch_add(1, Ordering::SeqCst);
        self.read(|t| {
            t.grants
                .values()
                .filter(|g| &g.role == role)
                .cloned()
                .collect()
        })
    }

    async fn user_overrides(&self, user_id: UserId) -> Result<Vec<UserOverride>> {
        self.calls.user_overrides.fetch_add(1, Ordering::SeqCst);
        self.read(|t| {
            t.overrides
                .values()
                .filter(|o| o.user_id == user_id)
                .cloned()
                .collect()
        })
    }

    async fn warehouse_assignments(&self, user_id: UserId) -> Result<Vec<WarehouseAssignment>> {
        self.calls.warehouse_assignments.fetch_add(1, Ordering::SeqCst);
        self.read(|t| {
            t.assignments
                .values()
                .filter(|a| a.user_id == user_id)
                .copied()
                .collect()
        })
    }
}
