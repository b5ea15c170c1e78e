//! The authority stores the engine reads from.
//!
//! One trait covers the four stores (catalog, role grants, user overrides,
//! warehouse assignments) plus the two schema probes the capability
//! detector runs. Implementations must be point-query reads only: the engine
//! never writes through this trait.

use async_trait::async_trait;
use depot_core::{Permission, RoleGrant, RoleName, UserId, UserOverride, WarehouseAssignment};

use crate::Result;

/// Read access to every source of authority.
#[async_trait]
pub trait AclStore: Send + Sync + 'static {
    /// Succeeds when the extended permission schema (catalog + role grants +
    /// user overrides) is present and queryable.
    async fn probe_permission_schema(&self) -> Result<()>;

    /// Succeeds when the warehouse assignment table is present and queryable.
    ///
    /// Probed independently of [`probe_permission_schema`](Self::probe_permission_schema):
    /// a deployment may have warehouse scoping without the full permission
    /// extension, or the reverse.
    async fn probe_warehouse_schema(&self) -> Result<()>;

    /// All permissions in the catalog.
    async fn permissions(&self) -> Result<Vec<Permission>>;

    /// Every grant row for `role`.
    async fn role_grants(&self, role: &RoleName) -> Result<Vec<RoleGrant>>;

    /// Every override row for `user_id`.
    async fn user_overrides(&self, user_id: UserId) -> Result<Vec<UserOverride>>;

    /// Every warehouse assignment row for `user_id`.
    async fn warehouse_assignments(&self, user_id: UserId) -> Result<Vec<WarehouseAssignment>>;
}
