//! Authority records and the derived effective permission.
//!
//! Records are read-only from the engine's point of view: administrative
//! flows write them, the engine only resolves over them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{PermissionCode, RoleName, UserId, WarehouseId};

/// A grantable capability or UI-visible element in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable, globally unique code.
    pub code: PermissionCode,
    /// Grouping used by the administration UI (e.g. `inbound`).
    pub category: String,
    /// Human-readable label.
    pub display_name: String,
}

impl Permission {
    /// Creates a catalog entry.
    pub fn new(
        code: impl Into<PermissionCode>,
        category: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            category: category.into(),
            display_name: display_name.into(),
        }
    }
}

/// A verified caller identity, as established by upstream authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Authenticated user.
    pub user_id: UserId,
    /// Role carried in the session.
    pub role: RoleName,
    /// Warehouse baked into the session at login, if any.
    #[serde(default)]
    pub warehouse_id: Option<WarehouseId>,
}

impl Caller {
    /// Creates a caller without a session warehouse.
    pub fn new(user_id: UserId, role: impl Into<RoleName>) -> Self {
        Self {
            user_id,
            role: role.into(),
            warehouse_id: None,
        }
    }

    /// Sets the session warehouse.
    pub fn with_warehouse(mut self, warehouse_id: WarehouseId) -> Self {
        self.warehouse_id = Some(warehouse_id);
        self
    }
}

/// A role row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Database id.
    pub id: i64,
    /// Name carried in sessions.
    pub name: RoleName,
    /// Higher values outrank lower ones.
    pub priority: i32,
}

impl Role {
    /// Default priority of a built-in role name; custom roles rank lowest.
    pub fn builtin_priority(name: &RoleName) -> i32 {
        match name.as_str() {
            RoleName::SUPER_ADMIN => 100,
            RoleName::ADMIN => 90,
            RoleName::MANAGER => 70,
            RoleName::QC => 50,
            RoleName::OPERATOR => 40,
            RoleName::PICKER => 30,
            _ => 0,
        }
    }

    /// Whether this role outranks `other`.
    pub fn outranks(&self, other: &Role) -> bool {
        self.priority > other.priority
    }
}

/// A role's default decision for one permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    /// Role the grant belongs to.
    pub role: RoleName,
    /// Permission granted or denied.
    pub code: PermissionCode,
    /// Whether the role may use the capability.
    pub can_access: bool,
    /// Whether the element is shown in the UI.
    pub is_visible: bool,
}

/// A per-user exception that always wins over the role's grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOverride {
    /// User the override applies to.
    pub user_id: UserId,
    /// Permission overridden.
    pub code: PermissionCode,
    /// Whether the user may use the capability.
    pub can_access: bool,
    /// Whether the element is shown in the UI.
    pub is_visible: bool,
}

/// One entry of a user's warehouse allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseAssignment {
    /// Assigned user.
    pub user_id: UserId,
    /// Warehouse the user may access.
    pub warehouse_id: WarehouseId,
    /// Whether this is the user's default warehouse.
    pub is_default: bool,
}

/// Where an effective decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionSource {
    /// A user override.
    User,
    /// The role's default grant.
    Role,
    /// A bypass (super admin, or legacy schema).
    Legacy,
}

impl fmt::Display for PermissionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Role => write!(f, "role"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

/// The resolved decision for one (user, permission) pair. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermission {
    /// Permission the decision is about.
    pub code: PermissionCode,
    /// Whether the capability may be used.
    pub can_access: bool,
    /// Whether the element is shown in the UI.
    pub is_visible: bool,
    /// Which authority produced the decision.
    pub source: PermissionSource,
}

impl From<&RoleGrant> for EffectivePermission {
    fn from(grant: &RoleGrant) -> Self {
        Self {
            code: grant.code.clone(),
            can_access: grant.can_access,
            is_visible: grant.is_visible,
            source: PermissionSource::Role,
        }
    }
}

impl From<&UserOverride> for EffectivePermission {
    fn from(ov: &UserOverride) -> Self {
        Self {
            code: ov.code.clone(),
            can_access: ov.can_access,
            is_visible: ov.is_visible,
            source: PermissionSource::User,
        }
    }
}
