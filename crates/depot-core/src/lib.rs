//! Depot Core: identifiers, authority records, and the permission catalog.
//!
//! This crate has no internal Depot dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`ids`]: `UserId`, `WarehouseId`, `PermissionCode`, `RoleName`
//! - [`model`]: grants, overrides, warehouse assignments, effective permissions
//! - [`catalog`]: the registry of grantable permission codes
//! - [`error`]: Error types and Result alias

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod ids;
pub mod model;

pub use catalog::PermissionCatalog;
pub use error::{Error, Result};
pub use ids::{PermissionCode, RoleName, UserId, WarehouseId};
pub use model::{
    Caller, EffectivePermission, Permission, PermissionSource, Role, RoleGrant, UserOverride,
    WarehouseAssignment,
};
