//! Strong-typed identifiers shared by every Depot crate.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

// ============================================================================
// Numeric ids
// ============================================================================

/// Identifier of an authenticated user (the `users.id` primary key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wraps a raw database id.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw database id.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier of a warehouse (the `warehouses.id` primary key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseId(i64);

impl WarehouseId {
    /// Wraps a raw database id.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw database id.
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Parses a warehouse id from request text, ignoring surrounding whitespace.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        raw.trim()
            .parse()
            .map(Self)
            .map_err(|_| crate::Error::invalid_id("warehouse id", raw))
    }
}

impl fmt::Display for WarehouseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for WarehouseId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for WarehouseId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

// ============================================================================
// String ids
// ============================================================================

/// Stable, globally unique identifier of a grantable capability or UI element.
///
/// Examples: `view_qc`, `delete_inbound`, `manage_users`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionCode(String);

impl PermissionCode {
    /// Creates a permission code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PermissionCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl From<String> for PermissionCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl Borrow<str> for PermissionCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PermissionCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name of a role as carried in the caller's session (e.g. `operator`).
///
/// Built-in names are exposed as constants; any other string is a custom role
/// defined by an operator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(String);

impl RoleName {
    /// Highest-privilege role; bypasses every check.
    pub const SUPER_ADMIN: &'static str = "super_admin";
    /// Administrator; unrestricted by default and bypasses checks in legacy mode.
    pub const ADMIN: &'static str = "admin";
    /// Warehouse manager.
    pub const MANAGER: &'static str = "manager";
    /// Floor operator.
    pub const OPERATOR: &'static str = "operator";
    /// Quality-control inspector.
    pub const QC: &'static str = "qc";
    /// Picker.
    pub const PICKER: &'static str = "picker";

    /// Creates a role name. Surrounding whitespace is trimmed and the name is
    /// lower-cased so `Admin` and `admin` compare equal.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_ascii_lowercase())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the `super_admin` role.
    pub fn is_super_admin(&self) -> bool {
        self.0 == Self::SUPER_ADMIN
    }

    /// Whether this is the `admin` role (not `super_admin`).
    pub fn is_admin(&self) -> bool {
        self.0 == Self::ADMIN
    }

    /// Whether this is one of the built-in roles.
    pub fn is_builtin(&self) -> bool {
        matches!(
            self.0.as_str(),
            Self::SUPER_ADMIN | Self::ADMIN | Self::MANAGER | Self::OPERATOR | Self::QC | Self::PICKER
        )
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoleName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RoleName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
