//! Effective permission resolution.
//!
//! [`Resolution`] is the outcome of resolving one caller: either a bypass
//! that grants everything, or an explicit map merged from role grants and
//! user overrides. Codes absent from the explicit map are denied.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use depot_core::{
    EffectivePermission, PermissionCode, PermissionSource, RoleGrant, RoleName, UserOverride,
};
use serde::Serialize;

// ============================================================================
// EffectivePermissions
// ============================================================================

/// The merged, immutable permission map of one user under one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectivePermissions {
    role: RoleName,
    entries: BTreeMap<PermissionCode, EffectivePermission>,
}

impl EffectivePermissions {
    /// Merges role grants with user overrides. For every code present in
    /// either input the override, when present, wins.
    pub fn merge(role: RoleName, grants: &[RoleGrant], overrides: &[UserOverride]) -> Self {
        let mut entries: BTreeMap<PermissionCode, EffectivePermission> = grants
            .iter()
            .map(|g| (g.code.clone(), EffectivePermission::from(g)))
            .collect();
        for ov in overrides {
            entries.insert(ov.code.clone(), EffectivePermission::from(ov));
        }
        Self { role, entries }
    }

    /// Role the map was resolved under.
    pub fn role(&self) -> &RoleName {
        &self.role
    }

    /// The decision for `code`, if either store mentioned it.
    pub fn get(&self, code: &str) -> Option<&EffectivePermission> {
        self.entries.get(code)
    }

    /// Whether `code` resolves to `can_access = true`. Unknown codes are denied.
    pub fn can_access(&self, code: &str) -> bool {
        self.entries.get(code).is_some_and(|p| p.can_access)
    }

    /// Every decision, in code order.
    pub fn iter(&self) -> impl Iterator<Item = &EffectivePermission> {
        self.entries.values()
    }

    /// Codes whose UI element is visible.
    pub fn visible_codes(&self) -> impl Iterator<Item = &PermissionCode> {
        self.entries
            .values()
            .filter(|p| p.is_visible)
            .map(|p| &p.code)
    }

    /// Number of decisions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no decisions at all (everything denied).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Why a caller passes every permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bypass {
    /// `super_admin`, in any capability mode.
    SuperAdmin,
    /// `admin` while the permission schema is legacy.
    LegacyAdmin,
    /// Any authenticated user while the permission schema is legacy.
    LegacyUser,
}

impl fmt::Display for Bypass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "super_admin"),
            Self::LegacyAdmin => write!(f, "legacy_admin"),
            Self::LegacyUser => write!(f, "legacy_user"),
        }
    }
}

/// The resolved authority of one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Resolution {
    /// Every check passes.
    AllGranted(Bypass),
    /// Only codes resolving to `can_access = true` pass.
    Explicit(Arc<EffectivePermissions>),
}

impl Resolution {
    /// Whether `code` is granted.
    pub fn allows(&self, code: &str) -> bool {
        match self {
            Self::AllGranted(_) => true,
            Self::Explicit(map) => map.can_access(code),
        }
    }

    /// Whether at least one of `codes` is granted. An empty list is granted
    /// only under a bypass.
    pub fn allows_any<C: AsRef<str>>(&self, codes: &[C]) -> bool {
        match self {
            Self::AllGranted(_) => true,
            Self::Explicit(map) => codes.iter().any(|c| map.can_access(c.as_ref())),
        }
    }

    /// The subset of `codes` that is not granted, in input order.
    pub fn missing<'a, C: AsRef<str>>(&self, codes: &'a [C]) -> Vec<&'a C> {
        match self {
            Self::AllGranted(_) => Vec::new(),
            Self::Explicit(map) => codes
                .iter()
                .filter(|c| !map.can_access(c.as_ref()))
                .collect(),
        }
    }

    /// The effective decision for `code`, synthesized for bypasses.
    pub fn decision(&self, code: &str) -> EffectivePermission {
        match self {
            Self::AllGranted(_) => EffectivePermission {
                code: PermissionCode::new(code),
                can_access: true,
                is_visible: true,
                source: PermissionSource::Legacy,
            },
            Self::Explicit(map) => map.get(code).cloned().unwrap_or_else(|| EffectivePermission {
                code: PermissionCode::new(code),
                can_access: false,
                is_visible: false,
                source: PermissionSource::Role,
            }),
        }
    }

    /// The bypass in effect, if any.
    pub fn bypass(&self) -> Option<Bypass> {
        match self {
            Self::AllGranted(b) => Some(*b),
            Self::Explicit(_) => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
