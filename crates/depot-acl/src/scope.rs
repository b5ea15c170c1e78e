//! Warehouse scope: which warehouses a caller may see or mutate.
//!
//! "No assignments" means [`WarehouseScope::Unrestricted`], never an empty
//! allow-list. The two are different variants so they cannot be confused.

use std::collections::BTreeSet;

use depot_core::{RoleName, WarehouseAssignment, WarehouseId};
use serde::Serialize;

// ============================================================================
// WarehouseScope
// ============================================================================

/// An explicit set of accessible warehouses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarehouseAllowList {
    ids: BTreeSet<WarehouseId>,
    default: Option<WarehouseId>,
}

impl WarehouseAllowList {
    /// Builds an allow-list; `default` is kept only if it is a member.
    pub fn new(ids: impl IntoIterator<Item = WarehouseId>, default: Option<WarehouseId>) -> Self {
        let ids: BTreeSet<WarehouseId> = ids.into_iter().collect();
        let default = default.filter(|d| ids.contains(d));
        Self { ids, default }
    }

    /// Whether `id` is allowed.
    pub fn contains(&self, id: WarehouseId) -> bool {
        self.ids.contains(&id)
    }

    /// Allowed ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = WarehouseId> + '_ {
        self.ids.iter().copied()
    }

    /// The assignment flagged as default, if any.
    pub fn default_warehouse(&self) -> Option<WarehouseId> {
        self.default
    }

    /// Number of allowed warehouses.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is allowed.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// The warehouses a caller may access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "allow", rename_all = "snake_case")]
pub enum WarehouseScope {
    /// Every warehouse.
    Unrestricted,
    /// Only the listed warehouses.
    Restricted(WarehouseAllowList),
}

impl WarehouseScope {
    /// Scope from stored assignment rows.
    ///
    /// `super_admin` is always unrestricted. Any other role with zero rows is
    /// unrestricted too; rows, when present, form the allow-list.
    pub fn from_assignments(role: &RoleName, rows: &[WarehouseAssignment]) -> Self {
        if role.is_super_admin() || rows.is_empty() {
            return Self::Unrestricted;
        }
        let default = rows.iter().find(|r| r.is_default).map(|r| r.warehouse_id);
        Self::Restricted(WarehouseAllowList::new(
            rows.iter().map(|r| r.warehouse_id),
            default,
        ))
    }

    /// Scope for deployments without the assignment table: the warehouse
    /// baked into the session, or nothing.
    pub fn from_session(role: &RoleName, session: Option<WarehouseId>) -> Self {
        if role.is_super_admin() {
            return Self::Unrestricted;
        }
        Self::Restricted(WarehouseAllowList::new(session, session))
    }

    /// Whether `id` is accessible.
    pub fn allows(&self, id: WarehouseId) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Restricted(list) => list.contains(id),
        }
    }

    /// Whether this is the unrestricted scope.
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }

    /// `None` when unrestricted, otherwise the explicit allow-list.
    pub fn accessible(&self) -> Option<Vec<WarehouseId>> {
        match self {
            Self::Unrestricted => None,
            Self::Restricted(list) => Some(list.ids().collect()),
        }
    }

    /// The warehouse a caller works in by default.
    ///
    /// The session warehouse wins when it is accessible; otherwise the
    /// assignment flagged default, otherwise the lowest allowed id.
    pub fn default_warehouse(&self, session: Option<WarehouseId>) -> Option<WarehouseId> {
        match self {
            Self::Unrestricted => session,
            Self::Restricted(list) => session
                .filter(|s| list.contains(*s))
                .or(list.default_warehouse())
                .or_else(|| list.ids().next()),
        }
    }

    /// A predicate description for scoping queries on `column`.
    pub fn filter(&self, column: &str) -> WarehouseFilter {
        match self {
            Self::Unrestricted => WarehouseFilter::Unrestricted,
            Self::Restricted(list) => WarehouseFilter::In {
                column: column.to_string(),
                ids: list.ids().collect(),
            },
        }
    }
}

// ============================================================================
// WarehouseFilter
// ============================================================================

/// A ready-to-use scoping predicate for downstream data queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarehouseFilter {
    /// Apply no warehouse predicate.
    Unrestricted,
    /// Restrict `column` to `ids`.
    In {
        /// Column holding the warehouse id.
        column: String,
        /// Allowed ids.
        ids: Vec<WarehouseId>,
    },
}

/// A parameterized SQL fragment with its bind values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlPredicate {
    /// Fragment using `?` placeholders.
    pub clause: String,
    /// Values for the placeholders, in order.
    pub params: Vec<i64>,
}

impl WarehouseFilter {
    /// Renders the filter as a `WHERE`-clause fragment, or `None` when no
    /// predicate applies. An empty allow-list renders as an always-false
    /// predicate so it can never widen to "all rows".
    pub fn to_sql(&self) -> Option<SqlPredicate> {
        match self {
            Self::Unrestricted => None,
            Self::In { ids, .. } if ids.is_empty() => Some(SqlPredicate {
                clause: "1 = 0".to_string(),
                params: Vec::new(),
            }),
            Self::In { column, ids } => {
                let placeholders = vec!["?"; ids.len()].join(", ");
                Some(SqlPredicate {
                    clause: format!("{column} IN ({placeholders})"),
                    params: ids.iter().map(|id| id.get()).collect(),
                })
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
