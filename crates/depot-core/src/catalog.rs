//! The permission catalog: every grantable code, grouped by category.
//!
//! The built-in catalog mirrors the seed data of the `permissions` table.
//! Deployments may extend it; the engine treats it as read-only.

use std::collections::BTreeMap;

use crate::ids::PermissionCode;
use crate::model::Permission;

/// Seed rows as `(code, category, display name)`.
const BUILTIN: &[(&str, &str, &str)] = &[
    ("view_dashboard", "dashboard", "View dashboard"),
    ("view_inbound", "inbound", "View inbound receipts"),
    ("create_inbound", "inbound", "Create inbound receipts"),
    ("edit_inbound", "inbound", "Edit inbound receipts"),
    ("delete_inbound", "inbound", "Delete inbound receipts"),
    ("upload_inbound", "inbound", "Bulk upload inbound receipts"),
    ("view_qc", "qc", "View quality control"),
    ("perform_qc", "qc", "Record QC results"),
    ("approve_qc", "qc", "Approve QC results"),
    ("view_picking", "picking", "View picking lists"),
    ("create_picking", "picking", "Create picking lists"),
    ("complete_picking", "picking", "Complete picking"),
    ("view_outbound", "outbound", "View outbound dispatches"),
    ("create_outbound", "outbound", "Create outbound dispatches"),
    ("edit_outbound", "outbound", "Edit outbound dispatches"),
    ("delete_outbound", "outbound", "Delete outbound dispatches"),
    ("view_master_data", "master_data", "View master data"),
    ("edit_master_data", "master_data", "Edit master data"),
    ("view_reports", "reports", "View reports"),
    ("export_reports", "reports", "Export reports"),
    ("manage_backups", "backups", "Create and restore backups"),
    ("manage_warehouses", "administration", "Manage warehouses"),
    ("manage_users", "administration", "Manage users"),
    ("manage_roles", "administration", "Manage roles and grants"),
];

/// An immutable registry of permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCatalog {
    entries: BTreeMap<PermissionCode, Permission>,
}

impl PermissionCatalog {
    /// The built-in logistics catalog.
    pub fn builtin() -> Self {
        Self::from_permissions(
            BUILTIN
                .iter()
                .map(|(code, category, name)| Permission::new(*code, *category, *name)),
        )
    }

    /// Builds a catalog from arbitrary rows. A later row with the same code
    /// replaces an earlier one.
    pub fn from_permissions(permissions: impl IntoIterator<Item = Permission>) -> Self {
        let entries = permissions
            .into_iter()
            .map(|p| (p.code.clone(), p))
            .collect();
        Self { entries }
    }

    /// Looks up a permission by code.
    pub fn get(&self, code: &str) -> Option<&Permission> {
        self.entries.get(code)
    }

    /// Whether `code` is registered.
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// All codes in lexical order.
    pub fn codes(&self) -> impl Iterator<Item = &PermissionCode> {
        self.entries.keys()
    }

    /// All permissions in code order.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.entries.values()
    }

    /// Permissions grouped by category.
    pub fn by_category(&self) -> BTreeMap<&str, Vec<&Permission>> {
        let mut groups: BTreeMap<&str, Vec<&Permission>> = BTreeMap::new();
        for p in self.entries.values() {
            groups.entry(p.category.as_str()).or_default().push(p);
        }
        groups
    }

    /// Number of registered permissions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
