//! Property-based tests for resolution and warehouse scoping.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use depot_core::{
        PermissionCode, PermissionSource, RoleGrant, RoleName, UserId, UserOverride,
        WarehouseAssignment, WarehouseId,
    };
    use proptest::prelude::*;

    use crate::resolution::EffectivePermissions;
    use crate::scope::WarehouseScope;

    fn code_strategy() -> impl Strategy<Value = String> {
        prop::sample::select(vec![
            "view_inbound",
            "edit_inbound",
            "view_qc",
            "approve_qc",
            "view_picking",
            "manage_users",
        ])
        .prop_map(str::to_string)
    }

    fn rows_strategy() -> impl Strategy<Value = Vec<(String, bool, bool)>> {
        prop::collection::vec((code_strategy(), any::<bool>(), any::<bool>()), 0..8)
    }

    proptest! {
        #[test]
        fn test_override_always_wins(grants in rows_strategy(), overrides in rows_strategy()) {
            let role = RoleName::new("operator");
            let grants: Vec<RoleGrant> = grants
                .into_iter()
                .map(|(code, can_access, is_visible)| RoleGrant {
                    role: role.clone(),
                    code: PermissionCode::new(code),
                    can_access,
                    is_visible,
                })
                .collect();
            let overrides: Vec<UserOverride> = overrides
                .into_iter()
                .map(|(code, can_access, is_visible)| UserOverride {
                    user_id: UserId::new(1),
                    code: PermissionCode::new(code),
                    can_access,
                    is_visible,
                })
                .collect();

            let map = EffectivePermissions::merge(role, &grants, &overrides);

            // later rows replace earlier ones for the same code
            let last_override: BTreeMap<&str, &UserOverride> =
                overrides.iter().map(|o| (o.code.as_str(), o)).collect();
            let last_grant: BTreeMap<&str, &RoleGrant> =
                grants.iter().map(|g| (g.code.as_str(), g)).collect();

            for (code, ov) in &last_override {
                let decided = map.get(code).unwrap();
                prop_assert_eq!(decided.can_access, ov.can_access);
                prop_assert_eq!(decided.is_visible, ov.is_visible);
                prop_assert_eq!(decided.source, PermissionSource::User);
            }
            for (code, grant) in &last_grant {
                if !last_override.contains_key(code) {
                    let decided = map.get(code).unwrap();
                    prop_assert_eq!(decided.can_access, grant.can_access);
                    prop_assert_eq!(decided.source, PermissionSource::Role);
                }
            }
            prop_assert_eq!(
                map.len(),
                last_grant.keys().chain(last_override.keys()).collect::<std::collections::BTreeSet<_>>().len()
            );
        }

        #[test]
        fn test_zero_assignments_never_restrict(role in "[a-z_]{1,16}", probe in any::<i64>()) {
            let scope = WarehouseScope::from_assignments(&RoleName::new(role), &[]);
            prop_assert!(scope.allows(WarehouseId::new(probe)));
        }

        #[test]
        fn test_assignments_restrict_exactly(
            ids in prop::collection::btree_set(1i64..50, 1..6),
            probe in 1i64..50,
        ) {
            let rows: Vec<WarehouseAssignment> = ids
                .iter()
                .map(|id| WarehouseAssignment {
                    user_id: UserId::new(1),
                    warehouse_id: WarehouseId::new(*id),
                    is_default: false,
                })
                .collect();
            let scope = WarehouseScope::from_assignments(&RoleName::new("operator"), &rows);
            prop_assert_eq!(scope.allows(WarehouseId::new(probe)), ids.contains(&probe));

            let super_admin = WarehouseScope::from_assignments(&RoleName::new("super_admin"), &rows);
            prop_assert!(super_admin.allows(WarehouseId::new(probe)));
        }
    }
}
