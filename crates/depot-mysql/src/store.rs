//! [`AclStore`] over a MySQL connection pool.

use async_trait::async_trait;
use depot_acl::{AclStore, Error, Result};
use depot_core::{
    Permission, PermissionCode, RoleGrant, RoleName, UserId, UserOverride, WarehouseAssignment,
    WarehouseId,
};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

use crate::config::DatabaseConfig;

/// Tables that make up the extended permission schema.
const PERMISSION_TABLES: [&str; 4] = ["permissions", "roles", "role_permissions", "user_permissions"];

/// Table holding per-user warehouse assignments.
const WAREHOUSE_TABLE: &str = "user_warehouses";

const SELECT_PERMISSIONS: &str = "SELECT code, category, name FROM permissions ORDER BY category, code";

const SELECT_ROLE_GRANTS: &str = "SELECT p.code, rp.can_access, rp.is_visible \
     FROM role_permissions rp \
     JOIN roles r ON r.id = rp.role_id \
     JOIN permissions p ON p.id = rp.permission_id \
     WHERE r.name = ?";

const SELECT_USER_OVERRIDES: &str = "SELECT p.code, up.can_access, up.is_visible \
     FROM user_permissions up \
     JOIN permissions p ON p.id = up.permission_id \
     WHERE up.user_id = ?";

const SELECT_WAREHOUSE_ASSIGNMENTS: &str =
    "SELECT warehouse_id, is_default FROM user_warehouses WHERE user_id = ? ORDER BY warehouse_id";

/// Authority store reading the WMS MySQL schema.
#[derive(Clone, Debug)]
pub struct MySqlAclStore {
    pool: MySqlPool,
}

impl MySqlAclStore {
    /// Wraps an existing pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Opens a pool from configuration.
    ///
    /// The pool connects lazily, so an unreachable database surfaces on the
    /// first read rather than here.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self> {
        log::info!("Connecting to {}", config.redacted_url());
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_lazy(&config.url)
            .map_err(|e| Error::store_with_source("invalid database url", e))?;
        Ok(Self::new(pool))
    }

    /// The underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn probe_table(&self, table: &str) -> Result<()> {
        let sql = format!("SELECT 1 FROM {table} LIMIT 1");
        sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| Error::SchemaUnavailable(format!("{table}: {e}")))
    }
}

impl MySqlAclStore {
    async fn probe_query<T>(&self, what: &str, select: &str, param: T) -> Result<()>
    where
        T: for<'q> sqlx::Encode<'q, sqlx::MySql> + sqlx::Type<sqlx::MySql> + Send + 'static,
    {
        let sql = format!("{select} LIMIT 1");
        sqlx::query(&sql)
            .bind(param)
            .fetch_optional(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| Error::SchemaUnavailable(format!("{what} query: {e}")))
    }
}

fn read_error(what: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::store_with_source(format!("failed to read {what}"), e)
}

#[async_trait]
impl AclStore for MySqlAclStore {
    async fn probe_permission_schema(&self) -> Result<()> {
        for table in PERMISSION_TABLES {
            self.probe_table(table).await?;
        }
        // the reads resolution runs must work too, joins and columns included
        self.probe_query("role grants", SELECT_ROLE_GRANTS, "").await?;
        self.probe_query("user overrides", SELECT_USER_OVERRIDES, 0_i64).await
    }

    async fn probe_warehouse_schema(&self) -> Result<()> {
        self.probe_table(WAREHOUSE_TABLE).await
    }

    async fn permissions(&self) -> Result<Vec<Permission>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(SELECT_PERMISSIONS)
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("permission catalog"))?;
        Ok(rows
            .into_iter()
            .map(|(code, category, name)| Permission::new(code, category, name))
            .collect())
    }

    async fn role_grants(&self, role: &RoleName) -> Result<Vec<RoleGrant>> {
        let rows: Vec<(String, bool, bool)> = sqlx::query_as(SELECT_ROLE_GRANTS)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("role grants"))?;
        log::trace!("{} grant rows for role {role}", rows.len());
        Ok(rows
            .into_iter()
            .map(|(code, can_access, is_visible)| RoleGrant {
                role: role.clone(),
                code: PermissionCode::new(code),
                can_access,
                is_visible,
            })
            .collect())
    }

    async fn user_overrides(&self, user_id: UserId) -> Result<Vec<UserOverride>> {
        let rows: Vec<(String, bool, bool)> = sqlx::query_as(SELECT_USER_OVERRIDES)
            .bind(user_id.get())
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("user overrides"))?;
        Ok(rows
            .into_iter()
            .map(|(code, can_access, is_visible)| UserOverride {
                user_id,
                code: PermissionCode::new(code),
                can_access,
                is_visible,
            })
            .collect())
    }

    async fn warehouse_assignments(&self, user_id: UserId) -> Result<Vec<WarehouseAssignment>> {
        let rows: Vec<(i64, bool)> = sqlx::query_as(SELECT_WAREHOUSE_ASSIGNMENTS)
            .bind(user_id.get())
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("warehouse assignments"))?;
        Ok(rows
            .into_iter()
            .map(|(warehouse_id, is_default)| WarehouseAssignment {
                user_id,
                warehouse_id: WarehouseId::new(warehouse_id),
                is_default,
            })
            .collect())
    }
}
