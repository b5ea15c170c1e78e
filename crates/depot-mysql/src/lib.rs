//! Depot MySQL: the authority store backed by the WMS database.
//!
//! [`MySqlAclStore`] implements [`depot_acl::AclStore`] with point queries
//! against `permissions`, `role_permissions`, `user_permissions`, `roles`
//! and `user_warehouses`. Schema probes issue `SELECT 1 ... LIMIT 1` per
//! table; a missing table fails the probe and the engine degrades.
//!
//! The reference schema lives in `sql/schema.sql`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod config;
pub mod store;

pub use config::DatabaseConfig;
pub use store::MySqlAclStore;
