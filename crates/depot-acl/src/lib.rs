//! Depot ACL: effective permission resolution and warehouse scoping.
//!
//! The engine answers two questions for an authenticated caller: which
//! permission codes does this user hold, and which warehouses may this user
//! touch. It adapts to the schema generation of the underlying store
//! (legacy or full) and caches resolved answers per user for a short TTL.
//!
//! # Modules
//!
//! - [`engine`]: [`AclEngine`], the entry point shared by request handlers
//! - [`capability`]: one-shot schema capability detection
//! - [`cache`]: time-bounded per-user caches
//! - [`resolution`]: merging role grants with user overrides
//! - [`scope`]: warehouse allow-lists and query filters
//! - [`store`]: the [`AclStore`] trait
//! - [`memory_store`]: an in-memory store for development and tests
//! - [`config`]: engine tunables
//! - [`error`]: Error types and Result alias

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory_store;
pub mod resolution;
pub mod scope;
pub mod store;

#[cfg(test)]
mod proptests;

pub use cache::{CacheStats, ExpiringCache, PermissionCache};
pub use capability::{Capabilities, CapabilityDetector, CapabilityMode, CapabilityState};
pub use config::AclConfig;
pub use engine::{AclEngine, PermissionCheck};
pub use error::{Error, Result};
pub use memory_store::{MemoryStore, StoreCalls};
pub use resolution::{Bypass, EffectivePermissions, Resolution};
pub use scope::{SqlPredicate, WarehouseAllowList, WarehouseFilter, WarehouseScope};
pub use store::AclStore;
