//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Tunables of the permission engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
    /// How long a resolved permission map or warehouse scope is reused.
    pub cache_ttl_secs: u64,
    /// Maximum number of users cached per cache.
    pub cache_max_entries: u64,
    /// Whether concurrent cache misses for one user share a single
    /// resolution instead of each querying the stores.
    pub single_flight: bool,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            cache_max_entries: 10_000,
            single_flight: false,
        }
    }
}

impl AclConfig {
    /// Cache time-to-live as a `Duration`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_secs == 0 {
            return Err(Error::config("acl.cache_ttl_secs must be greater than 0"));
        }
        if self.cache_max_entries == 0 {
            return Err(Error::config("acl.cache_max_entries must be greater than 0"));
        }
        Ok(())
    }
}
