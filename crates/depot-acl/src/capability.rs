//! One-shot detection of which schema generation the store speaks.
//!
//! Provides [`CapabilityDetector`], owned by a single engine instance, which
//! walks `Unknown → Probing → Resolved` at most once until [`reset`] puts it
//! back to `Unknown`. Probe failures are never errors: a failed permission
//! probe means legacy mode, a failed warehouse probe means session-only
//! warehouse scoping.
//!
//! [`reset`]: CapabilityDetector::reset

use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::AclStore;

// ============================================================================
// Capabilities
// ============================================================================

/// Which permission schema generation is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityMode {
    /// Only the coarse legacy role model exists.
    Legacy,
    /// Role grants, user overrides, and the catalog are queryable.
    Full,
}

impl fmt::Display for CapabilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// The two independently probed schema capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Permission schema generation.
    pub permissions: CapabilityMode,
    /// Whether per-user warehouse assignments are queryable.
    pub warehouse_scoping: bool,
}

impl Capabilities {
    /// Nothing beyond the legacy schema.
    pub const LEGACY: Capabilities = Capabilities {
        permissions: CapabilityMode::Legacy,
        warehouse_scoping: false,
    };

    /// Every extension present.
    pub const FULL: Capabilities = Capabilities {
        permissions: CapabilityMode::Full,
        warehouse_scoping: true,
    };

    /// Whether the permission schema is in legacy mode.
    pub fn is_legacy(&self) -> bool {
        self.permissions == CapabilityMode::Legacy
    }
}

// ============================================================================
// CapabilityState
// ============================================================================

/// Lifecycle of capability detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CapabilityState {
    /// Nothing probed yet, or reset by a full cache clear.
    Unknown,
    /// A probe is in flight.
    Probing {
        /// When probing began.
        since: DateTime<Utc>,
    },
    /// Detection finished; terminal until reset.
    Resolved {
        /// What was found.
        capabilities: Capabilities,
        /// When detection finished.
        resolved_at: DateTime<Utc>,
    },
}

impl CapabilityState {
    /// The detected capabilities, if detection has finished.
    pub fn capabilities(&self) -> Option<Capabilities> {
        match self {
            Self::Resolved { capabilities, .. } => Some(*capabilities),
            _ => None,
        }
    }
}

impl fmt::Display for CapabilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Probing { .. } => write!(f, "probing"),
            Self::Resolved { capabilities, .. } => write!(
                f,
                "{} (warehouse scoping: {})",
                capabilities.permissions,
                if capabilities.warehouse_scoping { "on" } else { "off" }
            ),
        }
    }
}

// ============================================================================
// CapabilityDetector
// ============================================================================

/// Memoized schema capability detection.
///
/// Concurrent callers that arrive while a probe is in flight wait for it and
/// share its outcome. A [`reset`](Self::reset) that races an in-flight probe
/// wins: the probe's result is returned to its waiters but not memoized.
pub struct CapabilityDetector {
    state: RwLock<CapabilityState>,
    probe_gate: tokio::sync::Mutex<()>,
    generation: AtomicU64,
}

impl Default for CapabilityDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityDetector {
    /// A detector in the `Unknown` state.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CapabilityState::Unknown),
            probe_gate: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> CapabilityState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Returns memoized capabilities, probing the store on first use.
    pub async fn detect(&self, store: &dyn AclStore) -> Capabilities {
        if let Some(caps) = self.state().capabilities() {
            return caps;
        }

        let _gate = self.probe_gate.lock().await;
        if let Some(caps) = self.state().capabilities() {
            return caps;
        }

        let generation = self.begin_probe();

        let (permissions, warehouses) = tokio::join!(
            store.probe_permission_schema(),
            store.probe_warehouse_schema()
        );

        let mode = match permissions {
            Ok(()) => CapabilityMode::Full,
            Err(e) => {
                log::warn!("Permission schema unavailable, using legacy mode: {e}");
                CapabilityMode::Legacy
            }
        };
        let warehouse_scoping = match warehouses {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Warehouse assignments unavailable, using session warehouse: {e}");
                false
            }
        };
        let caps = Capabilities {
            permissions: mode,
            warehouse_scoping,
        };

        if self.finish_probe(generation, caps) {
            log::info!(
                "Capabilities detected: permissions={mode}, warehouse_scoping={warehouse_scoping}"
            );
        } else {
            log::debug!("Capability reset raced an in-flight probe; result not memoized");
        }

        caps
    }

    /// Pins the capabilities without probing.
    pub fn force(&self, capabilities: Capabilities) {
        log::info!(
            "Capabilities forced: permissions={}, warehouse_scoping={}",
            capabilities.permissions,
            capabilities.warehouse_scoping
        );
        self.transition(CapabilityState::Resolved {
            capabilities,
            resolved_at: Utc::now(),
        });
    }

    /// Forgets detected capabilities; the next [`detect`](Self::detect) probes again.
    pub fn reset(&self) {
        self.transition(CapabilityState::Unknown);
    }

    // The generation only changes while the state lock is held, so a
    // detection never overwrites a reset or force that happened after it began.

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, CapabilityState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn begin_probe(&self) -> u64 {
        let mut state = self.write_state();
        *state = CapabilityState::Probing { since: Utc::now() };
        self.generation.load(Ordering::SeqCst)
    }

    fn finish_probe(&self, generation: u64, capabilities: Capabilities) -> bool {
        let mut state = self.write_state();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        *state = CapabilityState::Resolved {
            capabilities,
            resolved_at: Utc::now(),
        };
        true
    }

    fn transition(&self, next: CapabilityState) {
        let mut state = self.write_state();
        self.generation.fetch_add(1, Ordering::SeqCst);
        *state = next;
    }
}

impl fmt::Debug for CapabilityDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityDetector")
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
