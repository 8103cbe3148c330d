//! Readiness gating for gesture-gated audio start.
//!
//! Some host platforms refuse to run audio until a user gesture unlocks the
//! context. The engine models that as a [`ReadinessGate`] capability it
//! polls; on platforms without the restriction [`AlwaysReady`] makes the
//! gate a no-op.

use crate::lockfree::AtomicFlag;
use tracing::debug;

/// Capability describing whether the processing context may run yet.
pub trait ReadinessGate: Send + Sync {
    /// Attempt to bring the context to a running state. Returns the
    /// readiness after the attempt; safe to call repeatedly.
    fn try_unlock(&self) -> bool;

    /// Current readiness without attempting an unlock.
    fn is_ready(&self) -> bool;
}

/// Gate for platforms without gesture restrictions: always open.
#[derive(Debug, Default)]
pub struct AlwaysReady;

impl ReadinessGate for AlwaysReady {
    fn try_unlock(&self) -> bool {
        true
    }

    fn is_ready(&self) -> bool {
        true
    }
}

/// Externally driven gate: stays closed until the host observes the
/// unlocking user gesture and calls [`ManualGate::open`].
#[derive(Debug, Default)]
pub struct ManualGate {
    open: AtomicFlag,
}

impl ManualGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        self.open.set(true);
        debug!("readiness gate opened");
    }
}

impl ReadinessGate for ManualGate {
    fn try_unlock(&self) -> bool {
        self.open.get()
    }

    fn is_ready(&self) -> bool {
        self.open.get()
    }
}
