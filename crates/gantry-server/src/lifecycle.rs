//! Server lifecycle states.
//!
//! The server moves through a small state machine:
//!
//! ```text
//! Idle ──bind──▶ Running ──signal──▶ Draining ──drain ok──▶ Stopped
//!   │                │                   │
//!   │                └── listener fault ─┤
//!   └──────── bind failure ──────────────┴── grace expired ─▶ Failed
//! ```
//!
//! The state lives in a [`StateCell`] owned by the server and shared with
//! its signal watcher; there is no process-wide instance.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Observable lifecycle state of a [`Server`](crate::Server).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, not yet bound.
    Idle,
    /// Bound and accepting connections.
    Running,
    /// Termination signal observed; refusing new connections while in-flight
    /// requests finish.
    Draining,
    /// Terminal: drained cleanly.
    Stopped,
    /// Terminal: bind failure, listener fault, or forced stop after the
    /// grace window expired.
    Failed,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Draining,
            3 => Self::Stopped,
            4 => Self::Failed,
            _ => Self::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Draining => 2,
            Self::Stopped => 3,
            Self::Failed => 4,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Shared, atomically updated lifecycle state.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    /// Creates a cell in the [`LifecycleState::Idle`] state.
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(LifecycleState::Idle.as_u8())))
    }

    /// Returns the current state.
    pub(crate) fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Transitions to `state`, logging the transition.
    pub(crate) fn set(&self, state: LifecycleState) {
        let previous = self.0.swap(state.as_u8(), Ordering::SeqCst);
        tracing::debug!(
            from = %LifecycleState::from_u8(previous),
            to = %state,
            "lifecycle transition"
        );
    }
}
