//! # Resource lifecycle states.
//!
//! ```text
//!            start                ok
//!   Idle ───────────► Starting ──────► Running
//!    ▲                   │ err            │ stop
//!    │                   ▼                ▼
//!    │                 Failed ◄──────── Stopping ──► Stopped
//!    │                   │    err/timeout      ok       │
//!    │                   └── start / stop ──────────────┘
//! ```
//!
//! `Stopped` and `Failed` look terminal but both accept `start` again; there is
//! no permanently dead state.

use std::fmt;

/// Lifecycle state of a registered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Registered, never started.
    Idle,
    /// Start callback in flight.
    Starting,
    /// Start completed; instance available.
    Running,
    /// Stop callback in flight.
    Stopping,
    /// Stop completed.
    Stopped,
    /// Last start or stop faulted (or timed out).
    Failed,
}

impl ResourceState {
    /// Returns `true` if `start` may proceed from this state.
    #[inline]
    pub fn admits_start(self) -> bool {
        matches!(
            self,
            ResourceState::Idle | ResourceState::Stopped | ResourceState::Failed
        )
    }

    /// Returns `true` if `stop` may proceed from this state.
    #[inline]
    pub fn admits_stop(self) -> bool {
        matches!(self, ResourceState::Running | ResourceState::Failed)
    }

    /// Stable lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceState::Idle => "idle",
            ResourceState::Starting => "starting",
            ResourceState::Running => "running",
            ResourceState::Stopping => "stopping",
            ResourceState::Stopped => "stopped",
            ResourceState::Failed => "failed",
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
