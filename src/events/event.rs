//! # Runtime events emitted by the supervisor and its triggers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Registry events**: records added or removed
//! - **Lifecycle events**: per-resource state transitions (starting, running, stopping, ...)
//! - **Shutdown events**: aggregate shutdown and the process-level triggers that start it
//! - **Subscriber events**: delivery problems inside the fan-out
//!
//! Each kind has a [`Severity`]. Guard-blocked operations are `Warn`; per-resource
//! failures during aggregate shutdown and hook faults are `Error`.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use resvisor::{Event, EventKind, ResourceState, Severity};
//!
//! let ev = Event::new(EventKind::TransitionIgnored)
//!     .with_resource("db")
//!     .with_state(ResourceState::Running)
//!     .with_reason("start ignored");
//!
//! assert_eq!(ev.kind.severity(), Severity::Warn);
//! assert_eq!(ev.resource.as_deref(), Some("db"));
//! assert_eq!(ev.state, Some(ResourceState::Running));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::Signal;
use crate::resources::ResourceState;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// How loudly an event should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine step inside a transition.
    Debug,
    /// Completed transition or shutdown milestone.
    Info,
    /// Ignored call or recoverable fault.
    Warn,
    /// Fault reported during shutdown or from a trigger.
    Error,
}

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registry events ===
    /// A record was created.
    ///
    /// Sets: `resource`, `timeout_ms` (resolved stop timeout).
    ResourceRegistered,

    /// A record was removed.
    ///
    /// Sets: `resource`.
    ResourceUnregistered,

    // === Lifecycle events ===
    /// Start callback about to run (state is now `Starting`).
    ///
    /// Sets: `resource`, `state`.
    ResourceStarting,

    /// Start callback returned an instance (state is now `Running`).
    ///
    /// Sets: `resource`, `state`.
    ResourceRunning,

    /// Stop callback about to run (state is now `Stopping`).
    ///
    /// Sets: `resource`, `state`, `timeout_ms`.
    ResourceStopping,

    /// Stop callback completed (state is now `Stopped`).
    ///
    /// Sets: `resource`, `state`.
    ResourceStopped,

    /// Start or stop faulted (state is now `Failed`).
    ///
    /// Sets: `resource`, `state`, `reason`.
    ResourceFailed,

    /// Stop callback lost the race against its timer.
    ///
    /// Always followed by `ResourceFailed`.
    ///
    /// Sets: `resource`, `timeout_ms`.
    StopTimeoutHit,

    /// Start/stop blocked by the state guard; the call was a no-op.
    ///
    /// Sets: `resource`, `state` (current), `reason` (which operation).
    TransitionIgnored,

    // === Shutdown events ===
    /// Aggregate shutdown began.
    ///
    /// Sets: `reason` (number of resources).
    ShutdownStarted,

    /// One resource failed to stop during aggregate shutdown.
    ///
    /// Sets: `resource`, `reason`.
    ShutdownStopFailed,

    /// Aggregate shutdown finished (every stop settled).
    ///
    /// Sets: `reason` (summary).
    ShutdownCompleted,

    /// A termination signal was received and shutdown is starting.
    ///
    /// Sets: `signal`.
    SignalReceived,

    /// An uncaught panic or unhandled error reached the fault trigger.
    ///
    /// Sets: `reason`.
    FaultCaptured,

    /// A pre-shutdown hook faulted; shutdown continues.
    ///
    /// Sets: `reason`, `signal` (for signal hooks).
    HookFailed,

    /// A trigger install was attempted twice.
    ///
    /// Sets: `reason` (trigger name).
    TriggerAlreadyInstalled,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `resource` (subscriber name), `reason`.
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `resource` (subscriber name), `reason`.
    SubscriberOverflow,
}

impl EventKind {
    /// Reporting level for this kind.
    pub fn severity(self) -> Severity {
        use EventKind::*;
        match self {
            ResourceRegistered | ResourceUnregistered | ResourceStarting | ResourceStopping => {
                Severity::Debug
            }
            ResourceRunning | ResourceStopped | ShutdownStarted | ShutdownCompleted
            | SignalReceived => Severity::Info,
            ResourceFailed | StopTimeoutHit | TransitionIgnored | TriggerAlreadyInstalled
            | SubscriberOverflow => Severity::Warn,
            ShutdownStopFailed | FaultCaptured | HookFailed | SubscriberPanicked => {
                Severity::Error
            }
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Resource id (or subscriber name for subscriber events).
    pub resource: Option<Arc<str>>,
    /// Resource state relevant to the event.
    pub state: Option<ResourceState>,
    /// Human-readable reason (errors, summaries, overflow details).
    pub reason: Option<Arc<str>>,
    /// Stop timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Termination signal, for trigger events.
    pub signal: Option<Signal>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            resource: None,
            state: None,
            reason: None,
            timeout_ms: None,
            signal: None,
        }
    }

    /// Attaches a resource id.
    #[inline]
    pub fn with_resource(mut self, id: impl Into<Arc<str>>) -> Self {
        self.resource = Some(id.into());
        self
    }

    /// Attaches a resource state.
    #[inline]
    pub fn with_state(mut self, state: ResourceState) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches a termination signal.
    #[inline]
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_resource(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_resource(subscriber)
            .with_reason(info)
    }

    /// Returns `true` if this event is about the given resource id.
    #[inline]
    pub fn is_for(&self, id: &str) -> bool {
        self.resource.as_deref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::ShutdownStarted);
        let b = Event::new(EventKind::ShutdownCompleted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_timeout_is_clamped() {
        let ev = Event::new(EventKind::StopTimeoutHit).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));

        let ev = Event::new(EventKind::StopTimeoutHit).with_timeout(Duration::from_millis(250));
        assert_eq!(ev.timeout_ms, Some(250));
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(EventKind::TransitionIgnored.severity(), Severity::Warn);
        assert_eq!(EventKind::ShutdownStopFailed.severity(), Severity::Error);
        assert_eq!(EventKind::HookFailed.severity(), Severity::Error);
        assert_eq!(EventKind::SignalReceived.severity(), Severity::Info);
        assert_eq!(EventKind::ResourceStarting.severity(), Severity::Debug);
    }

    #[test]
    fn test_is_for() {
        let ev = Event::new(EventKind::ResourceStopped).with_resource("db");
        assert!(ev.is_for("db"));
        assert!(!ev.is_for("cache"));
    }
}
