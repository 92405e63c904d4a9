//! # LogWriter - renders events through `tracing`
//!
//! A subscriber that turns every [`Event`] into a `tracing` record at the
//! event's [`Severity`]. Install any `tracing` subscriber (e.g.
//! `tracing-subscriber` with an env filter) to see the output.
//!
//! ## Example output
//! ```text
//! DEBUG resvisor: starting resource="db"
//!  INFO resvisor: running resource="db"
//!  WARN resvisor: transition ignored resource="db" state=running reason="start ignored"
//!  INFO resvisor: signal received signal=SIGTERM
//! ERROR resvisor: shutdown stop failed resource="db" reason="timed out after 5s"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind, Severity};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Short human label for each kind.
fn label(kind: EventKind) -> &'static str {
    match kind {
        EventKind::ResourceRegistered => "registered",
        EventKind::ResourceUnregistered => "unregistered",
        EventKind::ResourceStarting => "starting",
        EventKind::ResourceRunning => "running",
        EventKind::ResourceStopping => "stopping",
        EventKind::ResourceStopped => "stopped",
        EventKind::ResourceFailed => "failed",
        EventKind::StopTimeoutHit => "stop timeout",
        EventKind::TransitionIgnored => "transition ignored",
        EventKind::ShutdownStarted => "shutdown started",
        EventKind::ShutdownStopFailed => "shutdown stop failed",
        EventKind::ShutdownCompleted => "shutdown completed",
        EventKind::SignalReceived => "signal received",
        EventKind::FaultCaptured => "fault captured",
        EventKind::HookFailed => "hook failed",
        EventKind::TriggerAlreadyInstalled => "trigger already installed",
        EventKind::SubscriberPanicked => "subscriber panicked",
        EventKind::SubscriberOverflow => "subscriber overflow",
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let msg = label(e.kind);
        let resource = e.resource.as_deref();
        let state = e.state.map(|s| s.as_str());
        let reason = e.reason.as_deref();
        let signal = e.signal.map(|s| s.as_str());

        macro_rules! emit {
            ($level:ident) => {
                tracing::$level!(
                    target: "resvisor",
                    seq = e.seq,
                    resource,
                    state,
                    reason,
                    timeout_ms = e.timeout_ms,
                    signal,
                    "{msg}"
                )
            };
        }

        match e.kind.severity() {
            Severity::Debug => emit!(debug),
            Severity::Info => emit!(info),
            Severity::Warn => emit!(warn),
            Severity::Error => emit!(error),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
