//! # Process-level capabilities consumed by the termination triggers.
//!
//! The supervisor never touches global process state directly. Everything it
//! needs from the environment goes through a [`Host`]:
//! - a stream of termination signals,
//! - a stream of uncaught faults,
//! - the ability to terminate the process with an exit code.
//!
//! [`OsHost`] is the real implementation. Tests substitute their own.

use std::fmt;
use std::io;

use tokio::sync::mpsc;

use crate::core::runner;
use crate::core::shutdown::{self, Signal};
use crate::error::panic_message;

/// Origin of an uncaught fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// A panic that no one caught (main task or a detached task).
    UncaughtPanic,
    /// An error handed to [`Supervisor::report_unhandled`](crate::Supervisor::report_unhandled).
    Unhandled,
}

/// An uncaught program-level fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Where it came from.
    pub kind: FaultKind,
    /// Rendered message.
    pub message: String,
}

impl Fault {
    /// Creates a fault of the given kind.
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FaultKind::UncaughtPanic => write!(f, "uncaught panic: {}", self.message),
            FaultKind::Unhandled => write!(f, "unhandled error: {}", self.message),
        }
    }
}

/// Environment the termination triggers run against.
pub trait Host: Send + Sync + 'static {
    /// Subscribes to the given termination signals.
    fn signals(&self, signals: &[Signal]) -> io::Result<mpsc::UnboundedReceiver<Signal>>;

    /// Subscribes to uncaught faults.
    fn faults(&self) -> mpsc::UnboundedReceiver<Fault>;

    /// Terminates the process. The real host never returns.
    fn exit(&self, code: i32);
}

/// Host backed by the running OS process.
///
/// - signals: tokio signal listeners ([`shutdown::subscribe`])
/// - faults: a `std::panic` hook chained in front of the previous one
/// - exit: [`std::process::exit`]
#[derive(Debug, Default)]
pub struct OsHost;

impl OsHost {
    /// Creates the OS-backed host.
    pub fn new() -> Self {
        Self
    }
}

impl Host for OsHost {
    fn signals(&self, signals: &[Signal]) -> io::Result<mpsc::UnboundedReceiver<Signal>> {
        shutdown::subscribe(signals)
    }

    fn faults(&self) -> mpsc::UnboundedReceiver<Fault> {
        let (tx, rx) = mpsc::unbounded_channel();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            previous(info);
            if runner::is_contained() {
                return;
            }
            let mut message = panic_message(info.payload());
            if let Some(loc) = info.location() {
                message = format!("{message} at {}:{}", loc.file(), loc.line());
            }
            let _ = tx.send(Fault::new(FaultKind::UncaughtPanic, message));
        }));
        rx
    }

    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_display() {
        let f = Fault::new(FaultKind::Unhandled, "socket closed");
        assert_eq!(f.to_string(), "unhandled error: socket closed");
        let f = Fault::new(FaultKind::UncaughtPanic, "boom");
        assert_eq!(f.to_string(), "uncaught panic: boom");
    }
}
