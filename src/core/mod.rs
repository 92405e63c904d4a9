//! Runtime core: registry, lifecycle and termination.
//!
//! The only entry point from this module is [`Supervisor`] (built through
//! [`SupervisorBuilder`]), which tracks resources, drives their lifecycle and
//! tears them down on demand or on process termination.
//!
//! Internal modules:
//! - [`registry`]: records and atomic state-machine gating;
//! - [`runner`]: runs callbacks with panic containment and the stop timeout race;
//! - [`supervisor`]: lifecycle operations and aggregate shutdown;
//! - [`triggers`]: signal and fault triggers wired to aggregate shutdown;
//! - [`host`]: process-level capabilities (signals, faults, exit);
//! - [`shutdown`]: cross-platform termination signal handling.

mod builder;
mod config;
mod host;
mod registry;
pub(crate) mod runner;
mod shutdown;
mod supervisor;
mod triggers;

pub use builder::SupervisorBuilder;
pub use config::{SignalHandling, SupervisorConfig};
pub use host::{Fault, FaultKind, Host, OsHost};
pub use shutdown::Signal;
pub use supervisor::{ShutdownReport, Supervisor};
