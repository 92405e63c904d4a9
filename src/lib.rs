//! # resvisor
//!
//! **Resvisor** is a lifecycle supervisor for named, long-lived resources
//! (child processes, servers, connection pools) inside a tokio application.
//!
//! Each resource is registered under a unique id with a start and a stop
//! callback. The supervisor drives every resource through a guarded state
//! machine, bounds each stop with a timeout, tears everything down
//! concurrently on demand, and can turn termination signals and uncaught
//! panics into an orderly shutdown followed by process exit.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ ResourceSpec │   │ ResourceSpec │   │ ResourceSpec │
//!     │ (start/stop) │   │ (start/stop) │   │ (start/stop) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ register(id)     ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - Registry (records by id, atomic guards)                        │
//! │  - runner (panic containment, stop timeout race)                  │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────────────────────────────────┬─────────────┘
//!        │ publishes                                    ▲
//!        ▼                                              │ shutdown_all()
//! ┌──────────────────────────────┐        ┌─────────────┴─────────────┐
//! │  Bus (broadcast channel)     │        │  Termination triggers     │
//! │  capacity: bus_capacity      │        │  - signal (SIGINT/SIGTERM)│
//! └──────────────┬───────────────┘        │  - fault (uncaught panic) │
//!                ▼                        │  ─► Host::exit(code)      │
//!       ┌────────────────────┐            └───────────────────────────┘
//!       │ subscriber_listener│
//!       └─────────┬──────────┘
//!       ┌─────────┼─────────┐
//!       ▼         ▼         ▼
//!   LogWriter  metrics   custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! register ──► Idle
//!
//! start:  Idle | Stopped | Failed ──► Starting ──► Running   (instance stored)
//!                                             └──► Failed    (error stored, re-raised)
//! stop:   Running | Failed        ──► Stopping ──► Stopped
//!                                             └──► Failed    (error or timeout, re-raised)
//!
//! start while Starting/Stopping/Running  ─► warning, no-op
//! stop  while Starting/Stopping/Stopped  ─► warning, no-op
//! stop  while Idle                       ─► silent no-op
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                          |
//! |-------------------|------------------------------------------------------------------|---------------------------------------------|
//! | **Resources**     | Define resources as closures or trait impls.                     | [`Resource`], [`ResourceFn`], [`ResourceSpec`] |
//! | **Supervision**   | Register, start, stop, and shut down resources by id.            | [`Supervisor`], [`ResourceState`]           |
//! | **Termination**   | Signal and fault triggers with pre-shutdown hooks.               | [`SignalHandling`], [`Host`], [`Fault`]     |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).           | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors; the callback's original error is kept.             | [`SupervisorError`], [`ResourceError`]      |
//! | **Configuration** | Default stop timeout, trigger selection, bus size.               | [`SupervisorConfig`]                        |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], which renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use resvisor::{ResourceFn, ResourceSpec, Supervisor, SupervisorConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn resvisor::Subscribe>> = vec![Arc::new(resvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn resvisor::Subscribe>> = Vec::new();
//!
//!     // Triggers are disabled here; a real service keeps the defaults.
//!     let sup = Supervisor::builder(SupervisorConfig::without_triggers())
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     let pool = ResourceFn::arc(
//!         || async { Ok::<_, std::io::Error>(vec!["conn-1", "conn-2"]) },
//!         |conns: Option<Arc<Vec<&'static str>>>| async move {
//!             println!("closing {} connections", conns.map_or(0, |c| c.len()));
//!             Ok::<_, std::io::Error>(())
//!         },
//!     );
//!     sup.register("pool", ResourceSpec::new(pool).with_timeout(Duration::from_secs(2)))
//!         .await?;
//!
//!     sup.start("pool").await?;
//!     let report = sup.shutdown_all().await;
//!     assert_eq!(report.exit_code(), 0);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod resources;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    Fault, FaultKind, Host, OsHost, ShutdownReport, Signal, SignalHandling, Supervisor,
    SupervisorBuilder, SupervisorConfig,
};
pub use error::{BoxError, ResourceError, SupervisorError};
pub use events::{Event, EventKind, Severity};
pub use resources::{Instance, Resource, ResourceFn, ResourceRef, ResourceSpec, ResourceState};
pub use subscribers::{Subscribe, SubscriberSet};

// Built-in `tracing` subscriber.
// Disable with: `default-features = false`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
