//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the supervisor and its
//! termination triggers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`Severity`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor` (lifecycle + shutdown), trigger loops,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the supervisor's fan-out listener (feeds `SubscriberSet`)
//!   and any receiver obtained from `Supervisor::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, Severity};
