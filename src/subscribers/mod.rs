//! # Event subscribers for the resvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and,
//! with the `logging` feature, the [`LogWriter`] that renders events via `tracing`.
//!
//! ## Architecture
//! ```text
//! Supervisor ── publish(Event) ──► Bus ──► fan-out listener ──► SubscriberSet
//!                                                                   │
//!                                                       ┌───────────┼──────────┐
//!                                                       ▼           ▼          ▼
//!                                                   LogWriter    Metrics    Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
