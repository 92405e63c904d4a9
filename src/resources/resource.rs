//! # Resource abstraction.
//!
//! This module defines the [`Resource`] trait: a pair of async callbacks that
//! bring an externally managed unit (child process, watcher, server) up and
//! down. The supervisor never looks inside the produced [`Instance`]; it only
//! stores it and hands it back to `stop`.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ResourceError;

/// Opaque value produced by a successful start.
///
/// Downcast with `Arc::downcast` or [`Supervisor::instance_as`](crate::Supervisor::instance_as).
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Shared handle to a resource.
pub type ResourceRef = Arc<dyn Resource>;

/// # Start/stop lifecycle of one resource.
///
/// Both callbacks may suspend. A panic inside either is caught by the
/// supervisor and normalized into [`ResourceError::Panicked`].
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use resvisor::{Instance, Resource, ResourceError};
///
/// struct Listener { port: u16 }
///
/// #[async_trait]
/// impl Resource for Listener {
///     async fn start(&self) -> Result<Instance, ResourceError> {
///         Ok(Arc::new(self.port))
///     }
///
///     async fn stop(&self, _instance: Option<Instance>) -> Result<(), ResourceError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Brings the resource up and returns its instance.
    async fn start(&self) -> Result<Instance, ResourceError>;

    /// Tears the resource down.
    ///
    /// `instance` is `None` when the resource failed before any start completed.
    async fn stop(&self, instance: Option<Instance>) -> Result<(), ResourceError>;
}
