//! # Closure-backed resource (`ResourceFn`)
//!
//! [`ResourceFn`] wraps two closures: `start: Fn() -> Fut` producing a typed
//! instance `T`, and `stop: Fn(Option<Arc<T>>) -> Fut`. The instance is erased
//! to [`Instance`] for storage and downcast back to `T` before `stop` sees it.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use resvisor::{ResourceFn, ResourceRef};
//!
//! struct Server { port: u16 }
//!
//! let server: ResourceRef = ResourceFn::arc(
//!     || async { Ok::<_, std::io::Error>(Server { port: 8080 }) },
//!     |server: Option<Arc<Server>>| async move {
//!         if let Some(s) = server {
//!             println!("closing port {}", s.port);
//!         }
//!         Ok::<_, std::io::Error>(())
//!     },
//! );
//! # let _ = server;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{BoxError, ResourceError};
use crate::resources::resource::{Instance, Resource};

/// Closure-backed resource implementation.
#[derive(Debug)]
pub struct ResourceFn<S, T> {
    start: S,
    stop: T,
}

impl<S, T> ResourceFn<S, T> {
    /// Creates a new closure-backed resource.
    ///
    /// Prefer [`ResourceFn::arc`] when you immediately need a [`ResourceRef`](crate::ResourceRef).
    pub fn new(start: S, stop: T) -> Self {
        Self { start, stop }
    }

    /// Creates the resource and returns it as a shared handle.
    pub fn arc(start: S, stop: T) -> Arc<Self> {
        Arc::new(Self::new(start, stop))
    }
}

#[async_trait]
impl<S, SF, I, E1, T, TF, E2> Resource for ResourceFn<S, T>
where
    S: Fn() -> SF + Send + Sync + 'static,
    SF: Future<Output = Result<I, E1>> + Send,
    I: Send + Sync + 'static,
    E1: Into<BoxError>,
    T: Fn(Option<Arc<I>>) -> TF + Send + Sync + 'static,
    TF: Future<Output = Result<(), E2>> + Send,
    E2: Into<BoxError>,
{
    async fn start(&self) -> Result<Instance, ResourceError> {
        match (self.start)().await {
            Ok(instance) => Ok(Arc::new(instance)),
            Err(e) => Err(ResourceError::new(e)),
        }
    }

    async fn stop(&self, instance: Option<Instance>) -> Result<(), ResourceError> {
        let typed = instance.and_then(|i| i.downcast::<I>().ok());
        (self.stop)(typed).await.map_err(ResourceError::new)
    }
}
