//! # Resource registration config.
//!
//! Defines [`ResourceSpec`]: the resource itself plus an optional stop timeout.
//! A missing timeout is resolved against
//! [`SupervisorConfig::default_timeout`](crate::SupervisorConfig::default_timeout)
//! when the spec is registered.

use std::time::Duration;

use crate::resources::resource::ResourceRef;

/// Registration config for a resource.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use resvisor::{ResourceFn, ResourceSpec};
///
/// let spec = ResourceSpec::new(ResourceFn::arc(
///     || async { Ok::<_, std::io::Error>(()) },
///     |_: Option<Arc<()>>| async { Ok::<_, std::io::Error>(()) },
/// ))
/// .with_timeout(Duration::from_secs(2));
///
/// assert_eq!(spec.timeout(), Some(Duration::from_secs(2)));
/// ```
#[derive(Clone)]
pub struct ResourceSpec {
    resource: ResourceRef,
    timeout: Option<Duration>,
}

impl ResourceSpec {
    /// Creates a spec that inherits the supervisor's default stop timeout.
    pub fn new(resource: ResourceRef) -> Self {
        Self {
            resource,
            timeout: None,
        }
    }

    /// Returns a new spec with an explicit stop timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns reference to the resource.
    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    /// Returns the explicit stop timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Resolves the stop timeout against a default.
    pub(crate) fn resolve_timeout(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }
}
