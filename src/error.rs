//! Error types used by the resvisor runtime and resources.
//!
//! This module defines two main error enums:
//!
//! - [`SupervisorError`] - errors returned by supervisor operations (registry, lifecycle, triggers).
//! - [`ResourceError`] - faults raised by a resource's own start/stop callbacks.
//!
//! Both types provide `as_label` for logging; [`ResourceError::as_message`] adds the fault details.

use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed error accepted from user callbacks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// # Errors produced by supervisor operations.
///
/// Registration faults (`NotRegistered`, `AlreadyRegistered`) are returned
/// immediately and leave the registry untouched. `Start` and `Stop` carry the
/// fault of the resource callback that caused the record to enter `Failed`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// No record exists for this id.
    #[error("resource {id:?} is not registered")]
    NotRegistered {
        /// Requested resource id.
        id: String,
    },

    /// A record already exists for this id.
    #[error("resource {id:?} is already registered")]
    AlreadyRegistered {
        /// Duplicate resource id.
        id: String,
    },

    /// The start callback faulted.
    #[error("failed to start resource {id:?}: {source}")]
    Start {
        /// Resource id.
        id: String,
        /// Fault raised by the callback.
        #[source]
        source: ResourceError,
    },

    /// The stop callback faulted or exceeded its timeout.
    #[error("failed to stop resource {id:?}: {source}")]
    Stop {
        /// Resource id.
        id: String,
        /// Fault raised by the callback (or the timeout).
        #[source]
        source: ResourceError,
    },

    /// A termination trigger was installed twice.
    #[error("{trigger} trigger is already installed")]
    TriggerInstalled {
        /// Trigger name (`"signal"` or `"fault"`).
        trigger: &'static str,
    },

    /// The host refused to subscribe to termination signals.
    #[error("failed to install signal handlers: {source}")]
    SignalInstall {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use resvisor::SupervisorError;
    ///
    /// let err = SupervisorError::NotRegistered { id: "db".into() };
    /// assert_eq!(err.as_label(), "not_registered");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::NotRegistered { .. } => "not_registered",
            SupervisorError::AlreadyRegistered { .. } => "already_registered",
            SupervisorError::Start { .. } => "start_failed",
            SupervisorError::Stop { .. } => "stop_failed",
            SupervisorError::TriggerInstalled { .. } => "trigger_installed",
            SupervisorError::SignalInstall { .. } => "signal_install_failed",
        }
    }

    /// Returns the resource fault behind a `Start`/`Stop` error.
    pub fn resource_error(&self) -> Option<&ResourceError> {
        match self {
            SupervisorError::Start { source, .. } | SupervisorError::Stop { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    /// Returns `true` if this is a stop that ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SupervisorError::Stop {
                source: ResourceError::Timeout { .. },
                ..
            }
        )
    }
}

/// # Faults raised by resource callbacks.
///
/// The value stored on a record after it transitions into `Failed`.
/// Cheap to clone: the caller's original error is kept behind an `Arc` and can
/// be recovered with [`ResourceError::downcast_ref`].
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ResourceError {
    /// The callback returned an error.
    #[error("{error}")]
    Failed {
        /// The original error, untouched.
        #[source]
        error: Arc<dyn StdError + Send + Sync + 'static>,
    },

    /// The callback panicked with a non-error payload.
    #[error("panicked: {message}")]
    Panicked {
        /// Stringified panic payload.
        message: String,
    },

    /// The stop callback did not settle in time.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },
}

impl ResourceError {
    /// Wraps any error-like value (`std::io::Error`, `anyhow::Error` via `into()`, `&str`, `String`, ...).
    ///
    /// # Example
    /// ```
    /// use resvisor::ResourceError;
    ///
    /// let err = ResourceError::new("port already in use");
    /// assert_eq!(err.to_string(), "port already in use");
    /// ```
    pub fn new(error: impl Into<BoxError>) -> Self {
        ResourceError::Failed {
            error: Arc::from(error.into()),
        }
    }

    /// Normalizes a panic payload into a [`ResourceError::Panicked`].
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        ResourceError::Panicked {
            message: panic_message(payload.as_ref()),
        }
    }

    /// Returns the original error if it is of type `E`.
    ///
    /// # Example
    /// ```
    /// use resvisor::ResourceError;
    ///
    /// let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "busy");
    /// let err = ResourceError::new(io);
    /// let back = err.downcast_ref::<std::io::Error>().unwrap();
    /// assert_eq!(back.kind(), std::io::ErrorKind::AddrInUse);
    /// ```
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            ResourceError::Failed { error } => error.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ResourceError::Failed { .. } => "resource_failed",
            ResourceError::Panicked { .. } => "resource_panicked",
            ResourceError::Timeout { .. } => "resource_timeout",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ResourceError::Failed { error } => format!("error: {error}"),
            ResourceError::Panicked { message } => format!("panic: {message}"),
            ResourceError::Timeout { timeout } => format!("timeout: {timeout:?}"),
        }
    }
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("bind failed on {port}")]
    struct BindError {
        port: u16,
    }

    #[test]
    fn test_new_keeps_original_error() {
        let err = ResourceError::new(BindError { port: 8080 });
        assert_eq!(err.to_string(), "bind failed on 8080");
        assert_eq!(err.downcast_ref::<BindError>().map(|e| e.port), Some(8080));
        assert_eq!(err.as_label(), "resource_failed");
    }

    #[test]
    fn test_clone_shares_original() {
        let err = ResourceError::new(BindError { port: 1 });
        let copy = err.clone();
        match (&err, &copy) {
            (ResourceError::Failed { error: a }, ResourceError::Failed { error: b }) => {
                assert!(Arc::ptr_eq(a, b));
            }
            _ => panic!("expected Failed"),
        }
    }

    #[test]
    fn test_panic_payloads_are_stringified() {
        let err = ResourceError::from_panic(Box::new("static str"));
        assert_eq!(err.to_string(), "panicked: static str");

        let err = ResourceError::from_panic(Box::new(String::from("owned")));
        assert_eq!(err.to_string(), "panicked: owned");

        let err = ResourceError::from_panic(Box::new(42_u32));
        assert_eq!(err.to_string(), "panicked: unknown panic");
        assert!(err.downcast_ref::<BindError>().is_none());
    }

    #[test]
    fn test_stop_timeout_message_names_id_and_duration() {
        let err = SupervisorError::Stop {
            id: "slow".into(),
            source: ResourceError::Timeout {
                timeout: Duration::from_millis(100),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("\"slow\""), "{msg}");
        assert!(msg.contains("100ms"), "{msg}");
        assert!(err.is_timeout());
        assert_eq!(err.as_label(), "stop_failed");
    }

    #[test]
    fn test_resource_error_accessor() {
        let err = SupervisorError::Start {
            id: "db".into(),
            source: ResourceError::new("boom"),
        };
        assert_eq!(err.resource_error().map(|e| e.to_string()).as_deref(), Some("boom"));
        assert!(!err.is_timeout());

        let err = SupervisorError::AlreadyRegistered { id: "db".into() };
        assert!(err.resource_error().is_none());
    }
}
