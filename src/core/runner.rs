//! # Runs resource callbacks and hooks.
//!
//! Every user callback (start, stop, pre-shutdown hooks) goes through this module:
//! - **Panic containment**: panics are caught and normalized into
//!   [`ResourceError::Panicked`]. While a callback is being polled a
//!   thread-local marker is set, so the OS panic hook can tell a contained
//!   panic from an uncaught one.
//! - **Stop timeout race**: the stop callback runs as its own task and races a
//!   timer. Whichever settles first wins; the timer is dropped in every outcome.
//!
//! ```text
//! stop_with_timeout(resource, instance, timeout)
//!   ├─ spawn: contained(resource.stop(instance))
//!   └─ select!
//!        ├─ join    ─► Ok / Failed / Panicked
//!        └─ sleep   ─► Timeout   (stop task is detached, not aborted)
//! ```
//!
//! Cancellation is soft: a stop that loses the race keeps running in the
//! background until it settles on its own.

use std::cell::Cell;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::time;

use crate::error::{BoxError, ResourceError};
use crate::resources::{Instance, ResourceRef};

thread_local! {
    static CONTAINED: Cell<usize> = const { Cell::new(0) };
}

/// Returns `true` when called from inside a supervised callback poll.
pub(crate) fn is_contained() -> bool {
    CONTAINED.with(|c| c.get() > 0)
}

/// Marks the current thread as polling a supervised callback until dropped.
struct ContainScope;

impl ContainScope {
    fn enter() -> Self {
        CONTAINED.with(|c| c.set(c.get() + 1));
        ContainScope
    }
}

impl Drop for ContainScope {
    fn drop(&mut self) {
        CONTAINED.with(|c| c.set(c.get().saturating_sub(1)));
    }
}

/// Future wrapper that holds a [`ContainScope`] for the duration of each poll.
struct Contained<'a, T> {
    inner: BoxFuture<'a, T>,
}

impl<T> Future for Contained<'_, T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let _scope = ContainScope::enter();
        self.inner.as_mut().poll(cx)
    }
}

/// Polls `fut` with panic containment.
pub(crate) async fn contained<T>(fut: BoxFuture<'_, T>) -> Result<T, ResourceError> {
    AssertUnwindSafe(Contained { inner: fut })
        .catch_unwind()
        .await
        .map_err(ResourceError::from_panic)
}

/// Runs the start callback. No timeout applies.
pub(crate) async fn start_once(resource: &ResourceRef) -> Result<Instance, ResourceError> {
    contained(resource.start()).await?
}

/// Runs the stop callback raced against `timeout`.
pub(crate) async fn stop_with_timeout(
    resource: ResourceRef,
    instance: Option<Instance>,
    timeout: Duration,
) -> Result<(), ResourceError> {
    let mut handle = tokio::spawn(async move { contained(resource.stop(instance)).await });

    let timer = time::sleep(timeout);
    tokio::pin!(timer);

    tokio::select! {
        biased;
        joined = &mut handle => match joined {
            Ok(res) => res?,
            Err(je) if je.is_panic() => Err(ResourceError::from_panic(je.into_panic())),
            Err(_) => Err(ResourceError::Panicked {
                message: "stop task cancelled by runtime".to_string(),
            }),
        },
        _ = &mut timer => Err(ResourceError::Timeout { timeout }),
    }
}

/// Runs a pre-shutdown hook with panic containment.
pub(crate) async fn run_hook(
    hook: BoxFuture<'static, Result<(), BoxError>>,
) -> Result<(), ResourceError> {
    contained(hook).await?.map_err(ResourceError::new)
}
