//! # Supervisor: registry, lifecycle operations, and aggregate shutdown.
//!
//! The [`Supervisor`] owns the registry of resource records, the event bus, the
//! [`SubscriberSet`] and the [`Host`] used by the termination triggers.
//!
//! ## Key responsibilities
//! - register/unregister resources by id
//! - drive the per-resource state machine through `start`/`stop`
//! - enforce the stop timeout (see [`runner`](super::runner))
//! - fan out a stop to every resource in [`Supervisor::shutdown_all`], isolating failures
//! - publish an [`Event`] for every step
//!
//! ## High-level architecture
//! ```text
//! start(id):  registry.begin_start ─► Starting ─► runner::start_once ─► Running | Failed
//! stop(id):   registry.begin_stop  ─► Stopping ─► runner::stop_with_timeout ─► Stopped | Failed
//!
//! shutdown_all():
//!   ids = registry.ids()             (snapshot)
//!   join_all(ids.map(stop))          (no short-circuit)
//!     └─ Err(id) ─► ShutdownStopFailed(id)   (reported, never raised)
//!   ─► ShutdownReport
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use resvisor::{ResourceFn, ResourceSpec, ResourceState, Supervisor, SupervisorConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::builder(SupervisorConfig::without_triggers()).build()?;
//!
//!     sup.register("counter", ResourceSpec::new(ResourceFn::arc(
//!         || async { Ok::<_, std::io::Error>(42_u32) },
//!         |_: Option<Arc<u32>>| async { Ok::<_, std::io::Error>(()) },
//!     ))).await?;
//!
//!     sup.start("counter").await?;
//!     assert_eq!(sup.instance_as::<u32>("counter").await.as_deref(), Some(&42));
//!
//!     let report = sup.shutdown_all().await;
//!     assert!(!report.has_errors());
//!     assert_eq!(sup.state("counter").await, Some(ResourceState::Stopped));
//!     Ok(())
//! }
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use futures::future::join_all;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::core::builder::SupervisorBuilder;
use crate::core::config::SupervisorConfig;
use crate::core::host::{Fault, FaultKind, Host};
use crate::core::registry::{Admission, Outcome, Registry};
use crate::core::runner;
use crate::core::triggers::Hooks;
use crate::error::{BoxError, ResourceError, SupervisorError};
use crate::events::{Bus, Event, EventKind};
use crate::resources::{Instance, ResourceSpec, ResourceState};
use crate::subscribers::SubscriberSet;

/// Outcome of [`Supervisor::shutdown_all`].
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Number of resources the shutdown attempted to stop.
    pub attempted: usize,
    /// Resources whose stop faulted or timed out, with the fault.
    pub failed: Vec<(String, SupervisorError)>,
}

impl ShutdownReport {
    /// Returns `true` if any resource failed to stop.
    pub fn has_errors(&self) -> bool {
        !self.failed.is_empty()
    }

    /// `0` when every resource stopped cleanly, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.has_errors() { 1 } else { 0 }
    }

    /// Ids of the resources that failed to stop.
    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(|(id, _)| id.as_str())
    }
}

/// Tracks named resources through their lifecycle and tears them down on demand.
pub struct Supervisor {
    pub(crate) cfg: SupervisorConfig,
    pub(crate) bus: Bus,
    pub(crate) subs: Arc<SubscriberSet>,
    pub(crate) registry: Registry,
    pub(crate) host: Arc<dyn Host>,
    pub(crate) hooks: Hooks,
    /// Latched by the first signal (or fault) that starts a process-level shutdown.
    pub(crate) shutting_down: AtomicBool,
    pub(crate) signal_installed: AtomicBool,
    pub(crate) fault_installed: AtomicBool,
    /// Feeds [`Supervisor::report_unhandled`] into the fault trigger.
    pub(crate) fault_tx: OnceLock<mpsc::UnboundedSender<Fault>>,
    /// Flush requests for the subscriber listener; unset when there are no subscribers.
    pub(crate) flush_tx: OnceLock<mpsc::UnboundedSender<oneshot::Sender<()>>>,
    /// Cancelled on drop; stops the listener and trigger loops.
    pub(crate) runtime_token: CancellationToken,
}

impl Supervisor {
    /// Returns a builder for configuring a supervisor.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        host: Arc<dyn Host>,
        hooks: Hooks,
    ) -> Self {
        Self {
            cfg,
            bus,
            subs,
            registry: Registry::new(),
            host,
            hooks,
            shutting_down: AtomicBool::new(false),
            signal_installed: AtomicBool::new(false),
            fault_installed: AtomicBool::new(false),
            fault_tx: OnceLock::new(),
            flush_tx: OnceLock::new(),
            runtime_token: CancellationToken::new(),
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    ///
    /// A flush request forwards whatever is already on the bus, then waits for
    /// the subscriber workers before acking.
    pub(crate) fn subscriber_listener(&self) {
        if self.subs.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let (flush_tx, mut flush_rx) = mpsc::unbounded_channel::<oneshot::Sender<()>>();
        let _ = self.flush_tx.set(flush_tx);
        let set = Arc::clone(&self.subs);
        let token = self.runtime_token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    Some(ack) = flush_rx.recv() => {
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => set.emit(&ev),
                                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        set.flush().await;
                        let _ = ack.send(());
                    }
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });
    }

    /// Configuration this supervisor was built with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Waits until every subscriber has handled the events published so far.
    ///
    /// Returns immediately when no subscribers are attached.
    pub async fn flush_subscribers(&self) {
        let Some(tx) = self.flush_tx.get() else {
            return;
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if tx.send(ack_tx).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Creates a receiver for all subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    // ---------------------------
    // Registry
    // ---------------------------

    /// Registers a resource under `id` in state `Idle`. No resource work is performed.
    ///
    /// # Errors
    /// [`SupervisorError::AlreadyRegistered`] if `id` is taken; the existing record is untouched.
    pub async fn register(
        &self,
        id: impl Into<String>,
        spec: ResourceSpec,
    ) -> Result<(), SupervisorError> {
        let id = id.into();
        let timeout = self
            .registry
            .insert(&id, spec, self.cfg.default_timeout)
            .await?;
        self.bus.publish(
            Event::new(EventKind::ResourceRegistered)
                .with_resource(id.as_str())
                .with_state(ResourceState::Idle)
                .with_timeout(timeout),
        );
        Ok(())
    }

    /// Removes a resource, stopping it first if it is `Running`.
    ///
    /// # Errors
    /// - [`SupervisorError::NotRegistered`] if `id` is unknown.
    /// - [`SupervisorError::Stop`] if the preceding stop fails; the record then
    ///   stays registered in `Failed`.
    pub async fn unregister(&self, id: &str) -> Result<(), SupervisorError> {
        let state = self
            .registry
            .state(id)
            .await
            .ok_or_else(|| SupervisorError::NotRegistered { id: id.to_string() })?;

        if state == ResourceState::Running {
            self.stop(id).await?;
        }
        if self.registry.remove(id).await {
            self.bus
                .publish(Event::new(EventKind::ResourceUnregistered).with_resource(id));
        }
        Ok(())
    }

    // ---------------------------
    // Lifecycle
    // ---------------------------

    /// Starts the resource.
    ///
    /// From `Idle`/`Stopped`/`Failed`: enters `Starting`, awaits the start callback
    /// and stores its instance (`Running`). From any other state this is a no-op
    /// that publishes a single [`EventKind::TransitionIgnored`] warning.
    ///
    /// # Errors
    /// - [`SupervisorError::NotRegistered`] if `id` is unknown.
    /// - [`SupervisorError::Start`] carrying the callback's fault; the record is `Failed`.
    pub async fn start(&self, id: &str) -> Result<(), SupervisorError> {
        let resource = match self.registry.begin_start(id).await? {
            Admission::Proceed(resource) => resource,
            Admission::Ignored(state) => {
                self.publish_ignored(id, "start", state);
                return Ok(());
            }
            Admission::Silent => return Ok(()),
        };
        self.publish_transition(EventKind::ResourceStarting, id, ResourceState::Starting);

        match runner::start_once(&resource).await {
            Ok(instance) => {
                self.registry.settle(id, Outcome::Running(instance)).await;
                self.publish_transition(EventKind::ResourceRunning, id, ResourceState::Running);
                Ok(())
            }
            Err(err) => {
                self.mark_failed(id, "start", err.clone()).await;
                Err(SupervisorError::Start {
                    id: id.to_string(),
                    source: err,
                })
            }
        }
    }

    /// Stops the resource.
    ///
    /// From `Running`/`Failed`: enters `Stopping` and races the stop callback
    /// (given the stored instance) against the resource's timeout. `Idle` is a
    /// silent no-op; `Starting`/`Stopping`/`Stopped` publish a single warning.
    ///
    /// # Errors
    /// - [`SupervisorError::NotRegistered`] if `id` is unknown.
    /// - [`SupervisorError::Stop`] on callback fault or timeout; the record is `Failed`.
    pub async fn stop(&self, id: &str) -> Result<(), SupervisorError> {
        let ticket = match self.registry.begin_stop(id).await? {
            Admission::Proceed(ticket) => ticket,
            Admission::Ignored(state) => {
                self.publish_ignored(id, "stop", state);
                return Ok(());
            }
            Admission::Silent => return Ok(()),
        };
        self.bus.publish(
            Event::new(EventKind::ResourceStopping)
                .with_resource(id)
                .with_state(ResourceState::Stopping)
                .with_timeout(ticket.timeout),
        );

        match runner::stop_with_timeout(ticket.resource, ticket.instance, ticket.timeout).await {
            Ok(()) => {
                self.registry.settle(id, Outcome::Stopped).await;
                self.publish_transition(EventKind::ResourceStopped, id, ResourceState::Stopped);
                Ok(())
            }
            Err(err) => {
                if let ResourceError::Timeout { timeout } = &err {
                    self.bus.publish(
                        Event::new(EventKind::StopTimeoutHit)
                            .with_resource(id)
                            .with_timeout(*timeout),
                    );
                }
                self.mark_failed(id, "stop", err.clone()).await;
                Err(SupervisorError::Stop {
                    id: id.to_string(),
                    source: err,
                })
            }
        }
    }

    /// Stops every registered resource concurrently and waits for all of them.
    ///
    /// Never fails: individual faults are published as
    /// [`EventKind::ShutdownStopFailed`] and collected into the report.
    /// Resources removed between the snapshot and their stop are skipped.
    pub async fn shutdown_all(&self) -> ShutdownReport {
        let ids = self.registry.ids().await;
        self.bus.publish(
            Event::new(EventKind::ShutdownStarted).with_reason(format!("resources={}", ids.len())),
        );

        let results = join_all(ids.iter().map(|id| self.stop(id))).await;

        let mut report = ShutdownReport {
            attempted: ids.len(),
            failed: Vec::new(),
        };
        for (id, res) in ids.into_iter().zip(results) {
            match res {
                Ok(()) | Err(SupervisorError::NotRegistered { .. }) => {}
                Err(err) => {
                    self.bus.publish(
                        Event::new(EventKind::ShutdownStopFailed)
                            .with_resource(id.as_str())
                            .with_reason(err.to_string()),
                    );
                    report.failed.push((id, err));
                }
            }
        }

        self.bus.publish(Event::new(EventKind::ShutdownCompleted).with_reason(format!(
            "attempted={} failed={}",
            report.attempted,
            report.failed.len()
        )));
        report
    }

    // ---------------------------
    // Read accessors (counter-safe)
    // ---------------------------

    /// Instance produced by the last successful start, if any.
    ///
    /// Still returned after the resource stops or fails.
    pub async fn instance(&self, id: &str) -> Option<Instance> {
        self.registry.instance(id).await
    }

    /// Instance downcast to its concrete type.
    pub async fn instance_as<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        self.instance(id)
            .await
            .and_then(|i| i.downcast::<T>().ok())
    }

    /// Current state, or `None` if `id` is unknown.
    pub async fn state(&self, id: &str) -> Option<ResourceState> {
        self.registry.state(id).await
    }

    /// Snapshot of every resource's state.
    pub async fn states(&self) -> HashMap<String, ResourceState> {
        self.registry.states().await
    }

    /// Last fault captured on entry into `Failed`.
    pub async fn error(&self, id: &str) -> Option<ResourceError> {
        self.registry.error(id).await
    }

    /// Returns `true` if `id` is registered.
    pub async fn contains(&self, id: &str) -> bool {
        self.registry.contains(id).await
    }

    /// Number of registered resources.
    pub async fn len(&self) -> usize {
        self.registry.len().await
    }

    /// Returns `true` if nothing is registered.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sorted list of registered ids.
    pub async fn ids(&self) -> Vec<String> {
        self.registry.ids().await
    }

    /// Returns `true` once a signal or fault has started a process-level shutdown.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Hands an error no one can handle (e.g. from a detached task) to the fault trigger.
    ///
    /// Returns `false` if the fault trigger is not installed.
    pub fn report_unhandled(&self, error: impl Into<BoxError>) -> bool {
        match self.fault_tx.get() {
            Some(tx) => tx
                .send(Fault::new(FaultKind::Unhandled, error.into().to_string()))
                .is_ok(),
            None => false,
        }
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    async fn mark_failed(&self, id: &str, op: &str, err: ResourceError) {
        let reason = format!("{op}: {err}");
        self.registry.settle(id, Outcome::Failed(err)).await;
        self.bus.publish(
            Event::new(EventKind::ResourceFailed)
                .with_resource(id)
                .with_state(ResourceState::Failed)
                .with_reason(reason),
        );
    }

    fn publish_transition(&self, kind: EventKind, id: &str, state: ResourceState) {
        self.bus
            .publish(Event::new(kind).with_resource(id).with_state(state));
    }

    fn publish_ignored(&self, id: &str, op: &str, state: ResourceState) {
        self.bus.publish(
            Event::new(EventKind::TransitionIgnored)
                .with_resource(id)
                .with_state(state)
                .with_reason(format!("{op} ignored while {state}")),
        );
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}
