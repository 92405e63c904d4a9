use std::future::Future;
use std::sync::Arc;

use crate::{
    core::{
        config::SupervisorConfig,
        host::{Fault, Host, OsHost},
        shutdown::Signal,
        triggers::Hooks,
    },
    error::{BoxError, SupervisorError},
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};
use super::supervisor::Supervisor;

/// Builder for constructing a Supervisor with optional features.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    host: Option<Arc<dyn Host>>,
    hooks: Hooks,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            host: None,
            hooks: Hooks::default(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (lifecycle steps, warnings, shutdown faults)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the process environment used by the termination triggers.
    ///
    /// Defaults to [`OsHost`].
    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    /// Hook run when the first termination signal arrives, before aggregate shutdown.
    ///
    /// A hook fault is logged and shutdown proceeds.
    pub fn on_signal<F, Fut, E>(mut self, hook: F) -> Self
    where
        F: Fn(Signal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.hooks.on_signal = Some(Hooks::signal_hook(hook));
        self
    }

    /// Hook run when an uncaught fault is captured, before aggregate shutdown.
    ///
    /// A hook fault is logged and shutdown proceeds.
    pub fn on_error<F, Fut, E>(mut self, hook: F) -> Self
    where
        F: Fn(Fault) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.hooks.on_error = Some(Hooks::error_hook(hook));
        self
    }

    /// Builds the supervisor and installs the triggers enabled in the config.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// [`SupervisorError::SignalInstall`] if the host cannot subscribe to signals.
    pub fn build(self) -> Result<Arc<Supervisor>, SupervisorError> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let host = self.host.unwrap_or_else(|| Arc::new(OsHost::new()));

        let signals = self.cfg.handle_signals.signals();
        let faults = self.cfg.handle_uncaught_errors;

        let sup = Arc::new(Supervisor::new_internal(self.cfg, bus, subs, host, self.hooks));
        sup.subscriber_listener();

        if let Some(signals) = signals {
            sup.install_signal_trigger(&signals)?;
        }
        if faults {
            sup.install_fault_trigger()?;
        }
        Ok(sup)
    }
}
