//! # Termination triggers: wire process-level events to aggregate shutdown.
//!
//! Two independent installers, each guarded against double installation:
//!
//! ```text
//! Signal trigger:
//!   host.signals(set) ─► loop
//!     ├─ latch already set ─► ignore
//!     └─ first signal ─► latch ─► SignalReceived ─► on_signal hook (faults logged)
//!                              ─► shutdown_all() ─► flush subscribers ─► host.exit(0 | 1)
//!
//! Fault trigger:
//!   host.faults() ∪ report_unhandled() ─► loop
//!     └─ fault ─► latch ─► FaultCaptured ─► on_error hook (faults logged)
//!                       ─► shutdown_all() ─► flush subscribers ─► host.exit(1)
//! ```
//!
//! Subscribers are flushed before exit so the final shutdown events reach them.
//! The flush is bounded by [`SupervisorConfig::default_timeout`](crate::SupervisorConfig::default_timeout).
//!
//! Trigger loops hold only a weak reference to the supervisor and stop when it is dropped.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::time;

use crate::core::host::Fault;
use crate::core::runner;
use crate::core::shutdown::Signal;
use crate::core::supervisor::Supervisor;
use crate::error::{BoxError, SupervisorError};
use crate::events::{Event, EventKind};

/// Pre-shutdown hook for signals.
pub(crate) type SignalHook =
    Arc<dyn Fn(Signal) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Pre-shutdown hook for faults.
pub(crate) type ErrorHook =
    Arc<dyn Fn(Fault) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Optional caller hooks run before aggregate shutdown.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub(crate) on_signal: Option<SignalHook>,
    pub(crate) on_error: Option<ErrorHook>,
}

impl Hooks {
    pub(crate) fn signal_hook<F, Fut, E>(f: F) -> SignalHook
    where
        F: Fn(Signal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Arc::new(move |signal| -> BoxFuture<'static, Result<(), BoxError>> {
            let fut = f(signal);
            Box::pin(async move { fut.await.map_err(Into::into) })
        })
    }

    pub(crate) fn error_hook<F, Fut, E>(f: F) -> ErrorHook
    where
        F: Fn(Fault) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Arc::new(move |fault| -> BoxFuture<'static, Result<(), BoxError>> {
            let fut = f(fault);
            Box::pin(async move { fut.await.map_err(Into::into) })
        })
    }
}

impl Supervisor {
    /// Installs the signal trigger for `signals`.
    ///
    /// # Errors
    /// - [`SupervisorError::TriggerInstalled`] on a second call (a warning is also published).
    /// - [`SupervisorError::SignalInstall`] if the host refuses the subscription.
    pub fn install_signal_trigger(self: &Arc<Self>, signals: &[Signal]) -> Result<(), SupervisorError> {
        self.claim_trigger(&self.signal_installed, "signal")?;

        let mut rx = match self.host.signals(signals) {
            Ok(rx) => rx,
            Err(source) => {
                self.signal_installed.store(false, Ordering::SeqCst);
                return Err(SupervisorError::SignalInstall { source });
            }
        };

        let weak = Arc::downgrade(self);
        let token = self.runtime_token.clone();
        tokio::spawn(async move {
            loop {
                let signal = tokio::select! {
                    _ = token.cancelled() => break,
                    got = rx.recv() => match got {
                        Some(signal) => signal,
                        None => break,
                    },
                };
                let Some(sup) = weak.upgrade() else { break };
                if sup.shutting_down.swap(true, Ordering::SeqCst) {
                    continue;
                }
                tokio::spawn(sup.handle_signal(signal));
            }
        });
        Ok(())
    }

    /// Installs the fault trigger (uncaught panics and [`Supervisor::report_unhandled`]).
    ///
    /// # Errors
    /// [`SupervisorError::TriggerInstalled`] on a second call (a warning is also published).
    pub fn install_fault_trigger(self: &Arc<Self>) -> Result<(), SupervisorError> {
        self.claim_trigger(&self.fault_installed, "fault")?;

        let mut host_rx = self.host.faults();
        let (tx, mut local_rx) = mpsc::unbounded_channel();
        let _ = self.fault_tx.set(tx);

        let weak = Arc::downgrade(self);
        let token = self.runtime_token.clone();
        tokio::spawn(async move {
            loop {
                let fault = tokio::select! {
                    _ = token.cancelled() => break,
                    Some(fault) = host_rx.recv() => fault,
                    Some(fault) = local_rx.recv() => fault,
                    else => break,
                };
                let Some(sup) = weak.upgrade() else { break };
                sup.handle_fault(fault).await;
            }
        });
        Ok(())
    }

    fn claim_trigger(&self, flag: &AtomicBool, trigger: &'static str) -> Result<(), SupervisorError> {
        if flag.swap(true, Ordering::SeqCst) {
            self.bus
                .publish(Event::new(EventKind::TriggerAlreadyInstalled).with_reason(trigger));
            return Err(SupervisorError::TriggerInstalled { trigger });
        }
        Ok(())
    }

    async fn handle_signal(self: Arc<Self>, signal: Signal) {
        self.bus
            .publish(Event::new(EventKind::SignalReceived).with_signal(signal));

        if let Some(hook) = self.hooks.on_signal.clone() {
            if let Err(err) = runner::run_hook(Box::pin(async move { hook(signal).await })).await {
                self.bus.publish(
                    Event::new(EventKind::HookFailed)
                        .with_signal(signal)
                        .with_reason(format!("on_signal: {err}")),
                );
            }
        }

        let report = self.shutdown_all().await;
        self.exit_after_flush(report.exit_code()).await;
    }

    async fn handle_fault(&self, fault: Fault) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.bus
            .publish(Event::new(EventKind::FaultCaptured).with_reason(fault.to_string()));

        if let Some(hook) = self.hooks.on_error.clone() {
            if let Err(err) = runner::run_hook(Box::pin(async move { hook(fault).await })).await {
                self.bus.publish(
                    Event::new(EventKind::HookFailed).with_reason(format!("on_error: {err}")),
                );
            }
        }

        let _ = self.shutdown_all().await;
        self.exit_after_flush(1).await;
    }

    async fn exit_after_flush(&self, code: i32) {
        let _ = time::timeout(self.cfg.default_timeout, self.flush_subscribers()).await;
        self.host.exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{SignalHandling, SupervisorConfig};
    use crate::core::host::{FaultKind, Host};
    use crate::resources::{ResourceFn, ResourceSpec, ResourceState};
    use crate::subscribers::Subscribe;
    use async_trait::async_trait;
    use std::io;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// Host driven by the test: signals and faults are injected, exits are recorded.
    #[derive(Default)]
    struct MockHost {
        signal_tx: Mutex<Option<mpsc::UnboundedSender<Signal>>>,
        fault_tx: Mutex<Option<mpsc::UnboundedSender<Fault>>>,
        subscribed: Mutex<Vec<Signal>>,
        exits: Mutex<Vec<i32>>,
        exit_notify: tokio::sync::Notify,
        refuse_signals: bool,
        /// Subscriber whose view is captured at the moment of exit.
        watch: Option<Arc<Recorder>>,
        seen_at_exit: Mutex<Vec<EventKind>>,
    }

    #[derive(Default)]
    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            tokio::task::yield_now().await;
            self.kinds.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    impl MockHost {
        fn send_signal(&self, s: Signal) {
            let tx = self.signal_tx.lock().unwrap();
            tx.as_ref().unwrap().send(s).unwrap();
        }

        fn send_fault(&self, f: Fault) {
            let tx = self.fault_tx.lock().unwrap();
            tx.as_ref().unwrap().send(f).unwrap();
        }

        fn exits(&self) -> Vec<i32> {
            self.exits.lock().unwrap().clone()
        }

        async fn wait_exit(&self) {
            loop {
                let notified = self.exit_notify.notified();
                if !self.exits().is_empty() {
                    return;
                }
                notified.await;
            }
        }
    }

    impl Host for MockHost {
        fn signals(&self, signals: &[Signal]) -> io::Result<mpsc::UnboundedReceiver<Signal>> {
            if self.refuse_signals {
                return Err(io::Error::other("signals unavailable"));
            }
            let (tx, rx) = mpsc::unbounded_channel();
            *self.signal_tx.lock().unwrap() = Some(tx);
            *self.subscribed.lock().unwrap() = signals.to_vec();
            Ok(rx)
        }

        fn faults(&self) -> mpsc::UnboundedReceiver<Fault> {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.fault_tx.lock().unwrap() = Some(tx);
            rx
        }

        fn exit(&self, code: i32) {
            if let Some(rec) = &self.watch {
                *self.seen_at_exit.lock().unwrap() = rec.kinds.lock().unwrap().clone();
            }
            self.exits.lock().unwrap().push(code);
            self.exit_notify.notify_waiters();
        }
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn count(events: &[Event], kind: EventKind) -> usize {
        events.iter().filter(|e| e.kind == kind).count()
    }

    fn resource(stop_fails: bool, stops: Arc<AtomicUsize>) -> ResourceSpec {
        ResourceSpec::new(ResourceFn::arc(
            || async { Ok::<_, io::Error>(()) },
            move |_: Option<Arc<()>>| {
                stops.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    if stop_fails { Err("stuck") } else { Ok(()) }
                }
            },
        ))
    }

    fn build(host: Arc<MockHost>, cfg: SupervisorConfig) -> Arc<Supervisor> {
        Supervisor::builder(cfg).with_host(host).build().unwrap()
    }

    fn signals_only() -> SupervisorConfig {
        SupervisorConfig {
            handle_uncaught_errors: false,
            ..SupervisorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_signal_runs_hook_shutdown_and_exits_zero() {
        let host = Arc::new(MockHost::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_hook = seen.clone();
        let sup = Supervisor::builder(signals_only())
            .with_host(host.clone())
            .on_signal(move |sig| {
                seen_hook.lock().unwrap().push(sig);
                async { Ok::<_, io::Error>(()) }
            })
            .build()
            .unwrap();
        assert_eq!(
            *host.subscribed.lock().unwrap(),
            vec![Signal::Interrupt, Signal::Terminate]
        );

        let stops = Arc::new(AtomicUsize::new(0));
        sup.register("a", resource(false, stops.clone())).await.unwrap();
        sup.register("b", resource(false, stops.clone())).await.unwrap();
        sup.start("a").await.unwrap();
        sup.start("b").await.unwrap();
        let mut rx = sup.subscribe();

        host.send_signal(Signal::Terminate);
        host.wait_exit().await;

        assert_eq!(host.exits(), vec![0]);
        assert_eq!(*seen.lock().unwrap(), vec![Signal::Terminate]);
        assert_eq!(stops.load(Ordering::SeqCst), 2);
        assert_eq!(sup.state("a").await, Some(ResourceState::Stopped));
        assert!(sup.is_shutting_down());

        let events = drain(&mut rx);
        let received: Vec<&Event> = events
            .iter()
            .filter(|e| e.kind == EventKind::SignalReceived)
            .collect();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].signal, Some(Signal::Terminate));
        assert_eq!(count(&events, EventKind::ShutdownCompleted), 1);
    }

    #[tokio::test]
    async fn test_signal_exits_one_when_a_stop_fails() {
        let host = Arc::new(MockHost::default());
        let sup = build(host.clone(), signals_only());
        let stops = Arc::new(AtomicUsize::new(0));
        sup.register("ok", resource(false, stops.clone())).await.unwrap();
        sup.register("bad", resource(true, stops.clone())).await.unwrap();
        sup.start("ok").await.unwrap();
        sup.start("bad").await.unwrap();

        host.send_signal(Signal::Interrupt);
        host.wait_exit().await;
        assert_eq!(host.exits(), vec![1]);
        assert_eq!(sup.state("bad").await, Some(ResourceState::Failed));
        assert_eq!(sup.state("ok").await, Some(ResourceState::Stopped));
    }

    #[tokio::test]
    async fn test_second_signal_is_ignored() {
        let host = Arc::new(MockHost::default());
        let sup = build(host.clone(), signals_only());
        let stops = Arc::new(AtomicUsize::new(0));
        sup.register("a", resource(false, stops.clone())).await.unwrap();
        sup.start("a").await.unwrap();
        let mut rx = sup.subscribe();

        host.send_signal(Signal::Interrupt);
        host.send_signal(Signal::Terminate);
        host.wait_exit().await;
        // let any stray handler run
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(host.exits(), vec![0]);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        let events = drain(&mut rx);
        assert_eq!(count(&events, EventKind::SignalReceived), 1);
        assert_eq!(count(&events, EventKind::ShutdownStarted), 1);
    }

    #[tokio::test]
    async fn test_signal_hook_failure_does_not_block_shutdown() {
        let host = Arc::new(MockHost::default());
        let sup = Supervisor::builder(signals_only())
            .with_host(host.clone())
            .on_signal(|_sig| async { Err::<(), _>("hook broke") })
            .build()
            .unwrap();
        let stops = Arc::new(AtomicUsize::new(0));
        sup.register("a", resource(false, stops.clone())).await.unwrap();
        sup.start("a").await.unwrap();
        let mut rx = sup.subscribe();

        host.send_signal(Signal::Interrupt);
        host.wait_exit().await;

        assert_eq!(host.exits(), vec![0]);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        let events = drain(&mut rx);
        let failed = events
            .iter()
            .find(|e| e.kind == EventKind::HookFailed)
            .unwrap();
        assert!(failed.reason.as_deref().unwrap().contains("hook broke"));
    }

    #[tokio::test]
    async fn test_custom_signal_list() {
        let host = Arc::new(MockHost::default());
        let cfg = SupervisorConfig {
            handle_signals: SignalHandling::Custom(vec![Signal::Hangup]),
            handle_uncaught_errors: false,
            ..SupervisorConfig::default()
        };
        let _sup = build(host.clone(), cfg);
        assert_eq!(*host.subscribed.lock().unwrap(), vec![Signal::Hangup]);
    }

    #[tokio::test]
    async fn test_disabled_triggers_install_nothing() {
        let host = Arc::new(MockHost::default());
        let sup = build(host.clone(), SupervisorConfig::without_triggers());
        assert!(host.signal_tx.lock().unwrap().is_none());
        assert!(host.fault_tx.lock().unwrap().is_none());
        assert!(!sup.report_unhandled("nobody listens"));
    }

    #[tokio::test]
    async fn test_double_install_is_rejected() {
        let host = Arc::new(MockHost::default());
        let sup = build(host.clone(), SupervisorConfig::default());
        let mut rx = sup.subscribe();

        let err = sup.install_signal_trigger(&Signal::DEFAULT_SET).unwrap_err();
        assert!(matches!(err, SupervisorError::TriggerInstalled { trigger: "signal" }));
        let err = sup.install_fault_trigger().unwrap_err();
        assert!(matches!(err, SupervisorError::TriggerInstalled { trigger: "fault" }));

        let events = drain(&mut rx);
        assert_eq!(count(&events, EventKind::TriggerAlreadyInstalled), 2);
    }

    #[tokio::test]
    async fn test_signal_install_failure_is_reported() {
        let host = Arc::new(MockHost {
            refuse_signals: true,
            ..MockHost::default()
        });
        let err = Supervisor::builder(signals_only())
            .with_host(host)
            .build()
            .err()
            .unwrap();
        assert_eq!(err.as_label(), "signal_install_failed");
    }

    #[tokio::test]
    async fn test_fault_exits_one_even_when_shutdown_is_clean() {
        let host = Arc::new(MockHost::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_hook = seen.clone();
        let sup = Supervisor::builder(SupervisorConfig {
            handle_signals: SignalHandling::Disabled,
            ..SupervisorConfig::default()
        })
        .with_host(host.clone())
        .on_error(move |fault| {
            seen_hook.lock().unwrap().push(fault);
            async { Ok::<_, io::Error>(()) }
        })
        .build()
        .unwrap();

        let stops = Arc::new(AtomicUsize::new(0));
        sup.register("a", resource(false, stops.clone())).await.unwrap();
        sup.start("a").await.unwrap();
        let mut rx = sup.subscribe();

        host.send_fault(Fault::new(FaultKind::UncaughtPanic, "index out of bounds"));
        host.wait_exit().await;

        assert_eq!(host.exits(), vec![1]);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert_eq!(sup.state("a").await, Some(ResourceState::Stopped));
        assert_eq!(seen.lock().unwrap()[0].message, "index out of bounds");

        let events = drain(&mut rx);
        assert_eq!(count(&events, EventKind::FaultCaptured), 1);
    }

    #[tokio::test]
    async fn test_report_unhandled_reaches_fault_trigger() {
        let host = Arc::new(MockHost::default());
        let sup = Supervisor::builder(SupervisorConfig {
            handle_signals: SignalHandling::Disabled,
            ..SupervisorConfig::default()
        })
        .with_host(host.clone())
        .on_error(|_fault| async { Err::<(), _>("hook also broke") })
        .build()
        .unwrap();
        let mut rx = sup.subscribe();

        assert!(sup.report_unhandled("connection reset"));
        host.wait_exit().await;
        assert_eq!(host.exits(), vec![1]);

        let events = drain(&mut rx);
        let captured = events
            .iter()
            .find(|e| e.kind == EventKind::FaultCaptured)
            .unwrap();
        assert_eq!(
            captured.reason.as_deref(),
            Some("unhandled error: connection reset")
        );
        assert_eq!(count(&events, EventKind::HookFailed), 1);
    }

    #[tokio::test]
    async fn test_trigger_loops_stop_when_supervisor_dropped() {
        let host = Arc::new(MockHost::default());
        let sup = build(host.clone(), signals_only());
        drop(sup);
        tokio::time::sleep(Duration::from_millis(10)).await;

        // The loop is gone, so the receiver was dropped and sending fails.
        let tx = host.signal_tx.lock().unwrap().clone().unwrap();
        assert!(tx.send(Signal::Interrupt).is_err());
        assert!(host.exits().is_empty());
    }

    fn watched() -> (Arc<MockHost>, Arc<Recorder>) {
        let rec = Arc::new(Recorder::default());
        let host = Arc::new(MockHost {
            watch: Some(rec.clone()),
            ..MockHost::default()
        });
        (host, rec)
    }

    #[tokio::test]
    async fn test_subscribers_see_shutdown_failures_before_signal_exit() {
        let (host, rec) = watched();
        let sup = Supervisor::builder(signals_only())
            .with_host(host.clone())
            .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
            .build()
            .unwrap();
        let stops = Arc::new(AtomicUsize::new(0));
        sup.register("bad", resource(true, stops.clone())).await.unwrap();
        sup.start("bad").await.unwrap();

        host.send_signal(Signal::Terminate);
        host.wait_exit().await;

        assert_eq!(host.exits(), vec![1]);
        let seen = host.seen_at_exit.lock().unwrap().clone();
        for kind in [
            EventKind::SignalReceived,
            EventKind::ResourceFailed,
            EventKind::ShutdownStopFailed,
            EventKind::ShutdownCompleted,
        ] {
            assert!(seen.contains(&kind), "{kind:?} missing from {seen:?}");
        }
    }

    #[tokio::test]
    async fn test_subscribers_see_fault_before_fault_exit() {
        let (host, rec) = watched();
        let sup = Supervisor::builder(SupervisorConfig {
            handle_signals: SignalHandling::Disabled,
            ..SupervisorConfig::default()
        })
        .with_host(host.clone())
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .build()
        .unwrap();
        let stops = Arc::new(AtomicUsize::new(0));
        sup.register("a", resource(false, stops.clone())).await.unwrap();
        sup.start("a").await.unwrap();

        host.send_fault(Fault::new(FaultKind::UncaughtPanic, "worker died"));
        host.wait_exit().await;

        assert_eq!(host.exits(), vec![1]);
        let seen = host.seen_at_exit.lock().unwrap().clone();
        for kind in [
            EventKind::FaultCaptured,
            EventKind::ResourceStopped,
            EventKind::ShutdownCompleted,
        ] {
            assert!(seen.contains(&kind), "{kind:?} missing from {seen:?}");
        }
    }
}
