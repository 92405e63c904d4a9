//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`] - distributes events to multiple subscribers
//! without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//!
//! flush()
//!     └──► marker into every queue ──► each worker acks after the events queued before it
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**
//! - **Per-subscriber FIFO**
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Isolation**: a panicking subscriber is reported and keeps receiving events
//! - **Flush**: [`SubscriberSet::flush`] returns once every worker has handled everything queued before the call

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::core::runner;
use crate::error::ResourceError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Item carried by a subscriber queue.
enum Delivery {
    Event(Arc<Event>),
    /// Acked once every earlier item in the queue was handled.
    Flush(oneshot::Sender<()>),
}

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Delivery>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Delivery>(cap);
            let bus_for_worker = bus.clone();

            tokio::spawn(async move {
                while let Some(item) = rx.recv().await {
                    let ev = match item {
                        Delivery::Event(ev) => ev,
                        Delivery::Flush(ack) => {
                            let _ = ack.send(());
                            continue;
                        }
                    };
                    if let Err(err) = runner::contained(sub.on_event(ev.as_ref())).await {
                        let info = match err {
                            ResourceError::Panicked { message } => message,
                            other => other.to_string(),
                        };
                        bus_for_worker.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
        }
        Self { channels, bus }
    }

    /// Number of subscribers in the set.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if the set has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to all subscribers (non-blocking, uses `try_send`).
    ///
    /// Overflow events are never re-published on overflow, which prevents feedback loops.
    pub fn emit(&self, event: &Event) {
        if self.channels.is_empty() {
            return;
        }
        let event = Arc::new(event.clone());
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Delivery::Event(Arc::clone(&event))) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Waits until every worker has handled the events queued before this call.
    ///
    /// Waits for queue space if a queue is full; a closed worker is skipped.
    pub async fn flush(&self) {
        let mut acks = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let (tx, rx) = oneshot::channel();
            if channel.sender.send(Delivery::Flush(tx)).await.is_ok() {
                acks.push(rx);
            }
        }
        for ack in acks {
            let _ = ack.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.kinds.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Exploder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Subscribe for Exploder {
        async fn on_event(&self, _ev: &Event) {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first event explodes");
            }
        }
        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    #[tokio::test]
    async fn test_delivers_in_order() {
        let bus = Bus::new(16);
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>], bus);

        set.emit(&Event::new(EventKind::ShutdownStarted));
        set.emit(&Event::new(EventKind::ShutdownCompleted));
        set.flush().await;

        assert_eq!(
            *rec.kinds.lock().unwrap(),
            vec![EventKind::ShutdownStarted, EventKind::ShutdownCompleted]
        );
    }

    #[tokio::test]
    async fn test_panic_is_reported_and_worker_survives() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let exploder = Arc::new(Exploder {
            calls: AtomicUsize::new(0),
        });
        let set = SubscriberSet::new(vec![exploder.clone() as Arc<dyn Subscribe>], bus);

        set.emit(&Event::new(EventKind::ResourceRunning));
        set.emit(&Event::new(EventKind::ResourceStopped));
        set.flush().await;

        assert_eq!(exploder.calls.load(Ordering::SeqCst), 2);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.resource.as_deref(), Some("exploder"));
        assert_eq!(ev.reason.as_deref(), Some("first event explodes"));
    }

    struct Slow {
        done: AtomicUsize,
    }

    #[async_trait]
    impl Subscribe for Slow {
        async fn on_event(&self, _ev: &Event) {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.done.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_flush_waits_for_slow_subscriber() {
        let slow = Arc::new(Slow {
            done: AtomicUsize::new(0),
        });
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(
            vec![slow.clone() as Arc<dyn Subscribe>, rec.clone() as Arc<dyn Subscribe>],
            Bus::new(16),
        );

        for _ in 0..3 {
            set.emit(&Event::new(EventKind::ResourceFailed));
        }
        set.flush().await;

        assert_eq!(slow.done.load(Ordering::SeqCst), 3);
        assert_eq!(rec.kinds.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_flush_without_subscribers_returns() {
        let set = SubscriberSet::new(Vec::new(), Bus::new(4));
        assert!(set.is_empty());
        set.flush().await;
    }
}
