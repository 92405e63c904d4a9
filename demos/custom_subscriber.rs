//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for lifecycle metrics.
//! - Wire the subscriber into [`Supervisor::builder`].
//!
//! ## Flow
//! ```text
//! register / start / stop / shutdown_all
//!     ├─► Bus.publish(ResourceStarting / ResourceRunning / ResourceFailed / ...)
//!     └─► subscriber_listener (in Supervisor)
//!           └─► SubscriberSet.emit() ──► ConsoleSubscriber.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use resvisor::{
    Event, EventKind, ResourceFn, ResourceSpec, Subscribe, Supervisor, SupervisorConfig,
};

/// A console subscriber that prints selected events and counts failures.
#[derive(Default)]
struct ConsoleSubscriber {
    failures: AtomicUsize,
}

#[async_trait::async_trait]
impl Subscribe for ConsoleSubscriber {
    async fn on_event(&self, ev: &Event) {
        let id = ev.resource.as_deref().unwrap_or("<none>");
        match ev.kind {
            // === Lifecycle ===
            EventKind::ResourceStarting | EventKind::ResourceStopping => {
                println!("[sub] {:?}: resource={id}", ev.kind);
            }
            EventKind::ResourceRunning => println!("[sub] running:  resource={id}"),
            EventKind::ResourceStopped => println!("[sub] stopped:  resource={id}"),
            EventKind::ResourceFailed => {
                let n = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                println!(
                    "[sub] failed:   resource={id} reason={} (failures so far: {n})",
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::StopTimeoutHit => {
                let dur = ev.timeout_ms.map(|v| format!("{v}ms")).unwrap_or_default();
                println!("[sub] timeout:  resource={id} timeout={dur}");
            }

            // === Shutdown ===
            EventKind::ShutdownStarted | EventKind::ShutdownCompleted => {
                println!(
                    "[sub] {:?}: {}",
                    ev.kind,
                    ev.reason.as_deref().unwrap_or_default()
                );
            }
            EventKind::ShutdownStopFailed => {
                println!("[sub] shutdown could not stop {id}");
            }

            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

fn quick(name: &'static str) -> ResourceSpec {
    ResourceSpec::new(ResourceFn::arc(
        move || async move {
            println!("[{name}] up");
            Ok::<_, std::io::Error>(name)
        },
        |name: Option<Arc<&'static str>>| async move {
            println!("[{}] down", name.as_deref().copied().unwrap_or("?"));
            Ok::<_, std::io::Error>(())
        },
    ))
}

/// A resource whose stop never finishes; its timeout bounds the shutdown.
fn stuck() -> ResourceSpec {
    ResourceSpec::new(ResourceFn::arc(
        || async { Ok::<_, std::io::Error>(()) },
        |_: Option<Arc<()>>| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, std::io::Error>(())
        },
    ))
    .with_timeout(Duration::from_millis(300))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("custom_subscriber demo\n");

    let console = Arc::new(ConsoleSubscriber::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![console.clone() as Arc<dyn Subscribe>];
    let sup = Supervisor::builder(SupervisorConfig::without_triggers())
        .with_subscribers(subs)
        .build()?;

    sup.register("alpha", quick("alpha")).await?;
    sup.register("bravo", quick("bravo")).await?;
    sup.register("charlie", stuck()).await?;

    for id in sup.ids().await {
        sup.start(&id).await?;
    }

    let report = sup.shutdown_all().await;
    println!(
        "\nshutdown: attempted={} failed={:?} exit_code={}",
        report.attempted,
        report.failed_ids().collect::<Vec<_>>(),
        report.exit_code()
    );

    sup.flush_subscribers().await;
    println!("failures seen by subscriber: {}", console.failures.load(Ordering::Relaxed));
    Ok(())
}
