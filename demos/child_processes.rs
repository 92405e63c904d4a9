//! # Example: child_processes
//!
//! Supervises two long-running child processes and tears them down on Ctrl-C.
//!
//! Shows how to:
//! - Implement the [`Resource`] trait for a type that owns its own config.
//! - Use [`ResourceFn`] for a quick closure-backed resource.
//! - Render lifecycle events with [`LogWriter`] + `tracing-subscriber`.
//! - Run a pre-shutdown hook from the signal trigger.
//!
//! ## Flow
//! ```text
//! register("sleeper"), register("ticker")
//!     └─► start() each ─► Running(Child)
//! Ctrl-C
//!     └─► signal trigger
//!           ├─► on_signal hook
//!           ├─► shutdown_all() ─► stop(child) for every resource, bounded by timeout
//!           └─► exit(0 | 1)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example child_processes
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use resvisor::{
    Instance, LogWriter, Resource, ResourceError, ResourceFn, ResourceSpec, Subscribe,
    Supervisor, SupervisorConfig,
};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// A child process started from a fixed program and argument list.
struct ChildProcess {
    program: &'static str,
    args: Vec<&'static str>,
}

#[async_trait]
impl Resource for ChildProcess {
    async fn start(&self) -> Result<Instance, ResourceError> {
        let child = Command::new(self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .spawn()
            .map_err(ResourceError::new)?;
        println!("[{}] spawned pid={:?}", self.program, child.id());
        Ok(Arc::new(Mutex::new(child)))
    }

    async fn stop(&self, instance: Option<Instance>) -> Result<(), ResourceError> {
        let Some(child) = instance.and_then(|i| i.downcast::<Mutex<Child>>().ok()) else {
            return Ok(());
        };
        let mut child = child.lock().await;
        child.kill().await.map_err(ResourceError::new)?;
        println!("[{}] exited: {:?}", self.program, child.wait().await.ok());
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = SupervisorConfig {
        default_timeout: Duration::from_secs(3),
        ..SupervisorConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(cfg)
        .with_subscribers(subs)
        .on_signal(|sig| async move {
            println!("received {sig}, stopping children");
            Ok::<_, std::io::Error>(())
        })
        .build()?;

    sup.register(
        "sleeper",
        ResourceSpec::new(Arc::new(ChildProcess {
            program: "sleep",
            args: vec!["3600"],
        })),
    )
    .await?;

    let ticker = ResourceFn::arc(
        || async {
            Command::new("sh")
                .args(["-c", "while true; do date; sleep 2; done"])
                .kill_on_drop(true)
                .spawn()
                .map(Mutex::new)
        },
        |child: Option<Arc<Mutex<Child>>>| async move {
            match child {
                Some(child) => child.lock().await.kill().await,
                None => Ok(()),
            }
        },
    );
    sup.register(
        "ticker",
        ResourceSpec::new(ticker).with_timeout(Duration::from_secs(1)),
    )
    .await?;

    for id in sup.ids().await {
        sup.start(&id).await?;
    }
    println!("running {:?}; press Ctrl-C to stop", sup.states().await);

    // The signal trigger exits the process after shutdown.
    std::future::pending::<()>().await;
    Ok(())
}
