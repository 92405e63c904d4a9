//! # Resource registry - records and state-machine gating.
//!
//! The registry is the only shared mutable state of the supervisor. It owns one
//! [`Record`] per id and performs every guarded transition under a single
//! write lock, so checking a guard and entering `Starting`/`Stopping` is atomic.
//! The lock is never held while a callback runs.
//!
//! ## Transitions
//! ```text
//! begin_start: Idle/Stopped/Failed ─► Starting         (else Ignored)
//! begin_stop:  Running/Failed      ─► Stopping         (Idle ─► Silent, else Ignored)
//! settle:      Starting ─► Running(instance) | Failed(error)
//!              Stopping ─► Stopped           | Failed(error)
//! ```
//!
//! ## Rules
//! - `instance` is replaced on every successful start and never cleared by stop
//! - `error` is only written on entry into `Failed`
//! - settling a record that was removed meanwhile is a no-op

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::error::{ResourceError, SupervisorError};
use crate::resources::{Instance, ResourceRef, ResourceSpec, ResourceState};

/// Bookkeeping entry for one resource.
struct Record {
    resource: ResourceRef,
    timeout: Duration,
    state: ResourceState,
    instance: Option<Instance>,
    error: Option<ResourceError>,
}

/// Result of a guarded transition attempt.
pub(crate) enum Admission<T> {
    /// Guard passed; the record is now `Starting`/`Stopping`.
    Proceed(T),
    /// Guard blocked; caller should warn.
    Ignored(ResourceState),
    /// Guard blocked on a benign state; caller stays quiet.
    Silent,
}

/// Everything a stop needs, captured when the record entered `Stopping`.
pub(crate) struct StopTicket {
    pub(crate) resource: ResourceRef,
    pub(crate) instance: Option<Instance>,
    pub(crate) timeout: Duration,
}

/// Completion of an in-flight transition.
pub(crate) enum Outcome {
    Running(Instance),
    Stopped,
    Failed(ResourceError),
}

/// Registry of resource records keyed by id.
pub(crate) struct Registry {
    records: RwLock<HashMap<String, Record>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an `Idle` record. Returns the resolved stop timeout.
    pub(crate) async fn insert(
        &self,
        id: &str,
        spec: ResourceSpec,
        default_timeout: Duration,
    ) -> Result<Duration, SupervisorError> {
        let mut records = self.records.write().await;
        if records.contains_key(id) {
            return Err(SupervisorError::AlreadyRegistered { id: id.to_string() });
        }
        let timeout = spec.resolve_timeout(default_timeout);
        records.insert(
            id.to_string(),
            Record {
                resource: spec.resource().clone(),
                timeout,
                state: ResourceState::Idle,
                instance: None,
                error: None,
            },
        );
        Ok(timeout)
    }

    /// Atomically removes a record.
    pub(crate) async fn remove(&self, id: &str) -> bool {
        self.records.write().await.remove(id).is_some()
    }

    /// Guard + `Starting` transition.
    pub(crate) async fn begin_start(
        &self,
        id: &str,
    ) -> Result<Admission<ResourceRef>, SupervisorError> {
        let mut records = self.records.write().await;
        let rec = records
            .get_mut(id)
            .ok_or_else(|| SupervisorError::NotRegistered { id: id.to_string() })?;

        if !rec.state.admits_start() {
            return Ok(Admission::Ignored(rec.state));
        }
        rec.state = ResourceState::Starting;
        Ok(Admission::Proceed(rec.resource.clone()))
    }

    /// Guard + `Stopping` transition.
    pub(crate) async fn begin_stop(
        &self,
        id: &str,
    ) -> Result<Admission<StopTicket>, SupervisorError> {
        let mut records = self.records.write().await;
        let rec = records
            .get_mut(id)
            .ok_or_else(|| SupervisorError::NotRegistered { id: id.to_string() })?;

        match rec.state {
            ResourceState::Idle => return Ok(Admission::Silent),
            s if !s.admits_stop() => return Ok(Admission::Ignored(s)),
            _ => {}
        }
        rec.state = ResourceState::Stopping;
        Ok(Admission::Proceed(StopTicket {
            resource: rec.resource.clone(),
            instance: rec.instance.clone(),
            timeout: rec.timeout,
        }))
    }

    /// Applies the outcome of an in-flight transition. Returns `false` if the record is gone.
    pub(crate) async fn settle(&self, id: &str, outcome: Outcome) -> bool {
        let mut records = self.records.write().await;
        let Some(rec) = records.get_mut(id) else {
            return false;
        };
        match outcome {
            Outcome::Running(instance) => {
                rec.instance = Some(instance);
                rec.state = ResourceState::Running;
            }
            Outcome::Stopped => rec.state = ResourceState::Stopped,
            Outcome::Failed(err) => {
                rec.error = Some(err);
                rec.state = ResourceState::Failed;
            }
        }
        true
    }

    pub(crate) async fn state(&self, id: &str) -> Option<ResourceState> {
        self.records.read().await.get(id).map(|r| r.state)
    }

    pub(crate) async fn instance(&self, id: &str) -> Option<Instance> {
        self.records
            .read()
            .await
            .get(id)
            .and_then(|r| r.instance.clone())
    }

    pub(crate) async fn error(&self, id: &str) -> Option<ResourceError> {
        self.records
            .read()
            .await
            .get(id)
            .and_then(|r| r.error.clone())
    }

    pub(crate) async fn states(&self) -> HashMap<String, ResourceState> {
        self.records
            .read()
            .await
            .iter()
            .map(|(id, r)| (id.clone(), r.state))
            .collect()
    }

    pub(crate) async fn contains(&self, id: &str) -> bool {
        self.records.read().await.contains_key(id)
    }

    pub(crate) async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns sorted list of registered ids.
    pub(crate) async fn ids(&self) -> Vec<String> {
        let records = self.records.read().await;
        let mut ids: Vec<String> = records.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }
}
