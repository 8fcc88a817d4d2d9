//! Job backend capability — the host job-scheduling boundary.
//!
//! A [`JobBackend`] owns timers, dispatch, and uniqueness-by-name:
//! scheduling under an existing name replaces that instance instead of
//! stacking a duplicate. [`TokioBackend`] is the in-process implementation;
//! tests use the on-demand [`FakeBackend`](super::fake::FakeBackend).

use crate::error::{BriefError, Result};
use crate::job::JobOutcome;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Boxed future returned by a job invocation.
pub type JobFuture = Pin<Box<dyn Future<Output = JobOutcome> + Send>>;

/// The work bound to a job name. Each invocation produces a fresh run.
pub type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// Submission parameters for a named job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    /// `Some(interval)` for a periodic job (first run after one interval),
    /// `None` for a one-shot that runs immediately.
    pub repeat: Option<Duration>,
    /// Whether the job must not even be attempted without connectivity.
    pub require_network: bool,
}

impl JobSpec {
    /// One-shot job, dispatched immediately.
    pub fn once() -> Self {
        Self {
            repeat: None,
            require_network: false,
        }
    }

    /// Periodic job with a fixed interval.
    pub fn periodic(every: Duration) -> Self {
        Self {
            repeat: Some(every),
            require_network: false,
        }
    }

    /// Add the network-connected execution constraint.
    pub fn require_network(mut self) -> Self {
        self.require_network = true;
        self
    }
}

/// Scheduling capability with uniqueness-by-name semantics.
pub trait JobBackend: Send + Sync {
    /// Schedule `job` under `name`, replacing any pending or running
    /// instance with the same name.
    fn schedule_unique(&self, name: &str, spec: JobSpec, job: JobFn) -> Result<()>;

    /// Cancel the instance under `name`. A no-op for unknown names.
    fn cancel(&self, name: &str) -> Result<()>;
}

/// Network availability probe consulted before each gated attempt.
pub trait Connectivity: Send + Sync {
    /// Whether the network is currently usable.
    fn is_connected(&self) -> bool;
}

/// Probe that always reports the network as available.
///
/// The fallback when the host exposes no real connectivity signal; an
/// attempt made offline fails as a transport error and retries on the
/// periodic cadence.
pub struct AssumeOnline;

impl Connectivity for AssumeOnline {
    fn is_connected(&self) -> bool {
        true
    }
}

/// In-process backend running jobs on tokio worker tasks.
///
/// One task per job name. Re-scheduling a name aborts and replaces its
/// task; periodic names loop with a fixed sleep (first run after one
/// interval — the immediate fetch is the reconciler's one-shot, not the
/// periodic instance).
pub struct TokioBackend {
    handle: tokio::runtime::Handle,
    connectivity: Arc<dyn Connectivity>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioBackend {
    /// Create a backend on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BriefError::Scheduler`] when called outside a runtime.
    pub fn new() -> Result<Self> {
        Self::with_connectivity(Arc::new(AssumeOnline))
    }

    /// Create a backend with an explicit connectivity probe.
    pub fn with_connectivity(connectivity: Arc<dyn Connectivity>) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| BriefError::Scheduler(format!("no tokio runtime: {e}")))?;
        Ok(Self {
            handle,
            connectivity,
            tasks: Mutex::new(HashMap::new()),
        })
    }

    /// Names with a live (pending or running) task.
    pub fn active(&self) -> Vec<String> {
        let tasks = match self.tasks.lock() {
            Ok(t) => t,
            Err(_) => return Vec::new(),
        };
        let mut names: Vec<String> = tasks.keys().cloned().collect();
        names.sort();
        names
    }
}

impl JobBackend for TokioBackend {
    fn schedule_unique(&self, name: &str, spec: JobSpec, job: JobFn) -> Result<()> {
        let task = match spec.repeat {
            Some(every) => self.handle.spawn(periodic_loop(
                name.to_owned(),
                every,
                spec.require_network,
                Arc::clone(&self.connectivity),
                job,
            )),
            None => self.handle.spawn(run_once(
                name.to_owned(),
                spec.require_network,
                Arc::clone(&self.connectivity),
                job,
            )),
        };

        let mut tasks = self
            .tasks
            .lock()
            .map_err(|e| BriefError::Scheduler(format!("lock poisoned: {e}")))?;
        if let Some(old) = tasks.insert(name.to_owned(), task) {
            old.abort();
            debug!(job = %name, "replaced existing instance");
        }
        Ok(())
    }

    fn cancel(&self, name: &str) -> Result<()> {
        let mut tasks = self
            .tasks
            .lock()
            .map_err(|e| BriefError::Scheduler(format!("lock poisoned: {e}")))?;
        if let Some(task) = tasks.remove(name) {
            task.abort();
            debug!(job = %name, "cancelled");
        }
        Ok(())
    }
}

impl Drop for TokioBackend {
    fn drop(&mut self) {
        if let Ok(tasks) = self.tasks.lock() {
            for task in tasks.values() {
                task.abort();
            }
        }
    }
}

async fn periodic_loop(
    name: String,
    every: Duration,
    require_network: bool,
    connectivity: Arc<dyn Connectivity>,
    job: JobFn,
) {
    loop {
        tokio::time::sleep(every).await;
        if require_network && !connectivity.is_connected() {
            debug!(job = %name, "offline, deferring to next interval");
            continue;
        }
        let outcome = job().await;
        log_outcome(&name, outcome);
    }
}

async fn run_once(
    name: String,
    require_network: bool,
    connectivity: Arc<dyn Connectivity>,
    job: JobFn,
) {
    if require_network && !connectivity.is_connected() {
        debug!(job = %name, "offline, one-shot dropped");
        return;
    }
    let outcome = job().await;
    log_outcome(&name, outcome);
}

fn log_outcome(name: &str, outcome: JobOutcome) {
    match outcome {
        JobOutcome::Succeeded | JobOutcome::Skipped => {
            debug!(job = %name, ?outcome, "job finished");
        }
        JobOutcome::FailedTransient => {
            warn!(job = %name, "job failed transiently, periodic cadence will retry");
        }
        JobOutcome::FailedPermanent => {
            warn!(job = %name, "job failed permanently, not retrying");
        }
    }
}
