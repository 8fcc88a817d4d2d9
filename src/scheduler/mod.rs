//! Refresh scheduling: job identity, uniqueness, and reconciliation.
//!
//! The scheduler owns two logical job names — the periodic refresh and its
//! one-shot "refresh now" variant — and reconciles them against the current
//! configuration. It does not run its own thread: work is registered with a
//! [`JobBackend`], which dispatches runs on its worker context.

pub mod backend;
pub mod fake;

pub use backend::{AssumeOnline, Connectivity, JobBackend, JobFn, JobFuture, JobSpec, TokioBackend};
pub use fake::FakeBackend;

use crate::config::RefreshConfig;
use crate::error::Result;
use crate::fetch::BriefClient;
use crate::job::{run_refresh, RunToken};
use crate::store::BriefStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Fixed name of the periodic refresh job.
pub const PERIODIC_JOB_NAME: &str = "vcbrief.brief_refresh";

/// Name of the one-shot "refresh now" variant. The `.once` suffix matches
/// previously persisted job state and must not change.
pub const ONESHOT_JOB_NAME: &str = "vcbrief.brief_refresh.once";

/// Cadence of the periodic refresh.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Reconciles the two refresh jobs against the configuration.
///
/// Every reconcile bumps a generation counter; in-flight runs carry a
/// [`RunToken`] snapshot of it, so a run superseded by a later `configure`
/// cannot commit a stale result (see [`run_refresh`]).
pub struct RefreshScheduler {
    backend: Arc<dyn JobBackend>,
    store: BriefStore,
    client: Arc<BriefClient>,
    generation: Arc<AtomicU64>,
}

impl RefreshScheduler {
    /// Create a scheduler over the given backend, store, and fetch client.
    pub fn new(backend: Arc<dyn JobBackend>, store: BriefStore, client: Arc<BriefClient>) -> Self {
        Self {
            backend,
            store,
            client,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Bring scheduled state in line with `config`.
    ///
    /// Active config: the periodic instance is enqueued-or-updated at the
    /// fixed interval, and one immediate one-shot replaces any pending
    /// one-shot — a rapid sequence of configure calls collapses to the
    /// latest intent. Inactive config: both instances are cancelled.
    pub fn reconcile(&self, config: &RefreshConfig) -> Result<()> {
        // Supersede any run dispatched before this call.
        self.generation.fetch_add(1, Ordering::SeqCst);

        if config.is_active() {
            let job = self.job_fn();
            self.backend.schedule_unique(
                PERIODIC_JOB_NAME,
                JobSpec::periodic(REFRESH_INTERVAL).require_network(),
                Arc::clone(&job),
            )?;
            self.backend
                .schedule_unique(ONESHOT_JOB_NAME, JobSpec::once().require_network(), job)?;
            info!(api_base = %config.api_base, "refresh scheduled (periodic + immediate)");
        } else {
            self.backend.cancel(PERIODIC_JOB_NAME)?;
            self.backend.cancel(ONESHOT_JOB_NAME)?;
            info!("refresh cancelled (disabled or unconfigured)");
        }
        Ok(())
    }

    /// Bind the refresh job to this scheduler's store, client, and
    /// generation counter. Each invocation snapshots a fresh [`RunToken`].
    fn job_fn(&self) -> JobFn {
        let store = self.store.clone();
        let client = Arc::clone(&self.client);
        let generation = Arc::clone(&self.generation);
        Arc::new(move || {
            let store = store.clone();
            let client = Arc::clone(&client);
            let token = RunToken::begin(&generation);
            Box::pin(async move { run_refresh(&store, &client, &token).await })
        })
    }
}
