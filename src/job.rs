//! The refresh job: one configuration check, one fetch attempt, one commit.
//!
//! Outcome classification is the retry policy. Server-side and transport
//! failures are worth retrying; client errors are not — a 4xx will not
//! self-resolve, and hammering a misconfigured endpoint helps nobody.
//! Skipping because refresh is disabled or unconfigured is a valid state,
//! never a failure.

use crate::fetch::{BriefClient, FetchOutcome};
use crate::store::BriefStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Terminal state of one refresh run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Fetched a 2xx body and committed it to the cache.
    Succeeded,
    /// Refresh disabled or unconfigured; nothing attempted. Also reported
    /// when a superseded run declined to commit its result.
    Skipped,
    /// Client-side failure (non-2xx, non-5xx). Recorded, not retried.
    FailedPermanent,
    /// Server-side or transport failure. Recorded; retried by the
    /// scheduler's periodic cadence.
    FailedTransient,
}

impl JobOutcome {
    /// Whether this outcome asks the scheduling facility to retry.
    ///
    /// Everything except a transient failure reports "done" — including
    /// permanent failures, which are recorded in the cache but must not
    /// trigger a retry loop.
    pub fn signals_retry(self) -> bool {
        matches!(self, Self::FailedTransient)
    }
}

/// Retry classification of an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// 2xx — success.
    Success,
    /// 5xx — transient, retry.
    Transient,
    /// Anything else — permanent, no retry.
    Permanent,
}

/// Classify an HTTP status code for retry purposes.
pub fn retry_class(status: u16) -> RetryClass {
    match status {
        200..=299 => RetryClass::Success,
        500..=599 => RetryClass::Transient,
        _ => RetryClass::Permanent,
    }
}

/// Supersession guard for a single refresh run.
///
/// A token snapshots the scheduler's generation counter when the run
/// starts. Reconciling or cancelling bumps the counter, so a run that was
/// superseded mid-flight fails [`is_current`](Self::is_current) and must
/// not commit its result — cancellation is effective at commit time, not
/// just at submission time.
#[derive(Debug, Clone)]
pub struct RunToken {
    generation: Arc<AtomicU64>,
    started_at: u64,
}

impl RunToken {
    /// Snapshot the current generation at run start.
    pub fn begin(generation: &Arc<AtomicU64>) -> Self {
        Self {
            generation: Arc::clone(generation),
            started_at: generation.load(Ordering::SeqCst),
        }
    }

    /// Token that can never be superseded, for direct invocations.
    pub fn detached() -> Self {
        Self::begin(&Arc::new(AtomicU64::new(0)))
    }

    /// `true` while no reconcile or cancel has happened since run start.
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.started_at
    }
}

/// Run one refresh: validate config, fetch today's brief, commit the outcome.
///
/// All cache writes are gated on `token` — a superseded run exits as
/// [`JobOutcome::Skipped`] without touching the store.
pub async fn run_refresh(store: &BriefStore, client: &BriefClient, token: &RunToken) -> JobOutcome {
    let config = match store.config() {
        Ok(c) => c,
        Err(e) => {
            // An unreadable config is treated like an unconfigured one.
            warn!(error = %e, "refresh skipped: cannot read config");
            return JobOutcome::Skipped;
        }
    };

    if !config.is_active() {
        debug!("refresh skipped: disabled or no api base");
        return JobOutcome::Skipped;
    }

    let date = chrono::Local::now().date_naive();
    let outcome = client.fetch(&config.api_base, date).await;

    if !token.is_current() {
        debug!("refresh superseded mid-flight, discarding result");
        return JobOutcome::Skipped;
    }

    match outcome {
        FetchOutcome::Success(body) => {
            let now_ms = chrono::Utc::now().timestamp_millis();
            match store.record_success(&body, now_ms) {
                Ok(()) => {
                    info!(bytes = body.len(), "brief refreshed");
                    JobOutcome::Succeeded
                }
                Err(e) => {
                    warn!(error = %e, "fetched brief but cache commit failed");
                    JobOutcome::FailedTransient
                }
            }
        }
        FetchOutcome::HttpStatus(code) => {
            let marker = format!("http_{code}");
            if let Err(e) = store.record_failure(&marker) {
                warn!(error = %e, "cannot record fetch failure");
            }
            match retry_class(code) {
                RetryClass::Transient => {
                    warn!(status = code, "brief fetch failed, will retry");
                    JobOutcome::FailedTransient
                }
                _ => {
                    warn!(status = code, "brief fetch rejected, not retrying");
                    JobOutcome::FailedPermanent
                }
            }
        }
        FetchOutcome::Transport(cause) => {
            if let Err(e) = store.record_failure(&cause) {
                warn!(error = %e, "cannot record fetch failure");
            }
            warn!(cause = %cause, "brief fetch transport failure, will retry");
            JobOutcome::FailedTransient
        }
    }
}
