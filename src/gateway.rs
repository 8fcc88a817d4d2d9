//! Host-facing gateway: configuration writes and cache reads.
//!
//! This is the surface the app shell's bridge calls into. Both operations
//! are synchronous and infallible from the caller's perspective: configure
//! persists and reconciles with failures logged (they surface later via
//! `lastError`), and the cache read never performs network I/O.

use crate::config::RefreshConfig;
use crate::error::Result;
use crate::fetch::BriefClient;
use crate::scheduler::{JobBackend, RefreshScheduler, TokioBackend};
use crate::store::{BriefStore, CachedBrief, FilePrefsStore};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// `configure` call payload. Both fields are optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigureRequest {
    /// Brief API base URL. Missing means empty (unconfigured).
    pub api_base: Option<String>,
    /// Whether background refresh is enabled. Missing means enabled.
    pub enabled: Option<bool>,
}

/// `configure` acknowledgement. Always `ok: true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureAck {
    /// Present for bridge-contract compatibility; never false.
    pub ok: bool,
}

/// Foreground view of the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    /// Raw brief body from the last successful fetch, or empty.
    pub json: String,
    /// Epoch millis of the last successful fetch, or zero.
    pub cached_at_ms: i64,
    /// Last fetch error marker, or empty.
    pub last_error: String,
}

impl From<CachedBrief> for CacheSnapshot {
    fn from(cached: CachedBrief) -> Self {
        Self {
            json: cached.json,
            cached_at_ms: cached.cached_at_ms,
            last_error: cached.last_error,
        }
    }
}

/// The background-refresh service as exposed to the host shell.
pub struct BriefBackground {
    store: BriefStore,
    scheduler: RefreshScheduler,
    // Serializes configure calls: persist-then-reconcile must not interleave.
    configure_lock: Mutex<()>,
}

impl BriefBackground {
    /// Assemble the service from explicit parts.
    pub fn new(store: BriefStore, scheduler: RefreshScheduler) -> Self {
        Self {
            store,
            scheduler,
            configure_lock: Mutex::new(()),
        }
    }

    /// Assemble the service with the default durable store, the standard
    /// fetch client, and the in-process tokio backend.
    ///
    /// Must be called within a tokio runtime.
    pub fn with_defaults() -> Result<Self> {
        let store = BriefStore::new(Arc::new(FilePrefsStore::open_default()?));
        let client = Arc::new(BriefClient::new()?);
        let backend: Arc<dyn JobBackend> = Arc::new(TokioBackend::new()?);
        let scheduler = RefreshScheduler::new(backend, store.clone(), client);
        Ok(Self::new(store, scheduler))
    }

    /// Apply a configuration change.
    ///
    /// The normalized config is persisted unconditionally — a disabled
    /// intent is durable too — and the scheduler is reconciled afterwards.
    /// Store or scheduling failures are logged, never returned: the caller
    /// always gets `ok: true`, and fetch problems show up in `lastError`.
    pub fn configure(&self, request: ConfigureRequest) -> ConfigureAck {
        let _guard = self.configure_lock.lock().unwrap_or_else(|e| e.into_inner());

        let config = RefreshConfig::normalized(
            request.api_base.as_deref().unwrap_or(""),
            request.enabled.unwrap_or(true),
        );

        if let Err(e) = self.store.save_config(&config) {
            warn!(error = %e, "cannot persist refresh config");
        }
        if let Err(e) = self.scheduler.reconcile(&config) {
            warn!(error = %e, "cannot reconcile refresh jobs");
        }

        ConfigureAck { ok: true }
    }

    /// Read the cached brief. Pure store read; no network on this path.
    pub fn cache(&self) -> CacheSnapshot {
        match self.store.cached() {
            Ok(cached) => cached.into(),
            Err(e) => {
                warn!(error = %e, "cannot read cached brief");
                CacheSnapshot::default()
            }
        }
    }
}
