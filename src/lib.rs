//! VC Brief background refresh.
//!
//! Fetches the daily brief document from a configured endpoint on a fixed
//! cadence, caches the most recent successful result durably, and exposes
//! that cache to the foreground. The foreground never waits on the network:
//! reads come from the store, and a failed refresh only ever updates the
//! error marker — the last good brief survives.
//!
//! # Architecture
//!
//! - [`store`] — durable key-value store for config and the cached brief,
//!   with atomic per-group commits
//! - [`fetch`] — bounded-timeout HTTP client for the brief endpoint
//! - [`job`] — one refresh run: validate config, fetch, classify, commit
//! - [`scheduler`] — named-job uniqueness and periodic/one-shot
//!   reconciliation over an abstract backend
//! - [`gateway`] — the host shell's surface: `configure` and cache reads

pub mod config;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod job;
pub mod scheduler;
pub mod store;

pub use config::RefreshConfig;
pub use error::{BriefError, Result};
pub use fetch::{BriefClient, FetchOutcome};
pub use gateway::{BriefBackground, CacheSnapshot, ConfigureAck, ConfigureRequest};
pub use job::{run_refresh, JobOutcome, RunToken};
pub use scheduler::{
    FakeBackend, JobBackend, JobSpec, RefreshScheduler, TokioBackend, ONESHOT_JOB_NAME,
    PERIODIC_JOB_NAME, REFRESH_INTERVAL,
};
pub use store::{BriefStore, CachedBrief, FilePrefsStore, MemoryPrefsStore, PrefsStore};
