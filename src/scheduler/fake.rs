//! In-memory job backend for tests.
//!
//! Records submissions instead of running timers; tests fire scheduled jobs
//! on demand and inspect what is registered. Uniqueness-by-name matches the
//! real backend: scheduling an existing name replaces it.

use super::backend::{JobBackend, JobFn, JobSpec};
use crate::error::{BriefError, Result};
use crate::job::JobOutcome;
use std::collections::HashMap;
use std::sync::Mutex;

/// On-demand fake backend.
#[derive(Default)]
pub struct FakeBackend {
    jobs: Mutex<HashMap<String, (JobSpec, JobFn)>>,
}

impl FakeBackend {
    /// Create an empty fake backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted names of currently scheduled jobs.
    pub fn scheduled(&self) -> Vec<String> {
        let jobs = match self.jobs.lock() {
            Ok(j) => j,
            Err(_) => return Vec::new(),
        };
        let mut names: Vec<String> = jobs.keys().cloned().collect();
        names.sort();
        names
    }

    /// The spec a name was scheduled with, if any.
    pub fn spec(&self, name: &str) -> Option<JobSpec> {
        self.jobs
            .lock()
            .ok()
            .and_then(|jobs| jobs.get(name).map(|(spec, _)| spec.clone()))
    }

    /// Run the job scheduled under `name` to completion.
    ///
    /// Returns `None` when nothing is scheduled under that name — which is
    /// exactly what a cancelled job should produce.
    pub async fn fire(&self, name: &str) -> Option<JobOutcome> {
        let job = {
            let jobs = self.jobs.lock().ok()?;
            jobs.get(name).map(|(_, job)| job.clone())?
        };
        Some(job().await)
    }
}

impl JobBackend for FakeBackend {
    fn schedule_unique(&self, name: &str, spec: JobSpec, job: JobFn) -> Result<()> {
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|e| BriefError::Scheduler(format!("lock poisoned: {e}")))?;
        jobs.insert(name.to_owned(), (spec, job));
        Ok(())
    }

    fn cancel(&self, name: &str) -> Result<()> {
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|e| BriefError::Scheduler(format!("lock poisoned: {e}")))?;
        jobs.remove(name);
        Ok(())
    }
}
