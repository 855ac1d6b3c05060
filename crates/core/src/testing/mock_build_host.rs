//! Mock build host for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::buildhost::{BuildCause, BuildHost, BuildHostError, BuildParameters, JobInfo};

/// A recorded trigger request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTrigger {
    pub job_name: String,
    pub params: BuildParameters,
    pub cause: BuildCause,
    /// When the trigger was requested.
    pub timestamp: chrono::DateTime<Utc>,
}

/// Mock implementation of the BuildHost trait.
///
/// Provides controllable behavior for testing:
/// - Seed the job inventory
/// - Record trigger and cancel calls for assertions
/// - Simulate failures
pub struct MockBuildHost {
    /// Jobs returned by `list_jobs`.
    jobs: Arc<RwLock<Vec<JobInfo>>>,
    /// Recorded trigger_build calls.
    triggers: Arc<RwLock<Vec<RecordedTrigger>>>,
    /// Recorded cancel_build run URLs.
    cancelled: Arc<RwLock<Vec<String>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<BuildHostError>>>,
    /// If set, the next trigger_build call specifically will fail.
    next_trigger_error: Arc<RwLock<Option<BuildHostError>>>,
}

impl Default for MockBuildHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBuildHost {
    /// Create a new mock build host.
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Vec::new())),
            triggers: Arc::new(RwLock::new(Vec::new())),
            cancelled: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            next_trigger_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Add a job to the inventory.
    pub async fn add_job(&self, job: JobInfo) {
        self.jobs.write().await.push(job);
    }

    /// Get all recorded trigger_build calls.
    pub async fn triggered_builds(&self) -> Vec<RecordedTrigger> {
        self.triggers.read().await.clone()
    }

    /// Get all recorded cancel_build run URLs.
    pub async fn cancelled_builds(&self) -> Vec<String> {
        self.cancelled.read().await.clone()
    }

    /// Clear recorded triggers and cancellations.
    pub async fn clear_recorded(&self) {
        self.triggers.write().await.clear();
        self.cancelled.write().await.clear();
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: BuildHostError) {
        *self.next_error.write().await = Some(error);
    }

    /// Configure only the next trigger_build call to fail.
    pub async fn set_next_trigger_error(&self, error: BuildHostError) {
        *self.next_trigger_error.write().await = Some(error);
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<BuildHostError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl BuildHost for MockBuildHost {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_jobs(&self) -> Result<Vec<JobInfo>, BuildHostError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(self.jobs.read().await.clone())
    }

    async fn trigger_build(
        &self,
        job: &JobInfo,
        params: &BuildParameters,
        cause: &BuildCause,
    ) -> Result<(), BuildHostError> {
        if let Some(err) = self.next_trigger_error.write().await.take() {
            return Err(err);
        }
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.triggers.write().await.push(RecordedTrigger {
            job_name: job.name.clone(),
            params: params.clone(),
            cause: cause.clone(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn cancel_build(&self, run_url: &str) -> Result<(), BuildHostError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.cancelled.write().await.push(run_url.to_string());
        Ok(())
    }
}
