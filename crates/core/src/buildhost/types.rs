//! Types for the build host abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{BuildKey, BuildTarget, SubmitGroup};

/// Name of the build parameter carrying the JSON-serialized [`BuildCause`].
pub const CAUSE_PARAMETER: &str = "GROUPCI_CAUSE";

/// Errors that can occur talking to the build host.
#[derive(Debug, Error)]
pub enum BuildHostError {
    #[error("Build host connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Build host API error: {0}")]
    ApiError(String),

    #[error("Build job not found: {0}")]
    JobNotFound(String),

    #[error("Request timeout")]
    Timeout,
}

/// Matching capability: does a build job cover a given review project?
pub trait ProjectMatcher {
    fn matches_project(&self, project: &str) -> bool;
}

/// A buildable job on the host: its handle (name) plus the git checkout
/// URLs it builds from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub name: String,
    pub checkout_urls: Vec<String>,
}

impl JobInfo {
    pub fn new(name: impl Into<String>, checkout_urls: Vec<String>) -> Self {
        Self {
            name: name.into(),
            checkout_urls,
        }
    }
}

impl ProjectMatcher for JobInfo {
    /// A job matches a project when one of its checkout URLs has path
    /// `/<project>` or `/a/<project>` (a trailing `.git` is ignored).
    fn matches_project(&self, project: &str) -> bool {
        self.checkout_urls.iter().any(|url| {
            let path = url_path(url).trim_end_matches(".git");
            path == format!("/{}", project) || path == format!("/a/{}", project)
        })
    }
}

/// The path component of a URL, without scheme, authority or query.
fn url_path(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    match rest.find('/') {
        Some(idx) => {
            let path = &rest[idx..];
            path.split(['?', '#']).next().unwrap_or(path)
        }
        None => "",
    }
}

/// Parameters passed to a triggered build, mirroring the classic Gerrit
/// trigger variable names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildParameters {
    pub project: String,
    pub branch: String,
    pub change_number: u32,
    pub patchset_number: u32,
}

impl From<&BuildTarget> for BuildParameters {
    fn from(target: &BuildTarget) -> Self {
        Self {
            project: target.project.clone(),
            branch: target.branch.clone(),
            change_number: target.change_number(),
            patchset_number: target.patchset(),
        }
    }
}

/// Cause metadata attached to every triggered build and carried back
/// verbatim by start/finish notifications. This is how an asynchronous
/// event is routed to its submit group's status record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCause {
    pub group: SubmitGroup,
    pub build: BuildKey,
}

/// A concrete run on the build host, as reported by a notification.
#[derive(Debug, Clone)]
pub struct BuildRun {
    pub cause: BuildCause,
    /// Absolute URL of the run's report page.
    pub url: String,
}

/// Final outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildOutcome {
    Success,
    Failure,
}

/// Trait for build host backends.
#[async_trait]
pub trait BuildHost: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// The jobs currently available for triggering.
    async fn list_jobs(&self) -> Result<Vec<JobInfo>, BuildHostError>;

    /// Trigger a parameterized build of `job`, attaching `cause` so that
    /// notifications can be routed back.
    async fn trigger_build(
        &self,
        job: &JobInfo,
        params: &BuildParameters,
        cause: &BuildCause,
    ) -> Result<(), BuildHostError>;

    /// Interrupt a run whose submit group is no longer tracked.
    async fn cancel_build(&self, run_url: &str) -> Result<(), BuildHostError>;
}
