//! Jenkins build host implementation.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::JenkinsConfig;

use super::{
    BuildCause, BuildHost, BuildHostError, BuildParameters, JobInfo, CAUSE_PARAMETER,
};

/// Jenkins REST client.
///
/// The job inventory (job name plus the git URLs it checks out) comes from
/// configuration and is cross-checked against the controller's job list, so
/// a typo in the config surfaces as a warning instead of silent no-ops.
pub struct JenkinsClient {
    client: Client,
    config: JenkinsConfig,
}

#[derive(Debug, Deserialize)]
struct JobListResponse {
    jobs: Vec<JobEntry>,
}

#[derive(Debug, Deserialize)]
struct JobEntry {
    name: String,
}

impl JenkinsClient {
    /// Create a new Jenkins client from configuration.
    pub fn new(config: JenkinsConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.config.username, Some(&self.config.api_token))
    }

    async fn check_status(response: Response) -> Result<Response, BuildHostError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BuildHostError::JobNotFound(status.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BuildHostError::ApiError(format!("HTTP {}: {}", status, body)));
        }
        Ok(response)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> BuildHostError {
    if e.is_timeout() {
        BuildHostError::Timeout
    } else if e.is_connect() {
        BuildHostError::ConnectionFailed(e.to_string())
    } else {
        BuildHostError::ApiError(e.to_string())
    }
}

#[async_trait]
impl BuildHost for JenkinsClient {
    fn name(&self) -> &str {
        "jenkins"
    }

    async fn list_jobs(&self) -> Result<Vec<JobInfo>, BuildHostError> {
        let url = format!("{}/api/json?tree=jobs[name]", self.base_url());
        let response = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = Self::check_status(response).await?;
        let listing: JobListResponse = response.json().await.map_err(map_reqwest_error)?;

        let known: HashSet<&str> = listing.jobs.iter().map(|j| j.name.as_str()).collect();

        let mut jobs = Vec::new();
        for job in &self.config.jobs {
            if !known.contains(job.name.as_str()) {
                warn!("Configured job {} does not exist on the controller", job.name);
                continue;
            }
            jobs.push(JobInfo::new(job.name.clone(), job.git_urls.clone()));
        }
        Ok(jobs)
    }

    async fn trigger_build(
        &self,
        job: &JobInfo,
        params: &BuildParameters,
        cause: &BuildCause,
    ) -> Result<(), BuildHostError> {
        let url = format!(
            "{}/job/{}/buildWithParameters",
            self.base_url(),
            urlencoding::encode(&job.name)
        );

        let cause_json = serde_json::to_string(cause)
            .map_err(|e| BuildHostError::ApiError(format!("cause serialization: {}", e)))?;
        let change_number = params.change_number.to_string();
        let patchset_number = params.patchset_number.to_string();

        let form = [
            ("GERRIT_PROJECT", params.project.as_str()),
            ("GERRIT_BRANCH", params.branch.as_str()),
            ("GERRIT_CHANGE_NUMBER", change_number.as_str()),
            ("GERRIT_PATCHSET_NUMBER", patchset_number.as_str()),
            (CAUSE_PARAMETER, cause_json.as_str()),
        ];

        debug!("Triggering {} for {}", job.name, cause.build);
        let response = self
            .authed(self.client.post(&url).form(&form))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::check_status(response).await?;

        Ok(())
    }

    async fn cancel_build(&self, run_url: &str) -> Result<(), BuildHostError> {
        let url = format!("{}/stop", run_url.trim_end_matches('/'));
        let response = self
            .authed(self.client.post(&url))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::check_status(response).await?;

        Ok(())
    }
}
