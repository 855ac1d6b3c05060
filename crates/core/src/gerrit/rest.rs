//! Gerrit REST API client implementation.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GerritConfig;
use crate::model::Change;

use super::bundle::PreviewBundle;
use super::{GerritClient, GerritError};

/// Gerrit prepends this to every JSON response to defeat XSSI.
const XSSI_PREFIX: &str = ")]}'";

/// The review label this service reads and votes on.
const VERIFIED_LABEL: &str = "Verified";

/// REST client for Gerrit's authenticated `/a/` endpoints.
pub struct GerritRestClient {
    client: Client,
    config: GerritConfig,
}

/// Change representation on the wire, trimmed to the fields we consume.
#[derive(Debug, Deserialize)]
struct ChangeInfo {
    #[serde(rename = "_number")]
    number: u32,
    id: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    current_revision: Option<String>,
    #[serde(default)]
    revisions: Option<HashMap<String, RevisionInfo>>,
    #[serde(default)]
    labels: Option<HashMap<String, LabelInfo>>,
}

#[derive(Debug, Deserialize)]
struct RevisionInfo {
    #[serde(rename = "_number")]
    number: u32,
}

#[derive(Debug, Default, Deserialize)]
struct LabelInfo {
    #[serde(default)]
    approved: Option<serde_json::Value>,
    #[serde(default)]
    disliked: Option<serde_json::Value>,
    #[serde(default)]
    rejected: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ReviewInput<'a> {
    message: &'a str,
    labels: HashMap<&'static str, i32>,
    notify: &'static str,
}

impl GerritRestClient {
    /// Create a new client from configuration.
    pub fn new(config: GerritConfig) -> Self {
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
        builder.basic_auth(&self.config.username, Some(&self.config.http_password))
    }

    async fn check_status(response: Response) -> Result<Response, GerritError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GerritError::AuthenticationFailed(status.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GerritError::ApiError(format!("HTTP {}: {}", status, body)));
        }
        Ok(response)
    }

    /// Fetch a JSON endpoint, stripping Gerrit's XSSI prefix.
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, GerritError> {
        let response = self
            .authed(self.client.get(url))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = Self::check_status(response).await?;

        let body = response.text().await.map_err(map_reqwest_error)?;
        let json = body
            .strip_prefix(XSSI_PREFIX)
            .unwrap_or(&body)
            .trim_start();

        serde_json::from_str(json)
            .map_err(|e| GerritError::UnexpectedResponse(format!("invalid JSON: {}", e)))
    }

    /// Query changes with the options needed to build a [`Change`].
    async fn query_changes(&self, query: &str, limit: u32) -> Result<Vec<ChangeInfo>, GerritError> {
        let url = format!(
            "{}/a/changes/?q={}&n={}&o=CURRENT_REVISION&o=LABELS",
            self.base_url(),
            urlencoding::encode(query),
            limit
        );
        debug!("Querying changes: {}", query);
        self.get_json(&url).await
    }

    /// The submitted_together endpoint omits labels and the current
    /// revision, so each member is re-queried individually.
    async fn enrich_change(&self, number: u32) -> Result<Option<ChangeInfo>, GerritError> {
        let mut infos = self.query_changes(&format!("change:{}", number), 1).await?;
        if infos.is_empty() {
            return Ok(None);
        }
        Ok(Some(infos.swap_remove(0)))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GerritError {
    if e.is_timeout() {
        GerritError::Timeout
    } else if e.is_connect() {
        GerritError::ConnectionFailed(e.to_string())
    } else {
        GerritError::ApiError(e.to_string())
    }
}

impl TryFrom<ChangeInfo> for Change {
    type Error = GerritError;

    fn try_from(info: ChangeInfo) -> Result<Self, Self::Error> {
        let current = info.current_revision.as_deref().ok_or_else(|| {
            GerritError::UnexpectedResponse(format!("change {} has no current revision", info.number))
        })?;
        let patchset = info
            .revisions
            .as_ref()
            .and_then(|revisions| revisions.get(current))
            .map(|r| r.number)
            .ok_or_else(|| {
                GerritError::UnexpectedResponse(format!(
                    "change {} is missing revision {}",
                    info.number, current
                ))
            })?;

        // Any Verified vote, positive or negative, means the patchset was
        // already exercised and needs no rebuild.
        let verified = info
            .labels
            .as_ref()
            .and_then(|labels| labels.get(VERIFIED_LABEL))
            .map(|label| {
                label.approved.is_some() || label.disliked.is_some() || label.rejected.is_some()
            })
            .unwrap_or(false);

        Ok(Change::new(info.number, patchset, info.id, info.subject, verified))
    }
}

#[async_trait]
impl GerritClient for GerritRestClient {
    fn name(&self) -> &str {
        "gerrit-rest"
    }

    async fn fetch_open_changes(&self) -> Result<HashSet<Change>, GerritError> {
        let infos = self
            .query_changes(&self.config.query, self.config.change_limit)
            .await?;

        infos.into_iter().map(Change::try_from).collect()
    }

    async fn submitted_together(&self, change: &Change) -> Result<Vec<Change>, GerritError> {
        let url = format!(
            "{}/a/changes/{}/submitted_together",
            self.base_url(),
            change.number
        );
        let members: Vec<ChangeInfo> = self.get_json(&url).await?;

        let mut changes = Vec::with_capacity(members.len());
        for member in members {
            match self.enrich_change(member.number).await? {
                Some(info) => changes.push(Change::try_from(info)?),
                None => {
                    return Err(GerritError::UnexpectedResponse(format!(
                        "submitted_together member {} not found by query",
                        member.number
                    )))
                }
            }
        }
        Ok(changes)
    }

    async fn fetch_preview_bundle(
        &self,
        change_number: u32,
        patchset: u32,
    ) -> Result<PreviewBundle, GerritError> {
        let url = format!(
            "{}/a/changes/{}/revisions/{}/preview_submit?format=zip",
            self.base_url(),
            change_number,
            patchset
        );
        debug!("Downloading merge preview for {}-{}", change_number, patchset);

        let response = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(PreviewBundle::from_zip_bytes(bytes.to_vec())?)
    }

    async fn post_review(
        &self,
        change_number: u32,
        patchset: u32,
        message: &str,
        notify: bool,
        score: i32,
    ) -> Result<(), GerritError> {
        let url = format!(
            "{}/a/changes/{}/revisions/{}/review",
            self.base_url(),
            change_number,
            patchset
        );

        let input = ReviewInput {
            message,
            labels: HashMap::from([(VERIFIED_LABEL, score)]),
            notify: if notify { "OWNER" } else { "NONE" },
        };

        let response = self
            .authed(self.client.post(&url).json(&input))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::check_status(response).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change_info(number: u32, labels: Option<HashMap<String, LabelInfo>>) -> ChangeInfo {
        ChangeInfo {
            number,
            id: format!("I{:040}", number),
            subject: "a change".to_string(),
            current_revision: Some("deadbeef".to_string()),
            revisions: Some(HashMap::from([(
                "deadbeef".to_string(),
                RevisionInfo { number: 3 },
            )])),
            labels,
        }
    }

    #[test]
    fn test_change_conversion() {
        let change = Change::try_from(change_info(42, None)).unwrap();
        assert_eq!(change.number, 42);
        assert_eq!(change.patchset, 3);
        assert!(!change.verified);
    }

    #[test]
    fn test_verified_from_any_vote() {
        for label in [
            LabelInfo {
                approved: Some(serde_json::json!({"_account_id": 1})),
                ..Default::default()
            },
            LabelInfo {
                disliked: Some(serde_json::json!({"_account_id": 1})),
                ..Default::default()
            },
            LabelInfo {
                rejected: Some(serde_json::json!({"_account_id": 1})),
                ..Default::default()
            },
        ] {
            let labels = HashMap::from([(VERIFIED_LABEL.to_string(), label)]);
            let change = Change::try_from(change_info(1, Some(labels))).unwrap();
            assert!(change.verified);
        }

        let no_votes = HashMap::from([(VERIFIED_LABEL.to_string(), LabelInfo::default())]);
        let change = Change::try_from(change_info(1, Some(no_votes))).unwrap();
        assert!(!change.verified);
    }

    #[test]
    fn test_change_without_current_revision_is_rejected() {
        let mut info = change_info(7, None);
        info.current_revision = None;
        assert!(matches!(
            Change::try_from(info),
            Err(GerritError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_xssi_prefix_payload_parses() {
        let body = ")]}'\n[{\"_number\": 5, \"id\": \"Iabc\", \"subject\": \"s\"}]";
        let json = body.strip_prefix(XSSI_PREFIX).unwrap().trim_start();
        let infos: Vec<ChangeInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].number, 5);
    }
}
