//! Build notification webhook.
//!
//! The build host posts a notification when a run starts, completes and is
//! finalized. Runs triggered by this service carry their cause as a build
//! parameter; notifications without one belong to manually started runs and
//! are acknowledged without action.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use groupci_core::{BuildCause, BuildOutcome, BuildRun, CAUSE_PARAMETER};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BuildNotification {
    pub name: String,
    pub build: BuildInfo,
}

#[derive(Debug, Deserialize)]
pub struct BuildInfo {
    pub full_url: String,
    pub phase: BuildPhase,
    pub status: Option<String>,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildPhase {
    Started,
    Completed,
    Finalized,
}

pub async fn handle_notification(
    State(state): State<Arc<AppState>>,
    Json(notification): Json<BuildNotification>,
) -> StatusCode {
    let Some(run) = to_build_run(&notification) else {
        debug!(
            "Notification for {} run without a cause parameter, ignoring",
            notification.name
        );
        return StatusCode::OK;
    };

    match notification.build.phase {
        BuildPhase::Started => {
            state.orchestrator().on_build_started(run).await;
        }
        // COMPLETED fires while post-build steps still run; FINALIZED is the
        // authoritative end of the run.
        BuildPhase::Completed => {}
        BuildPhase::Finalized => {
            let outcome = match notification.build.status.as_deref() {
                Some("SUCCESS") => BuildOutcome::Success,
                _ => BuildOutcome::Failure,
            };
            state.orchestrator().on_build_completed(run, outcome).await;
        }
    }

    StatusCode::OK
}

/// Extract the run and its cause from a notification, if it carries one.
fn to_build_run(notification: &BuildNotification) -> Option<BuildRun> {
    let raw = notification.build.parameters.get(CAUSE_PARAMETER)?;
    let cause: BuildCause = match serde_json::from_str(raw) {
        Ok(cause) => cause,
        Err(e) => {
            warn!(
                "Notification for {} has an unparseable cause parameter: {}",
                notification.name, e
            );
            return None;
        }
    };
    Some(BuildRun {
        cause,
        url: notification.build.full_url.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupci_core::{BuildKey, Change, SubmitGroup};

    fn cause_json() -> String {
        let cause = BuildCause {
            group: SubmitGroup::new([Change::new(5, 1, "I5", "subject", false)]),
            build: BuildKey::new("core/api", "main"),
        };
        serde_json::to_string(&cause).unwrap()
    }

    fn notification(phase: &str, status: Option<&str>, cause: Option<String>) -> BuildNotification {
        let mut parameters = HashMap::new();
        if let Some(cause) = cause {
            parameters.insert(CAUSE_PARAMETER.to_string(), cause);
        }
        serde_json::from_value(serde_json::json!({
            "name": "api-verify",
            "build": {
                "full_url": "http://jenkins/job/api-verify/7/",
                "phase": phase,
                "status": status,
                "parameters": parameters,
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_cause_round_trips_through_parameters() {
        let n = notification("STARTED", None, Some(cause_json()));
        let run = to_build_run(&n).unwrap();
        assert_eq!(run.url, "http://jenkins/job/api-verify/7/");
        assert_eq!(run.cause.build, BuildKey::new("core/api", "main"));
        assert_eq!(run.cause.group.key().to_string(), "5-1");
    }

    #[test]
    fn test_notification_without_cause_is_skipped() {
        let n = notification("STARTED", None, None);
        assert!(to_build_run(&n).is_none());
    }

    #[test]
    fn test_malformed_cause_is_skipped() {
        let n = notification("STARTED", None, Some("not json".to_string()));
        assert!(to_build_run(&n).is_none());
    }

    #[test]
    fn test_phase_parsing() {
        assert_eq!(
            notification("FINALIZED", Some("SUCCESS"), None).build.phase,
            BuildPhase::Finalized
        );
        assert_eq!(
            notification("COMPLETED", Some("FAILURE"), None).build.phase,
            BuildPhase::Completed
        );
    }
}
