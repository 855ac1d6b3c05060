//! Gerrit event webhook.
//!
//! Gerrit pushes stream events here. Most event types merely indicate that
//! the set of open changes may have shifted, so the handler reduces them to
//! a single refresh request; events that cannot affect submit groups are
//! filtered out to keep the refresh queue quiet.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use groupci_core::RefreshReason;

use crate::state::AppState;

/// Event types that can change which submit groups exist or what they need.
const ALLOWED_TYPES: &[&str] = &[
    "ref-updated",
    "change-deleted",
    "change-abandoned",
    "change-merged",
    "change-restored",
    "patchset-created",
    "private-state-changed",
    "wip-state-changed",
    "topic-changed",
    "vote-deleted",
    "comment-added",
];

const VERIFIED_LABEL: &str = "Verified";
const META_REF_SUFFIX: &str = "/meta";

#[derive(Debug, Deserialize)]
pub struct GerritEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(rename = "refUpdate")]
    ref_update: Option<RefUpdate>,
    #[serde(default)]
    approvals: Vec<Approval>,
}

#[derive(Debug, Deserialize)]
struct RefUpdate {
    #[serde(rename = "refName")]
    ref_name: String,
}

/// Stream events carry approval values as strings.
#[derive(Debug, Deserialize)]
struct Approval {
    #[serde(rename = "type")]
    label: String,
    value: String,
    #[serde(rename = "oldValue")]
    old_value: Option<String>,
}

pub async fn handle_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<GerritEvent>,
) -> StatusCode {
    if should_refresh(&event) {
        debug!("Gerrit {} event, requesting refresh", event.event_type);
        state.orchestrator().request_refresh(RefreshReason::Webhook);
    } else {
        debug!("Ignoring gerrit {} event", event.event_type);
    }
    StatusCode::OK
}

/// Whether this event warrants a refresh pass.
fn should_refresh(event: &GerritEvent) -> bool {
    if !ALLOWED_TYPES.contains(&event.event_type.as_str()) {
        return false;
    }

    // Notes updates on the change's meta ref fire on every comment; the
    // change itself is untouched.
    if let Some(ref_update) = &event.ref_update {
        if ref_update.ref_name.ends_with(META_REF_SUFFIX) {
            return false;
        }
    }

    // Vote events matter only when an existing Verified vote was cleared;
    // anything else is chatter on a change this service already handled.
    if event.event_type == "vote-deleted" || event.event_type == "comment-added" {
        return event.approvals.iter().any(|approval| {
            approval.label == VERIFIED_LABEL
                && approval.value == "0"
                && approval.old_value.as_deref().is_some_and(|old| old != "0")
        });
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GerritEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_patchset_created_triggers_refresh() {
        let event = parse(r#"{"type": "patchset-created"}"#);
        assert!(should_refresh(&event));
    }

    #[test]
    fn test_unknown_event_type_is_ignored() {
        let event = parse(r#"{"type": "reviewer-added"}"#);
        assert!(!should_refresh(&event));
    }

    #[test]
    fn test_meta_ref_update_is_ignored() {
        let event = parse(
            r#"{"type": "ref-updated", "refUpdate": {"refName": "refs/changes/01/1/meta"}}"#,
        );
        assert!(!should_refresh(&event));
    }

    #[test]
    fn test_branch_ref_update_triggers_refresh() {
        let event =
            parse(r#"{"type": "ref-updated", "refUpdate": {"refName": "refs/heads/main"}}"#);
        assert!(should_refresh(&event));
    }

    #[test]
    fn test_vote_deleted_requires_cleared_verified_vote() {
        let cleared = parse(
            r#"{"type": "vote-deleted",
                "approvals": [{"type": "Verified", "value": "0", "oldValue": "-1"}]}"#,
        );
        assert!(should_refresh(&cleared));

        // A Verified vote that was already 0 did not change anything.
        let unchanged = parse(
            r#"{"type": "vote-deleted",
                "approvals": [{"type": "Verified", "value": "0", "oldValue": "0"}]}"#,
        );
        assert!(!should_refresh(&unchanged));

        // Clearing some other label is not this service's business.
        let other_label = parse(
            r#"{"type": "vote-deleted",
                "approvals": [{"type": "Code-Review", "value": "0", "oldValue": "-2"}]}"#,
        );
        assert!(!should_refresh(&other_label));
    }

    #[test]
    fn test_plain_comment_is_ignored() {
        let event = parse(r#"{"type": "comment-added", "approvals": []}"#);
        assert!(!should_refresh(&event));

        let with_vote = parse(
            r#"{"type": "comment-added",
                "approvals": [{"type": "Verified", "value": "1"}]}"#,
        );
        assert!(!should_refresh(&with_vote));
    }
}
