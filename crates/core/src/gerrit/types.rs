//! Types for the Gerrit client abstraction.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::Change;

use super::bundle::{BundleError, PreviewBundle};

/// Errors that can occur talking to the review system.
#[derive(Debug, Error)]
pub enum GerritError {
    #[error("Gerrit connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Gerrit authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Gerrit API error: {0}")]
    ApiError(String),

    #[error("Unexpected Gerrit response: {0}")]
    UnexpectedResponse(String),

    #[error("Request timeout")]
    Timeout,

    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// Trait for review-system backends.
#[async_trait]
pub trait GerritClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Fetch the open changes to reconcile, bounded by the configured age
    /// and count caps.
    async fn fetch_open_changes(&self) -> Result<HashSet<Change>, GerritError>;

    /// The set of changes Gerrit would merge together with `change`. May be
    /// empty when the change has no co-submitted peers; the caller is
    /// responsible for adding the change itself in that case.
    async fn submitted_together(&self, change: &Change) -> Result<Vec<Change>, GerritError>;

    /// Download the merge-preview bundle for a change/patchset.
    async fn fetch_preview_bundle(
        &self,
        change_number: u32,
        patchset: u32,
    ) -> Result<PreviewBundle, GerritError>;

    /// Post a review message with a Verified score. `notify` controls
    /// whether the change owner is notified.
    async fn post_review(
        &self,
        change_number: u32,
        patchset: u32,
        message: &str,
        notify: bool,
        score: i32,
    ) -> Result<(), GerritError>;
}
