//! Mock Gerrit client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::gerrit::{GerritClient, GerritError, PreviewBundle};
use crate::model::Change;

/// A recorded review posting for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedReview {
    pub change_number: u32,
    pub patchset: u32,
    pub message: String,
    pub notify: bool,
    pub score: i32,
    /// When the review was posted.
    pub timestamp: chrono::DateTime<Utc>,
}

/// Mock implementation of the GerritClient trait.
///
/// Provides controllable behavior for testing:
/// - Seed open changes and submitted-together relations
/// - Serve preview bundles built from plain text entries
/// - Record posted reviews for assertions
/// - Simulate failures
pub struct MockGerritClient {
    /// Open changes returned by `fetch_open_changes`.
    open_changes: Arc<RwLock<HashSet<Change>>>,
    /// Submitted-together sets by change number.
    submitted_together: Arc<RwLock<HashMap<u32, Vec<Change>>>>,
    /// Bundle entries by (change number, patchset): `(project, bundle text)`.
    bundles: Arc<RwLock<HashMap<(u32, u32), Vec<(String, String)>>>>,
    /// Recorded post_review calls.
    reviews: Arc<RwLock<Vec<RecordedReview>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<GerritError>>>,
}

impl Default for MockGerritClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGerritClient {
    /// Create a new mock Gerrit client.
    pub fn new() -> Self {
        Self {
            open_changes: Arc::new(RwLock::new(HashSet::new())),
            submitted_together: Arc::new(RwLock::new(HashMap::new())),
            bundles: Arc::new(RwLock::new(HashMap::new())),
            reviews: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Seed an open change.
    pub async fn add_open_change(&self, change: Change) {
        self.open_changes.write().await.insert(change);
    }

    /// Remove a change, simulating a merge or abandon.
    pub async fn remove_open_change(&self, change: &Change) {
        self.open_changes.write().await.remove(change);
    }

    /// Declare the submitted-together set of a change number.
    pub async fn set_submitted_together(&self, change_number: u32, changes: Vec<Change>) {
        self.submitted_together
            .write()
            .await
            .insert(change_number, changes);
    }

    /// Serve a preview bundle for `(change_number, patchset)` built from
    /// `(project, bundle text)` entries.
    pub async fn set_bundle(
        &self,
        change_number: u32,
        patchset: u32,
        entries: Vec<(String, String)>,
    ) {
        self.bundles
            .write()
            .await
            .insert((change_number, patchset), entries);
    }

    /// Get all recorded post_review calls.
    pub async fn posted_reviews(&self) -> Vec<RecordedReview> {
        self.reviews.read().await.clone()
    }

    /// Clear recorded reviews.
    pub async fn clear_recorded(&self) {
        self.reviews.write().await.clear();
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: GerritError) {
        *self.next_error.write().await = Some(error);
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<GerritError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl GerritClient for MockGerritClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_open_changes(&self) -> Result<HashSet<Change>, GerritError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(self.open_changes.read().await.clone())
    }

    async fn submitted_together(&self, change: &Change) -> Result<Vec<Change>, GerritError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(self
            .submitted_together
            .read()
            .await
            .get(&change.number)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_preview_bundle(
        &self,
        change_number: u32,
        patchset: u32,
    ) -> Result<PreviewBundle, GerritError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        let bundles = self.bundles.read().await;
        let entries = bundles
            .get(&(change_number, patchset))
            .cloned()
            .ok_or_else(|| {
                GerritError::ApiError(format!(
                    "no preview bundle for change {}-{}",
                    change_number, patchset
                ))
            })?;
        Ok(PreviewBundle::from_entries(entries)?)
    }

    async fn post_review(
        &self,
        change_number: u32,
        patchset: u32,
        message: &str,
        notify: bool,
        score: i32,
    ) -> Result<(), GerritError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.reviews.write().await.push(RecordedReview {
            change_number,
            patchset,
            message: message.to_string(),
            notify,
            score,
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
