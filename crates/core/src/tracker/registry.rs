//! Registry of tracked submit groups.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;

use crate::buildhost::BuildOutcome;
use crate::model::{BuildKey, GroupKey, SubmitGroup};

use super::status::{GroupBuildStatus, GroupNotice, GroupVerdict};

/// Outcome of asking to trigger a build for a group.
#[derive(Debug, PartialEq, Eq)]
pub enum TriggerDecision {
    /// The build was claimed and must now actually be triggered.
    Trigger,
    /// The build is already tracked for this group; do nothing.
    AlreadyTracked,
}

/// Outcome of a start notification.
#[derive(Debug, PartialEq, Eq)]
pub enum StartedDisposition {
    /// The group is no longer tracked; the run should be cancelled.
    Obsolete,
    /// The group is tracked, but this build was not waiting to start: a
    /// duplicate or misrouted notification, dropped without side effects.
    Stray,
    /// The start was recorded. `notice` is set exactly once, when this was
    /// the last pending build of the group.
    Tracked { notice: Option<GroupNotice> },
}

/// Outcome of a completion notification.
#[derive(Debug, PartialEq, Eq)]
pub enum CompletedDisposition {
    /// The group is no longer tracked.
    Obsolete,
    /// The group is tracked, but this build was not running: a duplicate or
    /// misrouted notification, dropped without side effects.
    Stray,
    /// Recorded, but other builds of the group are still running.
    Pending,
    /// This was the last build: the record has been retired and the verdict
    /// must be reported.
    Finished(GroupVerdict),
}

/// Snapshot of one tracked group, for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedGroup {
    pub key: String,
    pub triggered: usize,
    pub started: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// All submit groups with builds in flight.
///
/// Records appear when their first build is claimed and disappear when
/// their last build completes; a finished group that resurfaces unchanged on
/// a later refresh is therefore triggered again from scratch, which is what
/// keeps verdicts current after a re-vote.
#[derive(Default)]
pub struct StatusRegistry {
    groups: Mutex<HashMap<GroupKey, GroupBuildStatus>>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `build` for `group`, creating the record on first contact.
    /// Returns [`TriggerDecision::Trigger`] at most once per (group, build).
    pub fn claim_build(&self, group: &SubmitGroup, build: BuildKey) -> TriggerDecision {
        let mut groups = self.groups.lock().unwrap();
        let status = groups
            .entry(group.key())
            .or_insert_with(|| GroupBuildStatus::new(group.clone()));

        if status.tracks(&build) {
            return TriggerDecision::AlreadyTracked;
        }
        status.on_triggered(build);
        TriggerDecision::Trigger
    }

    /// Roll back a claim whose trigger request failed. The record itself is
    /// dropped again if this was its only build.
    pub fn abandon_build(&self, key: &GroupKey, build: &BuildKey) {
        let mut groups = self.groups.lock().unwrap();
        if let Some(status) = groups.get_mut(key) {
            status.abandon(build);
            let (triggered, started, succeeded, failed) = status.counts();
            if triggered + started + succeeded + failed == 0 {
                groups.remove(key);
            }
        }
    }

    /// Apply a start notification. Webhook-driven events are screened here
    /// rather than asserted: a notification the record is not expecting is
    /// reported as [`StartedDisposition::Stray`] instead of panicking with
    /// the lock held.
    pub fn record_started(
        &self,
        key: &GroupKey,
        build: BuildKey,
        report_url: String,
    ) -> StartedDisposition {
        let mut groups = self.groups.lock().unwrap();
        let Some(status) = groups.get_mut(key) else {
            return StartedDisposition::Obsolete;
        };
        if !status.awaiting_start(&build) {
            return StartedDisposition::Stray;
        }
        status.on_started(build, report_url);
        StartedDisposition::Tracked {
            notice: status.take_started_edge(),
        }
    }

    /// Apply a completion notification. When it completes the group, the
    /// record is removed and the verdict returned; a later event for the
    /// same group is then [`CompletedDisposition::Obsolete`].
    pub fn record_completed(
        &self,
        key: &GroupKey,
        build: BuildKey,
        outcome: BuildOutcome,
    ) -> CompletedDisposition {
        let mut groups = self.groups.lock().unwrap();
        let Some(status) = groups.get_mut(key) else {
            return CompletedDisposition::Obsolete;
        };
        if !status.awaiting_finish(&build) {
            return CompletedDisposition::Stray;
        }
        match outcome {
            BuildOutcome::Success => status.on_succeeded(build),
            BuildOutcome::Failure => status.on_failed(build),
        }
        match status.verdict() {
            Some(verdict) => {
                groups.remove(key);
                CompletedDisposition::Finished(verdict)
            }
            None => CompletedDisposition::Pending,
        }
    }

    /// Whether `key` currently has a record.
    pub fn is_tracked(&self, key: &GroupKey) -> bool {
        self.groups.lock().unwrap().contains_key(key)
    }

    pub fn tracked_count(&self) -> usize {
        self.groups.lock().unwrap().len()
    }

    /// Snapshot for the status endpoint, sorted by group key.
    pub fn snapshot(&self) -> Vec<TrackedGroup> {
        let groups = self.groups.lock().unwrap();
        let mut tracked: Vec<TrackedGroup> = groups
            .values()
            .map(|status| {
                let (triggered, started, succeeded, failed) = status.counts();
                TrackedGroup {
                    key: status.group().key().to_string(),
                    triggered,
                    started,
                    succeeded,
                    failed,
                }
            })
            .collect();
        tracked.sort_by(|a, b| a.key.cmp(&b.key));
        tracked
    }
}
