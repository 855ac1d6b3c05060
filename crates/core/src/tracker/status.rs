//! The per-group build status record.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::model::{BuildKey, SubmitGroup};

/// Where a group stands in its start-notification lifecycle.
///
/// `StartedNotified` is entered at most once, when the last triggered build
/// has reported in; the completion notification has no state of its own
/// because the whole record is retired when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotifyState {
    Idle,
    StartedNotified,
}

/// Notification payload for the all-builds-started edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNotice {
    pub group: SubmitGroup,
    pub report_urls: BTreeSet<String>,
}

/// Notification payload for the all-builds-finished edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupVerdict {
    pub group: SubmitGroup,
    pub report_urls: BTreeSet<String>,
    pub success: bool,
}

/// Tracks every build of one submit group from trigger to completion.
///
/// A build lives in exactly one of the four sets: `triggered` until its
/// start notification arrives, `started` until it finishes, then `succeeded`
/// or `failed`. Transition preconditions are asserted; a violation means an
/// event was routed to the wrong group, which is a logic error rather than a
/// runtime condition to recover from.
#[derive(Debug, Clone)]
pub struct GroupBuildStatus {
    group: SubmitGroup,
    triggered: HashSet<BuildKey>,
    started: HashSet<BuildKey>,
    succeeded: HashSet<BuildKey>,
    failed: HashSet<BuildKey>,
    report_urls: BTreeSet<String>,
    notified: NotifyState,
}

impl GroupBuildStatus {
    pub fn new(group: SubmitGroup) -> Self {
        Self {
            group,
            triggered: HashSet::new(),
            started: HashSet::new(),
            succeeded: HashSet::new(),
            failed: HashSet::new(),
            report_urls: BTreeSet::new(),
            notified: NotifyState::Idle,
        }
    }

    pub fn group(&self) -> &SubmitGroup {
        &self.group
    }

    /// Whether `build` is waiting for its start notification.
    pub fn awaiting_start(&self, build: &BuildKey) -> bool {
        self.triggered.contains(build)
    }

    /// Whether `build` is running and waiting for its completion.
    pub fn awaiting_finish(&self, build: &BuildKey) -> bool {
        self.started.contains(build)
    }

    /// Whether `build` is known to this record, in any of the four sets.
    pub fn tracks(&self, build: &BuildKey) -> bool {
        self.triggered.contains(build)
            || self.started.contains(build)
            || self.succeeded.contains(build)
            || self.failed.contains(build)
    }

    /// Record a freshly triggered build.
    pub fn on_triggered(&mut self, build: BuildKey) {
        assert!(!self.tracks(&build), "build {} triggered twice", build);
        self.triggered.insert(build);
    }

    /// Forget a build whose trigger request failed after it was claimed.
    pub fn abandon(&mut self, build: &BuildKey) {
        assert!(
            self.triggered.remove(build),
            "abandoning build {} that was never triggered",
            build
        );
    }

    /// Record the start notification for a triggered build.
    pub fn on_started(&mut self, build: BuildKey, report_url: String) {
        assert!(
            self.triggered.remove(&build),
            "build {} started without being triggered",
            build
        );
        self.report_urls.insert(report_url);
        self.started.insert(build);
    }

    /// Record a successful completion for a started build.
    pub fn on_succeeded(&mut self, build: BuildKey) {
        assert!(
            self.started.remove(&build),
            "build {} succeeded without starting",
            build
        );
        self.succeeded.insert(build);
    }

    /// Record a failed completion for a started build.
    pub fn on_failed(&mut self, build: BuildKey) {
        assert!(
            self.started.remove(&build),
            "build {} failed without starting",
            build
        );
        self.failed.insert(build);
    }

    /// Every build has finished: nothing is pending in `triggered` or
    /// `started`.
    pub fn completed(&self) -> bool {
        self.triggered.is_empty() && self.started.is_empty()
    }

    /// Completed with zero failures.
    pub fn success(&self) -> bool {
        self.completed() && self.failed.is_empty()
    }

    /// Every triggered build has at least started.
    pub fn all_started(&self) -> bool {
        self.triggered.is_empty()
    }

    pub fn report_urls(&self) -> &BTreeSet<String> {
        &self.report_urls
    }

    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.triggered.len(),
            self.started.len(),
            self.succeeded.len(),
            self.failed.len(),
        )
    }

    /// Consume the all-started edge: returns the notice exactly once, when
    /// every triggered build has started and it was not returned before.
    pub fn take_started_edge(&mut self) -> Option<GroupNotice> {
        if self.notified == NotifyState::Idle && self.all_started() {
            self.notified = NotifyState::StartedNotified;
            Some(GroupNotice {
                group: self.group.clone(),
                report_urls: self.report_urls.clone(),
            })
        } else {
            None
        }
    }

    /// The final verdict, available once the record is completed.
    pub fn verdict(&self) -> Option<GroupVerdict> {
        if !self.completed() {
            return None;
        }
        Some(GroupVerdict {
            group: self.group.clone(),
            report_urls: self.report_urls.clone(),
            success: self.success(),
        })
    }
}
