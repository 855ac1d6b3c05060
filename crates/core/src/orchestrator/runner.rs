//! Build orchestrator implementation.
//!
//! One refresh pass reconciles everything: fetch open changes, resolve them
//! into submit groups, derive each group's build targets from its
//! merge-preview bundle, and trigger every build not already tracked.
//! Passes run strictly one at a time, drained from a queue by a single task;
//! webhook storms collapse into at most one queued pass.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::buildhost::{
    BuildCause, BuildHost, BuildOutcome, BuildParameters, BuildRun, JobInfo, ProjectMatcher,
};
use crate::gerrit::GerritClient;
use crate::model::{BuildTarget, SubmitGroup};
use crate::resolver::{resolve_build_targets, resolve_submit_groups};
use crate::tracker::{
    CompletedDisposition, GroupNotice, GroupVerdict, StartedDisposition, StatusRegistry,
    TriggerDecision,
};

use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, OrchestratorStatus, RefreshReason};

/// The build orchestrator - reconciles open changes into verified groups.
pub struct BuildOrchestrator {
    config: OrchestratorConfig,
    gerrit: Arc<dyn GerritClient>,
    build_host: Arc<dyn BuildHost>,
    registry: Arc<StatusRegistry>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    refresh_tx: mpsc::Sender<RefreshReason>,
    refresh_rx: StdMutex<Option<mpsc::Receiver<RefreshReason>>>,
    last_refresh: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl BuildOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        gerrit: Arc<dyn GerritClient>,
        build_host: Arc<dyn BuildHost>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (refresh_tx, refresh_rx) = mpsc::channel(config.refresh_queue_capacity.max(1));

        Self {
            config,
            gerrit,
            build_host,
            registry: Arc::new(StatusRegistry::new()),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            refresh_tx,
            refresh_rx: StdMutex::new(Some(refresh_rx)),
            last_refresh: Arc::new(RwLock::new(None)),
        }
    }

    /// Start the orchestrator (spawns the refresh loop).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        info!("Starting build orchestrator");

        let Some(refresh_rx) = self.refresh_rx.lock().unwrap().take() else {
            error!("Orchestrator cannot be restarted after stop");
            return;
        };
        self.spawn_refresh_loop(refresh_rx);
        self.request_refresh(RefreshReason::Startup);

        info!("Build orchestrator started");
    }

    /// Stop the orchestrator gracefully.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping build orchestrator");

        // Signal shutdown to the refresh loop
        let _ = self.shutdown_tx.send(());

        // Give a pass in flight a moment to finish
        tokio::time::sleep(Duration::from_millis(500)).await;

        info!("Build orchestrator stopped");
    }

    /// Get current orchestrator status.
    pub async fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            running: self.running.load(Ordering::Relaxed),
            tracked_groups: self.registry.tracked_count(),
            last_refresh: *self.last_refresh.read().await,
        }
    }

    /// Queue a refresh pass. Requests are coalesced: when the queue is full
    /// an already-queued pass will observe whatever prompted this one.
    pub fn request_refresh(&self, reason: RefreshReason) {
        match self.refresh_tx.try_send(reason) {
            Ok(()) => debug!("Queued {} refresh", reason),
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Refresh queue full, {} request coalesced", reason)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Refresh queue closed, dropping {} request", reason)
            }
        }
    }

    /// Run one reconciliation pass inline, bypassing the queue. Returns the
    /// number of builds triggered.
    pub async fn refresh_now(&self) -> Result<usize, OrchestratorError> {
        let triggered =
            Self::run_refresh(&self.gerrit, &self.build_host, &self.registry).await?;
        *self.last_refresh.write().await = Some(Utc::now());
        Ok(triggered)
    }

    /// Spawn the task that drains the refresh queue, one pass at a time.
    fn spawn_refresh_loop(&self, mut refresh_rx: mpsc::Receiver<RefreshReason>) {
        let running = Arc::clone(&self.running);
        let gerrit = Arc::clone(&self.gerrit);
        let build_host = Arc::clone(&self.build_host);
        let registry = Arc::clone(&self.registry);
        let last_refresh = Arc::clone(&self.last_refresh);
        let interval_secs = self.config.refresh_interval_secs;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Refresh loop started");
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            // The first tick fires immediately; startup already queued a pass.
            interval.tick().await;

            loop {
                let reason = tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Refresh loop received shutdown signal");
                        break;
                    }
                    reason = refresh_rx.recv() => match reason {
                        Some(reason) => reason,
                        None => break,
                    },
                    _ = interval.tick() => RefreshReason::Periodic,
                };

                if !running.load(Ordering::Relaxed) {
                    break;
                }

                info!("Running {} refresh", reason);
                match Self::run_refresh(&gerrit, &build_host, &registry).await {
                    Ok(triggered) => {
                        *last_refresh.write().await = Some(Utc::now());
                        if triggered > 0 {
                            info!("Refresh triggered {} builds", triggered);
                        }
                    }
                    Err(e) => warn!("Refresh failed: {}", e),
                }
            }
            info!("Refresh loop stopped");
        });
    }

    /// One full reconciliation pass. Returns the number of builds triggered.
    async fn run_refresh(
        gerrit: &Arc<dyn GerritClient>,
        build_host: &Arc<dyn BuildHost>,
        registry: &Arc<StatusRegistry>,
    ) -> Result<usize, OrchestratorError> {
        let open_changes = gerrit.fetch_open_changes().await?;
        debug!("Fetched {} open changes", open_changes.len());

        let groups = resolve_submit_groups(gerrit.as_ref(), &open_changes).await?;
        info!("Resolved {} submit groups", groups.len());

        let jobs = build_host.list_jobs().await?;

        let mut triggered = 0;
        for group in groups.values() {
            triggered +=
                Self::process_group(gerrit, build_host, registry, group, &jobs).await;
        }
        Ok(triggered)
    }

    /// Derive and trigger the missing builds of one group. Failures here
    /// only affect this group; the pass carries on.
    async fn process_group(
        gerrit: &Arc<dyn GerritClient>,
        build_host: &Arc<dyn BuildHost>,
        registry: &Arc<StatusRegistry>,
        group: &SubmitGroup,
        jobs: &[JobInfo],
    ) -> usize {
        let Some((change_number, patchset)) = group.representative() else {
            return 0;
        };

        let mut bundle = match gerrit.fetch_preview_bundle(change_number, patchset).await {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!("Failed to fetch preview bundle for group {}: {}", group, e);
                return 0;
            }
        };

        let targets: HashSet<BuildTarget> = match resolve_build_targets(group, &mut bundle) {
            Ok(targets) => targets,
            Err(e) => {
                warn!("Failed to resolve build targets for group {}: {}", group, e);
                return 0;
            }
        };

        let mut triggered = 0;
        for target in &targets {
            let Some(job) = jobs.iter().find(|job| job.matches_project(&target.project)) else {
                warn!("No build job matches project {}", target.project);
                continue;
            };

            let build = target.build_key();
            if registry.claim_build(group, build.clone()) == TriggerDecision::AlreadyTracked {
                continue;
            }

            let cause = BuildCause {
                group: group.clone(),
                build: build.clone(),
            };
            let params = BuildParameters::from(target);

            match build_host.trigger_build(job, &params, &cause).await {
                Ok(()) => {
                    info!("Triggered {} on {} for group {}", build, job.name, group);
                    triggered += 1;
                }
                Err(e) => {
                    error!("Failed to trigger {} for group {}: {}", build, group, e);
                    // Release the claim so the next pass can retry.
                    registry.abandon_build(&group.key(), &build);
                }
            }
        }
        triggered
    }

    /// Apply a start notification from the build host.
    pub async fn on_build_started(&self, run: BuildRun) {
        let key = run.cause.group.key();
        match self
            .registry
            .record_started(&key, run.cause.build.clone(), run.url.clone())
        {
            StartedDisposition::Obsolete => {
                info!(
                    "Build {} started for untracked group {}, cancelling",
                    run.cause.build, key
                );
                if let Err(e) = self.build_host.cancel_build(&run.url).await {
                    warn!("Failed to cancel stale build {}: {}", run.url, e);
                }
            }
            StartedDisposition::Stray => {
                warn!(
                    "Dropping unexpected start notification for build {} of group {}",
                    run.cause.build, key
                );
            }
            StartedDisposition::Tracked { notice: Some(notice) } => {
                debug!("All builds started for group {}", key);
                self.post_started_notice(&notice).await;
            }
            StartedDisposition::Tracked { notice: None } => {
                debug!("Build {} started for group {}", run.cause.build, key);
            }
        }
    }

    /// Apply a completion notification from the build host.
    pub async fn on_build_completed(&self, run: BuildRun, outcome: BuildOutcome) {
        let key = run.cause.group.key();
        match self
            .registry
            .record_completed(&key, run.cause.build.clone(), outcome)
        {
            CompletedDisposition::Obsolete => {
                debug!(
                    "Ignoring completion of {} for untracked group {}",
                    run.cause.build, key
                );
            }
            CompletedDisposition::Stray => {
                warn!(
                    "Dropping unexpected completion of {} for group {}",
                    run.cause.build, key
                );
            }
            CompletedDisposition::Pending => {
                debug!("Build {} completed for group {}", run.cause.build, key);
            }
            CompletedDisposition::Finished(verdict) => {
                info!(
                    "Group {} finished, success: {}",
                    key, verdict.success
                );
                self.post_verdict(&verdict).await;
            }
        }
    }

    /// Tell every change of the group that its builds are underway. Not a
    /// vote: score 0, owner not notified.
    async fn post_started_notice(&self, notice: &GroupNotice) {
        let message = format_report(
            &format!("Build started for submit group {}:", notice.group),
            &notice.report_urls,
        );
        for change in &notice.group {
            if let Err(e) = self
                .gerrit
                .post_review(change.number, change.patchset, &message, false, 0)
                .await
            {
                warn!("Failed to post start notice to change {}: {}", change, e);
            }
        }
    }

    /// Vote on every change of the group with the aggregate result.
    async fn post_verdict(&self, verdict: &GroupVerdict) {
        let (headline, score) = if verdict.success {
            (
                format!("Build successful for submit group {}:", verdict.group),
                1,
            )
        } else {
            (
                format!("Build failed for submit group {}:", verdict.group),
                -1,
            )
        };
        let message = format_report(&headline, &verdict.report_urls);
        for change in &verdict.group {
            if let Err(e) = self
                .gerrit
                .post_review(change.number, change.patchset, &message, true, score)
                .await
            {
                warn!("Failed to post verdict to change {}: {}", change, e);
            }
        }
    }
}

fn format_report(
    headline: &str,
    report_urls: &std::collections::BTreeSet<String>,
) -> String {
    let mut message = String::from(headline);
    for url in report_urls {
        message.push('\n');
        message.push_str(url);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_report() {
        let urls = ["http://j/2/".to_string(), "http://j/1/".to_string()]
            .into_iter()
            .collect();
        let message = format_report("Build started for submit group 5-1:", &urls);
        assert_eq!(
            message,
            "Build started for submit group 5-1:\nhttp://j/1/\nhttp://j/2/"
        );
    }
}
