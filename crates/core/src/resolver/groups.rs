//! Submit group resolution.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::gerrit::{GerritClient, GerritError};
use crate::model::{Change, GroupKey, SubmitGroup};

/// Resolve the open changes into minimal submit groups, keyed by their
/// canonical group key.
///
/// Groups that are empty after reduction, or whose members are all already
/// verified, are dropped. A failure of the submitted-together query for any
/// change fails the whole resolution; the next refresh retries from scratch.
pub async fn resolve_submit_groups(
    gerrit: &dyn GerritClient,
    open_changes: &HashSet<Change>,
) -> Result<HashMap<GroupKey, SubmitGroup>, GerritError> {
    let mut groups = Vec::with_capacity(open_changes.len());
    for change in open_changes {
        groups.push(submit_group_for(gerrit, change).await?);
    }

    reduce_groups(&mut groups);

    groups.retain(|group| !group.is_empty() && !group.all_verified());

    Ok(groups
        .into_iter()
        .map(|group| (group.key(), group))
        .collect())
}

/// The submit group of one change: its submitted-together set, or the
/// change alone when Gerrit reports no co-submitted peers.
async fn submit_group_for(
    gerrit: &dyn GerritClient,
    change: &Change,
) -> Result<SubmitGroup, GerritError> {
    let mut group = SubmitGroup::new(gerrit.submitted_together(change).await?);
    if group.is_empty() {
        group.insert(change.clone());
    }
    debug!("Submit group for change {}: {}", change, group);
    Ok(group)
}

/// Single pairwise reduction pass: whenever one group contains the whole of
/// another, the smaller group's members are removed from the larger one.
///
/// This deduplicates changes across the overlapping groups that independent
/// per-change queries produce. It is deliberately NOT iterated to a
/// fixpoint, so three-way overlaps can leave residual duplication; that
/// matches the behavior this service has always had.
fn reduce_groups(groups: &mut [SubmitGroup]) {
    for i in 0..groups.len() {
        for j in (i + 1)..groups.len() {
            let (head, tail) = groups.split_at_mut(j);
            let current = &mut head[i];
            let following = &mut tail[0];

            if following.is_superset(current) {
                for change in current.iter().cloned().collect::<Vec<_>>() {
                    following.remove(&change);
                }
            } else if current.is_superset(following) {
                for change in following.iter().cloned().collect::<Vec<_>>() {
                    current.remove(&change);
                }
            }
        }
    }
}
