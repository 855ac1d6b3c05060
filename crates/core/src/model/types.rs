//! Value types shared across the resolvers, tracker and orchestrator.

use std::cmp::Ordering;
use std::collections::{btree_set, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A Gerrit change under review.
///
/// Identity is `(number, patchset)`; `id`, `subject` and `verified` are
/// carried along for reporting but do not participate in equality. Instances
/// are rebuilt from the review system on every refresh cycle and never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    /// Gerrit change number.
    pub number: u32,
    /// Current patchset (revision ordinal).
    pub patchset: u32,
    /// Opaque change ID as reported by Gerrit.
    pub id: String,
    /// Commit subject, for log output.
    pub subject: String,
    /// Whether the change already carries a Verified vote.
    pub verified: bool,
}

impl Change {
    pub fn new(
        number: u32,
        patchset: u32,
        id: impl Into<String>,
        subject: impl Into<String>,
        verified: bool,
    ) -> Self {
        Self {
            number,
            patchset,
            id: id.into(),
            subject: subject.into(),
            verified,
        }
    }
}

impl PartialEq for Change {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number && self.patchset == other.patchset
    }
}

impl Eq for Change {}

impl Hash for Change {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
        self.patchset.hash(state);
    }
}

impl Ord for Change {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then(self.patchset.cmp(&other.patchset))
    }
}

impl PartialOrd for Change {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.number, self.patchset)
    }
}

/// Canonical identity of a submit group: the ordered list of member change
/// identities. Renders as `"number-patchset-number-patchset-..."`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey(Vec<(u32, u32)>);

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for (number, patchset) in &self.0 {
            write!(f, "{}{}-{}", sep, number, patchset)?;
            sep = "-";
        }
        Ok(())
    }
}

/// An ordered, duplicate-free set of changes that Gerrit would submit
/// together.
///
/// Members are kept sorted by change number; two groups are equal iff they
/// contain the same change identities. A group may be empty transiently
/// during resolution, but every group handed out by the resolver is
/// non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitGroup {
    changes: BTreeSet<Change>,
}

impl SubmitGroup {
    pub fn new(changes: impl IntoIterator<Item = Change>) -> Self {
        Self {
            changes: changes.into_iter().collect(),
        }
    }

    /// Derived composite key, stable under member insertion order.
    pub fn key(&self) -> GroupKey {
        GroupKey(self.changes.iter().map(|c| (c.number, c.patchset)).collect())
    }

    pub fn insert(&mut self, change: Change) -> bool {
        self.changes.insert(change)
    }

    pub fn remove(&mut self, change: &Change) -> bool {
        self.changes.remove(change)
    }

    pub fn contains(&self, change: &Change) -> bool {
        self.changes.contains(change)
    }

    /// Whether every member of `other` is also a member of `self`.
    pub fn is_superset(&self, other: &SubmitGroup) -> bool {
        self.changes.is_superset(&other.changes)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, Change> {
        self.changes.iter()
    }

    /// True iff every member already carries a Verified vote.
    pub fn all_verified(&self) -> bool {
        self.changes.iter().all(|c| c.verified)
    }

    /// The `(number, patchset)` of the numerically smallest change, used to
    /// fetch the merge-preview bundle and as the vote anchor.
    pub fn representative(&self) -> Option<(u32, u32)> {
        self.changes.first().map(|c| (c.number, c.patchset))
    }
}

impl Hash for SubmitGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for change in &self.changes {
            change.hash(state);
        }
    }
}

impl fmt::Display for SubmitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.key().fmt(f)
    }
}

impl<'a> IntoIterator for &'a SubmitGroup {
    type Item = &'a Change;
    type IntoIter = btree_set::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// The (project, branch) part of a build identity, unique within one submit
/// group's status record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildKey {
    pub project: String,
    pub branch: String,
}

impl BuildKey {
    pub fn new(project: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            branch: branch.into(),
        }
    }
}

impl fmt::Display for BuildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.project, self.branch)
    }
}

/// A build required to verify a submit group: one (project, branch) pair.
///
/// Equality is structural over `(project, branch, group key)`; two targets
/// produced by independent refresh cycles for the same change set compare
/// equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildTarget {
    pub group: SubmitGroup,
    pub project: String,
    pub branch: String,
}

impl BuildTarget {
    pub fn new(group: SubmitGroup, project: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            group,
            project: project.into(),
            branch: branch.into(),
        }
    }

    pub fn build_key(&self) -> BuildKey {
        BuildKey::new(self.project.clone(), self.branch.clone())
    }

    /// Representative change number for bundle fetching and build parameters.
    pub fn change_number(&self) -> u32 {
        self.group.representative().map(|(n, _)| n).unwrap_or(0)
    }

    /// Representative patchset, paired with [`Self::change_number`].
    pub fn patchset(&self) -> u32 {
        self.group.representative().map(|(_, p)| p).unwrap_or(0)
    }
}

impl PartialEq for BuildTarget {
    fn eq(&self, other: &Self) -> bool {
        self.project == other.project
            && self.branch == other.branch
            && self.group == other.group
    }
}

impl Eq for BuildTarget {}

impl Hash for BuildTarget {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.project.hash(state);
        self.branch.hash(state);
        self.group.hash(state);
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.project, self.branch, self.group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn change(number: u32, patchset: u32) -> Change {
        Change::new(number, patchset, format!("I{}", number), "subject", false)
    }

    #[test]
    fn test_change_identity_ignores_metadata() {
        let a = Change::new(5, 1, "Iaaa", "one subject", false);
        let b = Change::new(5, 1, "Ibbb", "another subject", true);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_change_new_patchset_is_a_new_identity() {
        assert_ne!(change(5, 1), change(5, 2));
    }

    #[test]
    fn test_group_canonical_key_is_order_independent() {
        let a = SubmitGroup::new([change(5, 1), change(7, 2)]);
        let b = SubmitGroup::new([change(7, 2), change(5, 1)]);

        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().to_string(), "5-1-7-2");
    }

    #[test]
    fn test_group_deduplicates_members() {
        let group = SubmitGroup::new([change(5, 1), change(5, 1), change(7, 2)]);
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn test_all_verified() {
        let mut verified = change(1, 1);
        verified.verified = true;
        let pending = change(2, 1);

        assert!(SubmitGroup::new([verified.clone()]).all_verified());
        assert!(!SubmitGroup::new([verified, pending]).all_verified());
        // Vacuously true for an empty group.
        assert!(SubmitGroup::default().all_verified());
    }

    #[test]
    fn test_representative_is_smallest_change() {
        let group = SubmitGroup::new([change(42, 3), change(7, 2)]);
        assert_eq!(group.representative(), Some((7, 2)));
    }

    #[test]
    fn test_superset() {
        let small = SubmitGroup::new([change(1, 1)]);
        let big = SubmitGroup::new([change(1, 1), change(2, 1)]);

        assert!(big.is_superset(&small));
        assert!(!small.is_superset(&big));
        // Every group is a superset of the empty group.
        assert!(small.is_superset(&SubmitGroup::default()));
    }

    #[test]
    fn test_build_target_equality_across_instances() {
        let group = SubmitGroup::new([change(5, 1), change(7, 2)]);
        let a = BuildTarget::new(group.clone(), "core/api", "main");
        let b = BuildTarget::new(group.clone(), "core/api", "main");
        let c = BuildTarget::new(group, "core/api", "release");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
    }

    #[test]
    fn test_build_target_representative() {
        let group = SubmitGroup::new([change(9, 4), change(3, 2)]);
        let target = BuildTarget::new(group, "core/api", "main");
        assert_eq!(target.change_number(), 3);
        assert_eq!(target.patchset(), 2);
        assert_eq!(target.to_string(), "core/api-main-3-2-9-4");
    }

    #[test]
    fn test_cause_metadata_round_trip() {
        let group = SubmitGroup::new([change(5, 1), change(7, 2)]);
        let json = serde_json::to_string(&group).unwrap();
        let parsed: SubmitGroup = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.key(), group.key());
    }
}
