//! Build target resolution from merge-preview bundles.

use std::collections::HashSet;

use tracing::debug;

use crate::gerrit::{BundleError, PreviewBundle};
use crate::model::{BuildTarget, SubmitGroup};

const META_REF_SUFFIX: &str = "/meta";
const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Derive the builds a submit group needs from its merge-preview bundle:
/// one target per (project, branch ref) pair found in the archive.
///
/// Gerrit's internal `.../meta` refs are skipped, as is any ref outside the
/// `refs/heads/` namespace.
pub fn resolve_build_targets(
    group: &SubmitGroup,
    bundle: &mut PreviewBundle,
) -> Result<HashSet<BuildTarget>, BundleError> {
    let mut targets = HashSet::new();

    let projects: Vec<String> = bundle.project_names().iter().cloned().collect();
    for project in projects {
        let Some(refs) = bundle.ref_listing(&project)? else {
            continue;
        };
        for git_ref in refs {
            if git_ref.name.ends_with(META_REF_SUFFIX) {
                continue;
            }
            let Some(branch) = git_ref.name.strip_prefix(BRANCH_REF_PREFIX) else {
                debug!("Skipping non-branch ref {} in {}", git_ref.name, project);
                continue;
            };
            targets.insert(BuildTarget::new(group.clone(), &project, branch));
        }
    }

    Ok(targets)
}
