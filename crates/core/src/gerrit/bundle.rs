//! Merge-preview bundle handling.
//!
//! Gerrit's `preview_submit` endpoint returns a zip archive with one git
//! bundle per affected project (entry named `<project>.git`). The text
//! header of each bundle enumerates the refs it carries; that listing is all
//! the target resolver needs, the pack data is never inspected.

use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Cursor, Read};

use thiserror::Error;
use zip::ZipArchive;

/// Errors that can occur reading a merge-preview bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Failed to read bundle archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to read bundle entry: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed ref listing line: {0:?}")]
    MalformedRefLine(String),
}

/// A single ref advertised by a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    /// Full ref name, e.g. `refs/heads/main`.
    pub name: String,
    /// SHA-1 the ref points at.
    pub revision: String,
}

/// Parse the line-oriented ref listing at the head of a git bundle.
///
/// Line 1 is the format version and is ignored. Lines starting with `-`
/// declare prerequisites and are skipped; a blank line terminates them. The
/// following `"<sha1> <ref>"` lines, terminated by a blank line or EOF, are
/// the refs present in the bundle.
pub fn parse_ref_listing<R: Read>(stream: R) -> Result<Vec<GitRef>, BundleError> {
    let mut lines = BufReader::new(stream).lines();

    // Format version, ignored.
    let Some(_version) = lines.next().transpose()? else {
        return Ok(Vec::new());
    };

    let mut line = match lines.next().transpose()? {
        Some(line) => line,
        None => return Ok(Vec::new()),
    };

    // Prerequisite declarations.
    while line.starts_with('-') {
        line = match lines.next().transpose()? {
            Some(line) => line,
            None => return Ok(Vec::new()),
        };
    }

    // Blank line separating prerequisites from the ref listing.
    if line.is_empty() {
        line = match lines.next().transpose()? {
            Some(line) => line,
            None => return Ok(Vec::new()),
        };
    }

    let mut refs = Vec::new();
    loop {
        if line.is_empty() {
            break;
        }
        let (sha1, name) = line
            .split_once(' ')
            .ok_or_else(|| BundleError::MalformedRefLine(line.clone()))?;
        refs.push(GitRef {
            name: name.to_string(),
            revision: sha1.to_string(),
        });
        line = match lines.next().transpose()? {
            Some(line) => line,
            None => break,
        };
    }

    Ok(refs)
}

/// An in-memory merge-preview bundle.
///
/// Owning the archive bytes means a project's ref listing can be read any
/// number of times without re-downloading the preview from Gerrit.
pub struct PreviewBundle {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    projects: BTreeSet<String>,
}

impl PreviewBundle {
    /// Open a preview bundle from the raw zip bytes downloaded from Gerrit.
    pub fn from_zip_bytes(bytes: Vec<u8>) -> Result<Self, BundleError> {
        let archive = ZipArchive::new(Cursor::new(bytes))?;
        let projects = archive
            .file_names()
            .map(entry_project_name)
            .collect::<BTreeSet<_>>();
        Ok(Self { archive, projects })
    }

    /// Build a preview bundle from `(project, bundle text)` pairs. Used by
    /// the mock Gerrit client and tests.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, BundleError>
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        use std::io::Write;

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (project, text) in entries {
            writer.start_file(format!("{}.git", project.as_ref()), options)?;
            writer.write_all(text.as_ref().as_bytes())?;
        }
        let cursor = writer.finish()?;
        Self::from_zip_bytes(cursor.into_inner())
    }

    /// The projects affected by this preview.
    pub fn project_names(&self) -> &BTreeSet<String> {
        &self.projects
    }

    /// The refs advertised by `project`'s bundle, or `None` if the project
    /// is not part of this preview.
    pub fn ref_listing(&mut self, project: &str) -> Result<Option<Vec<GitRef>>, BundleError> {
        if !self.projects.contains(project) {
            return Ok(None);
        }
        let entry = self.archive.by_name(&format!("{}.git", project))?;
        parse_ref_listing(entry).map(Some)
    }
}

/// A zip entry `<project>.git` maps to project `<project>`.
fn entry_project_name(entry_name: &str) -> String {
    entry_name
        .split(".git")
        .next()
        .unwrap_or(entry_name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ref_listing_basic() {
        let text = "v2\n\nabc123 refs/heads/main\ndef456 refs/heads/release/meta\n\n";
        let refs = parse_ref_listing(text.as_bytes()).unwrap();

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "refs/heads/main");
        assert_eq!(refs[0].revision, "abc123");
        assert_eq!(refs[1].name, "refs/heads/release/meta");
    }

    #[test]
    fn test_parse_ref_listing_with_prerequisites() {
        let text = "# v2 git bundle\n-0a1b2c base commit\n-3d4e5f other base\n\n\
                    abc123 refs/heads/main\n";
        let refs = parse_ref_listing(text.as_bytes()).unwrap();

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "refs/heads/main");
    }

    #[test]
    fn test_parse_ref_listing_ends_at_blank_line() {
        let text = "v2\n\nabc123 refs/heads/main\n\nbinary pack data follows";
        let refs = parse_ref_listing(text.as_bytes()).unwrap();
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_parse_ref_listing_empty_bundle() {
        assert!(parse_ref_listing("v2\n\n".as_bytes()).unwrap().is_empty());
        assert!(parse_ref_listing("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_ref_listing_malformed_line() {
        let text = "v2\n\nnospacehere\n";
        let err = parse_ref_listing(text.as_bytes()).unwrap_err();
        assert!(matches!(err, BundleError::MalformedRefLine(_)));
    }

    #[test]
    fn test_preview_bundle_projects_and_rereads() {
        let mut bundle = PreviewBundle::from_entries([
            ("core/api", "v2\n\nabc123 refs/heads/main\n"),
            ("core/lib", "v2\n\ndef456 refs/heads/develop\n"),
        ])
        .unwrap();

        let projects: Vec<_> = bundle.project_names().iter().cloned().collect();
        assert_eq!(projects, vec!["core/api", "core/lib"]);

        let refs = bundle.ref_listing("core/api").unwrap().unwrap();
        assert_eq!(refs[0].name, "refs/heads/main");

        // Listings can be re-read without re-fetching the preview.
        let again = bundle.ref_listing("core/api").unwrap().unwrap();
        assert_eq!(again, refs);

        assert!(bundle.ref_listing("unknown").unwrap().is_none());
    }
}
