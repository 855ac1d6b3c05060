//! Gerrit review-system client abstraction.
//!
//! The [`GerritClient`] trait covers everything the orchestrator needs from
//! the review system: the open-change inventory, the submitted-together
//! relation, merge-preview bundles and review (vote) posting. The REST
//! implementation talks to Gerrit's authenticated `/a/` endpoints.

mod bundle;
mod rest;
mod types;

pub use bundle::{parse_ref_listing, BundleError, GitRef, PreviewBundle};
pub use rest::GerritRestClient;
pub use types::{GerritClient, GerritError};
