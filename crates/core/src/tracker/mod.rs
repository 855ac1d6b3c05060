//! Per-group build status tracking.
//!
//! Each tracked submit group owns a [`GroupBuildStatus`] record; the
//! [`StatusRegistry`] maps group keys to records and decides, under one lock,
//! what a trigger or notification event means. Slow work (HTTP calls) is
//! always done by the caller after the lock is released.

mod registry;
mod status;

pub use registry::{
    CompletedDisposition, StartedDisposition, StatusRegistry, TrackedGroup, TriggerDecision,
};
pub use status::{GroupBuildStatus, GroupNotice, GroupVerdict, NotifyState};
