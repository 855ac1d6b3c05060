pub mod buildhost;
pub mod config;
pub mod gerrit;
pub mod model;
pub mod orchestrator;
pub mod resolver;
pub mod testing;
pub mod tracker;

pub use buildhost::{
    BuildCause, BuildHost, BuildHostError, BuildOutcome, BuildParameters, BuildRun, JenkinsClient,
    JobInfo, ProjectMatcher, CAUSE_PARAMETER,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use gerrit::{GerritClient, GerritError, GerritRestClient, PreviewBundle};
pub use model::{BuildKey, BuildTarget, Change, GroupKey, SubmitGroup};
pub use orchestrator::{BuildOrchestrator, OrchestratorConfig, OrchestratorStatus, RefreshReason};
pub use tracker::StatusRegistry;
