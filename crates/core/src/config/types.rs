use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub gerrit: GerritConfig,
    pub jenkins: JenkinsConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Gerrit connection and query configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GerritConfig {
    /// Gerrit base URL (e.g., "https://gerrit.example.com")
    pub url: String,
    /// Username for the authenticated REST endpoints
    pub username: String,
    /// HTTP password (generated in Gerrit settings, not the account password)
    pub http_password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Change query selecting the changes under consideration
    #[serde(default = "default_query")]
    pub query: String,
    /// Maximum number of changes fetched per refresh
    #[serde(default = "default_change_limit")]
    pub change_limit: u32,
}

fn default_timeout() -> u32 {
    30
}

fn default_query() -> String {
    "status:open -age:1w".to_string()
}

fn default_change_limit() -> u32 {
    100
}

/// Jenkins connection configuration plus the declared job inventory
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JenkinsConfig {
    /// Jenkins controller URL (e.g., "https://jenkins.example.com")
    pub url: String,
    /// Username for the REST API
    pub username: String,
    /// API token for the REST API
    pub api_token: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Jobs available for triggering, with the git URLs each checks out
    #[serde(default)]
    pub jobs: Vec<JenkinsJobConfig>,
}

/// One triggerable Jenkins job
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JenkinsJobConfig {
    pub name: String,
    pub git_urls: Vec<String>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub gerrit: SanitizedGerritConfig,
    pub jenkins: SanitizedJenkinsConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Sanitized Gerrit config (HTTP password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedGerritConfig {
    pub url: String,
    pub username: String,
    pub http_password_configured: bool,
    pub timeout_secs: u32,
    pub query: String,
    pub change_limit: u32,
}

/// Sanitized Jenkins config (API token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedJenkinsConfig {
    pub url: String,
    pub username: String,
    pub api_token_configured: bool,
    pub timeout_secs: u32,
    pub jobs: Vec<JenkinsJobConfig>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            gerrit: SanitizedGerritConfig {
                url: config.gerrit.url.clone(),
                username: config.gerrit.username.clone(),
                http_password_configured: !config.gerrit.http_password.is_empty(),
                timeout_secs: config.gerrit.timeout_secs,
                query: config.gerrit.query.clone(),
                change_limit: config.gerrit.change_limit,
            },
            jenkins: SanitizedJenkinsConfig {
                url: config.jenkins.url.clone(),
                username: config.jenkins.username.clone(),
                api_token_configured: !config.jenkins.api_token.is_empty(),
                timeout_secs: config.jenkins.timeout_secs,
                jobs: config.jenkins.jobs.clone(),
            },
            orchestrator: config.orchestrator.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
[gerrit]
url = "https://gerrit.example.com"
username = "builder"
http_password = "secret"

[jenkins]
url = "https://jenkins.example.com"
username = "builder"
api_token = "token"
"#
    }

    #[test]
    fn test_deserialize_minimal_config_applies_defaults() {
        let config: Config = toml::from_str(minimal_toml()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.gerrit.timeout_secs, 30);
        assert_eq!(config.gerrit.query, "status:open -age:1w");
        assert_eq!(config.gerrit.change_limit, 100);
        assert!(config.jenkins.jobs.is_empty());
        assert!(config.orchestrator.enabled);
    }

    #[test]
    fn test_deserialize_with_jobs() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[gerrit]
url = "https://gerrit.example.com"
username = "builder"
http_password = "secret"
query = "status:open project:core/api"

[jenkins]
url = "https://jenkins.example.com"
username = "builder"
api_token = "token"

[[jenkins.jobs]]
name = "api-verify"
git_urls = ["https://gerrit.example.com/a/core/api"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.gerrit.query, "status:open project:core/api");
        assert_eq!(config.jenkins.jobs.len(), 1);
        assert_eq!(config.jenkins.jobs[0].name, "api-verify");
    }

    #[test]
    fn test_deserialize_missing_gerrit_fails() {
        let toml = r#"
[jenkins]
url = "https://jenkins.example.com"
username = "builder"
api_token = "token"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let config: Config = toml::from_str(minimal_toml()).unwrap();
        let sanitized = SanitizedConfig::from(&config);

        assert!(sanitized.gerrit.http_password_configured);
        assert!(sanitized.jenkins.api_token_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("token\":\"token"));
    }
}
