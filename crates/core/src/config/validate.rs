use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Gerrit and Jenkins URLs are non-empty and HTTP(S)
/// - Every declared Jenkins job has at least one git URL
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    validate_url("gerrit.url", &config.gerrit.url)?;
    validate_url("jenkins.url", &config.jenkins.url)?;

    for job in &config.jenkins.jobs {
        if job.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "jenkins.jobs entries must have a name".to_string(),
            ));
        }
        if job.git_urls.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "jenkins job {} has no git_urls, it can never match a project",
                job.name
            )));
        }
    }

    if config.orchestrator.refresh_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.refresh_interval_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
    if url.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{} cannot be empty",
            field
        )));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::ValidationError(format!(
            "{} must start with http:// or https://",
            field
        )));
    }
    Ok(())
}
