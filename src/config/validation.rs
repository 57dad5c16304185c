use crate::config::types::{ArtifactConfig, Config, ExportSettings, OutputConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration, clamping bounded values in place
pub fn validate(config: &mut Config) -> Result<(), ConfigError> {
    validate_export_settings(&mut config.export)?;
    validate_site_config(&config.site)?;
    validate_artifact_config(&mut config.artifact)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates export settings and clamps the per-kind item bound
fn validate_export_settings(settings: &mut ExportSettings) -> Result<(), ConfigError> {
    for kind in &settings.kinds {
        validate_kind(kind)?;
    }

    // Bounded rather than rejected: out-of-range values are clamped
    settings.max_items_per_kind = settings.max_items_per_kind.clamp(1, 1000);

    if settings.max_words < 10 {
        return Err(ConfigError::Validation(format!(
            "max_words must be >= 10, got {}",
            settings.max_words
        )));
    }

    Ok(())
}

/// Validates a content kind name
fn validate_kind(kind: &str) -> Result<(), ConfigError> {
    if kind.is_empty() {
        return Err(ConfigError::Validation(
            "content kind cannot be empty".to_string(),
        ));
    }

    if !kind
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "content kind must contain only lowercase letters, digits, '_' or '-', got '{}'",
            kind
        )));
    }

    Ok(())
}

/// Validates site identity configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.title.trim().is_empty() {
        return Err(ConfigError::Validation(
            "site title cannot be empty".to_string(),
        ));
    }

    if config.tenant_id.is_empty() {
        return Err(ConfigError::Validation(
            "tenant-id cannot be empty".to_string(),
        ));
    }

    if !config
        .tenant_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ConfigError::Validation(format!(
            "tenant-id must contain only alphanumeric characters, '-', '_' or '.', got '{}'",
            config.tenant_id
        )));
    }

    Ok(())
}

/// Validates the artifact endpoint and clamps the timeout
fn validate_artifact_config(config: &mut ArtifactConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid artifact endpoint: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "artifact endpoint must use http or https, got '{}'",
            url.scheme()
        )));
    }

    config.timeout_secs = config.timeout_secs.clamp(1, 300);

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.manifest_path.is_empty() {
        return Err(ConfigError::Validation(
            "manifest_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
