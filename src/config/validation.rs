use crate::config::types::{
    Config, CrawlerConfig, MarkerConfig, OutputConfig, RetryConfig, TimeoutConfig, UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_timeouts(&config.timeouts)?;
    validate_retry_config(&config.session_retry)?;
    validate_markers(&config.markers)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.entry_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid entry_url: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "entry_url '{}' must use http or https",
            config.entry_url
        )));
    }

    if config.checkpoint_every < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_every must be >= 1, got {}",
            config.checkpoint_every
        )));
    }

    if config.poll_interval_ms < 1 {
        return Err(ConfigError::Validation(
            "poll_interval_ms must be >= 1ms".to_string(),
        ));
    }

    Ok(())
}

fn validate_timeouts(config: &TimeoutConfig) -> Result<(), ConfigError> {
    for (name, secs) in [
        ("catalog_secs", config.catalog_secs),
        ("group_secs", config.group_secs),
        ("detail_secs", config.detail_secs),
    ] {
        if secs < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1 second, got {}",
                name, secs
            )));
        }
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "session-retry max_attempts must be between 0 and 10, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

/// Checks that every marker is a non-empty, parseable CSS selector
fn validate_markers(config: &MarkerConfig) -> Result<(), ConfigError> {
    for (name, selector) in config.named() {
        if selector.trim().is_empty() || Selector::parse(selector).is_err() {
            return Err(ConfigError::InvalidSelector {
                name: name.to_string(),
                selector: selector.to_string(),
            });
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.state_path.is_empty() {
        return Err(ConfigError::Validation(
            "state_path cannot be empty".to_string(),
        ));
    }

    if config.records_path.is_empty() {
        return Err(ConfigError::Validation(
            "records_path cannot be empty".to_string(),
        ));
    }

    if config.state_path == config.records_path {
        return Err(ConfigError::Validation(format!(
            "state_path and records_path must differ, both are '{}'",
            config.state_path
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
