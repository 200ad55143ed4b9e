use crate::config::types::{
    CircuitBreakerConfig, Config, CrawlerConfig, RunnerConfig, ServerConfig, UserAgentConfig,
};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_breaker_config(&config.circuit_breaker)?;
    validate_runner_config(&config.runner)?;
    validate_server_config(&config.server)?;
    validate_user_agent_config(&config.user_agent)?;

    if config.registry.retention_secs == Some(0) {
        return Err(ConfigError::Validation(
            "retention_secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", config.base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use HTTP or HTTPS",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' has no host",
            config.base_url
        )));
    }

    if config.max_results < 1 {
        return Err(ConfigError::Validation(format!(
            "max_results must be >= 1, got {}",
            config.max_results
        )));
    }

    if config.max_queue_size < 1 {
        return Err(ConfigError::Validation(format!(
            "max_queue_size must be >= 1, got {}",
            config.max_queue_size
        )));
    }

    if config.fetch_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_ms must be >= 100ms, got {}ms",
            config.fetch_timeout_ms
        )));
    }

    Ok(())
}

/// Validates circuit breaker configuration
fn validate_breaker_config(config: &CircuitBreakerConfig) -> Result<(), ConfigError> {
    if config.threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "circuit breaker threshold must be >= 1, got {}",
            config.threshold
        )));
    }

    if config.cooldown_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "cooldown_secs must be >= 1, got {}",
            config.cooldown_secs
        )));
    }

    Ok(())
}

fn validate_runner_config(config: &RunnerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_searches < 1 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_searches must be >= 1, got {}",
            config.max_concurrent_searches
        )));
    }

    if config.shutdown_grace_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "shutdown_grace_secs must be >= 1, got {}",
            config.shutdown_grace_secs
        )));
    }

    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.listen_addr.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!(
            "listen_addr '{}' is not a socket address: {}",
            config.listen_addr, e
        ))
    })?;
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
