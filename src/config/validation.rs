use crate::config::types::{BudgetConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_budget_config(&config.budget)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.pool_size < 1 || config.pool_size > 64 {
        return Err(ConfigError::Validation(format!(
            "pool_size must be between 1 and 64, got {}",
            config.pool_size
        )));
    }

    if config.min_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "min_delay_ms must be >= 100ms, got {}ms",
            config.min_delay_ms
        )));
    }

    if config.max_delay_ms < config.min_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max_delay_ms ({}) must not be below min_delay_ms ({})",
            config.max_delay_ms, config.min_delay_ms
        )));
    }

    if config.request_timeout_secs == 0 || config.robots_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request and robots timeouts must be > 0".to_string(),
        ));
    }

    if config.retry_ceiling < 1 {
        return Err(ConfigError::Validation(
            "retry_ceiling must be >= 1".to_string(),
        ));
    }

    if config.breaker_threshold < 1 {
        return Err(ConfigError::Validation(
            "breaker_threshold must be >= 1".to_string(),
        ));
    }

    if config.backoff_max_ms < config.backoff_base_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_max_ms ({}) must not be below backoff_base_ms ({})",
            config.backoff_max_ms, config.backoff_base_ms
        )));
    }

    for path in &config.fallback_sitemaps {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "fallback sitemap '{}' must be an absolute path",
                path
            )));
        }
    }

    Ok(())
}

/// Validates run budget configuration
fn validate_budget_config(config: &BudgetConfig) -> Result<(), ConfigError> {
    if config.time_budget_secs == 0 {
        return Err(ConfigError::Validation(
            "time_budget_secs must be > 0".to_string(),
        ));
    }

    if config.max_files_per_run == 0 {
        return Err(ConfigError::Validation(
            "max_files_per_run must be > 0".to_string(),
        ));
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
    if config.data_dir.is_empty() {
        return Err(ConfigError::Validation(
            "data_dir cannot be empty".to_string(),
        ));
    }

    if config.seed_list.is_empty() {
        return Err(ConfigError::Validation(
            "seed_list cannot be empty".to_string(),
        ));
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

    // Basic email format check: must contain @ and have text on both sides
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }

    #[test]
    fn test_budget_must_be_positive() {
        let budget = BudgetConfig {
            time_budget_secs: 0,
            ..BudgetConfig::default()
        };
        assert!(validate_budget_config(&budget).is_err());
        assert!(validate_budget_config(&BudgetConfig::default()).is_ok());
    }
}
