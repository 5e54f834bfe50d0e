use crate::config::types::Config;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.crawl.workers < 1 {
        return Err(ConfigError::Validation(
            "workers must be at least 1".to_string(),
        ));
    }

    if let Some(url) = &config.crawl.url {
        validate_http_url(url, "crawl.url")?;
    }

    if let Some(sitemap) = &config.crawl.sitemap {
        validate_http_url(sitemap, "crawl.sitemap")?;
    }

    for seed in &config.crawl.seeds {
        validate_http_url(seed, "crawl.seeds")?;
    }

    if let Some(proxy) = &config.request.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("request.proxy '{}': {}", proxy, e)))?;
    }

    if config.request.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "request.user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(value: &str, field: &str) -> Result<(), ConfigError> {
    crate::url::parse_url(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl(format!("{} '{}': {}", field, value, e)))
}
