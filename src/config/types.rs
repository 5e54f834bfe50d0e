use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::time::Duration;

/// Main configuration structure for webamber
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Base URL to preserve; always part of the seed set when present
    #[serde(default)]
    pub url: Option<String>,

    /// Sitemap URL used to generate additional seeds
    #[serde(default)]
    pub sitemap: Option<String>,

    /// Explicit seed URLs to start with
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Number of concurrent workers pulling from the shared queue
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Delay applied after each request, per worker (e.g. "250ms", "2s")
    #[serde(default, deserialize_with = "de_duration")]
    pub delay: Duration,

    /// Restrict discovered links to the host they were found on
    #[serde(rename = "same-host-only", default)]
    pub same_host_only: bool,

    /// Release the reservation of URLs whose fetch failed, so a later
    /// discovery may queue them again. Off by default: a failed URL stays
    /// reserved for the rest of the run.
    #[serde(rename = "retry-failed", default)]
    pub retry_failed: bool,
}

/// HTTP request configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    /// User-agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Proxy URL to route requests through
    #[serde(default)]
    pub proxy: Option<String>,

    /// Basic-auth credentials attached to every request
    #[serde(rename = "basic-auth", default)]
    pub basic_auth: Option<BasicAuth>,

    /// Additional headers attached to every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Basic-auth credentials
#[derive(Debug, Clone, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Where preserved files go: a directory for a local mirror tree, an
    /// http(s) URL to POST bodies to, or unset to discard them
    #[serde(default)]
    pub root: Option<String>,

    /// If set, one "url status" line is appended here per completed request
    #[serde(rename = "stats-path", default)]
    pub stats_path: Option<String>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            proxy: None,
            basic_auth: None,
            headers: HashMap::new(),
        }
    }
}

fn default_workers() -> usize {
    1
}

fn default_user_agent() -> String {
    format!("webamber/{}", env!("CARGO_PKG_VERSION"))
}

/// Parses a delay string: a number followed by `ms`, `s`, or `m`, or the
/// bare `"0"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let unit_start = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(|| format!("missing unit in duration '{}'", s))?;
    let (value, unit) = s.split_at(unit_start);

    let value: f64 = value
        .parse()
        .map_err(|_| format!("invalid number in duration '{}'", s))?;

    let seconds = match unit {
        "ms" => value / 1000.0,
        "s" => value,
        "m" => value * 60.0,
        _ => return Err(format!("unknown unit '{}' in duration '{}'", unit, s)),
    };

    Ok(Duration::from_secs_f64(seconds))
}

fn de_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_duration_fractional() {
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("nonsense").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("5h").is_err());
        assert!(parse_duration("").is_err());
    }
}
