//! Webamber: a concurrent site preservation crawler
//!
//! This crate fetches a frontier of URLs with a bounded pool of workers,
//! extracts further links from fetched content, deduplicates and re-queues
//! them, and terminates automatically once no work remains. Fetched bodies
//! are mirrored to a local directory tree (or POSTed to a remote endpoint)
//! so a site can be browsed offline afterwards.

pub mod config;
pub mod crawler;
pub mod output;
pub mod pipeline;
pub mod sitemap;
pub mod store;
pub mod url;

use thiserror::Error;

/// Main error type for webamber operations
#[derive(Debug, Error)]
pub enum AmberError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] pipeline::PipelineError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Sitemap error: {0}")]
    Sitemap(#[from] sitemap::SitemapError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is not a valid seed url")]
    InvalidSeed(String),

    #[error("no seed urls found")]
    EmptySeed,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for webamber operations
pub type Result<T> = std::result::Result<T, AmberError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Supervisor};
pub use store::{MemoryStore, UrlStore};
