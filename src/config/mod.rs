//! Configuration module for webamber
//!
//! Handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use webamber::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawling with {} workers", config.crawl.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{parse_duration, BasicAuth, Config, CrawlConfig, OutputConfig, RequestConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

// Re-export validation
pub use validation::validate;
