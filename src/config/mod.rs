//! Configuration module for Sitegrep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sitegrep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sitegrep.toml")).unwrap();
//! println!("Searches start from: {}", config.crawler.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CircuitBreakerConfig, Config, CrawlerConfig, RegistryConfig, RetryPolicy, RunnerConfig,
    ServerConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
