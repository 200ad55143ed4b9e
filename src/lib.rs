//! Sitegrep: asynchronous keyword search over a single site
//!
//! This crate crawls a site breadth-first from a fixed base URL, restricted to
//! its host, and collects the normalized URLs of pages whose text contains a
//! keyword. Searches run concurrently and can be polled by identifier while
//! they progress.

pub mod config;
pub mod crawler;
pub mod server;
pub mod service;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sitegrep operations
#[derive(Debug, Error)]
pub enum SitegrepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::SearchStatus,
        to: state::SearchStatus,
    },
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

/// Result type alias for Sitegrep operations
pub type Result<T> = std::result::Result<T, SitegrepError>;



// Re-export commonly used types
pub use config::Config;
pub use crawler::{CircuitBreaker, CrawlSettings, HttpFetcher, Orchestrator, PageFetcher};
pub use service::{SearchError, SearchService};
pub use state::{OperationId, OperationSnapshot, OperationState, SearchStatus};
pub use url::{extract_host, normalize_url, parse_seed_url};
