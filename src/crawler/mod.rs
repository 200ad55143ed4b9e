//! Crawler module for page fetching and traversal
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `PageFetcher` seam
//! - HTML keyword matching and link extraction
//! - The per-URL circuit breaker shared by all searches
//! - The breadth-first orchestrator that drives one search

mod circuit_breaker;
mod fetcher;
mod orchestrator;
mod parser;

pub use circuit_breaker::{CircuitBreaker, FailureRecord};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, PageFetcher};
pub use orchestrator::{CrawlError, CrawlSettings, CrawlStats, Orchestrator};
pub use parser::{contains_keyword, extract_hrefs, resolve_link};
