use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sitegrep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "circuit-breaker", default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// How failed fetches draw on the retry allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryPolicy {
    /// One budget for the whole operation, consumed by any URL
    #[default]
    Shared,
    /// Each URL may be retried up to the limit independently
    PerUrl,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL every search starts from; only links on its host are followed
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum number of matching URLs collected per search
    #[serde(rename = "max-results", default = "default_max_results")]
    pub max_results: usize,

    /// Maximum number of fetch retries
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Timeout for a single page fetch (milliseconds)
    #[serde(rename = "fetch-timeout-ms", default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Maximum number of distinct URLs discovered per search
    #[serde(rename = "max-queue-size", default = "default_max_queue_size")]
    pub max_queue_size: usize,

    #[serde(rename = "retry-policy", default)]
    pub retry_policy: RetryPolicy,
}

impl CrawlerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// Per-URL failure isolation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures after which a URL is skipped
    #[serde(default = "default_breaker_threshold")]
    pub threshold: u32,

    /// How long a tripped URL stays skipped after its last failure (seconds)
    #[serde(rename = "cooldown-secs", default = "default_breaker_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl CircuitBreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: default_breaker_threshold(),
            cooldown_secs: default_breaker_cooldown_secs(),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Maximum number of searches crawling at the same time
    #[serde(
        rename = "max-concurrent-searches",
        default = "default_max_concurrent_searches"
    )]
    pub max_concurrent_searches: usize,

    /// How long shutdown waits for in-flight searches (seconds)
    #[serde(rename = "shutdown-grace-secs", default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl RunnerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_searches: default_max_concurrent_searches(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

/// HTTP command surface configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(rename = "listen-addr", default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

/// Retention of finished searches
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    /// Finished searches older than this are evicted (seconds); unset keeps them forever
    #[serde(rename = "retention-secs", default)]
    pub retention_secs: Option<u64>,
}

impl RegistryConfig {
    pub fn retention(&self) -> Option<Duration> {
        self.retention_secs.map(Duration::from_secs)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "Sitegrep".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/sitegrep".to_string(),
            contact_email: "sitegrep@example.com".to_string(),
        }
    }
}

fn default_max_results() -> usize {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_fetch_timeout_ms() -> u64 {
    5000
}

fn default_max_queue_size() -> usize {
    50_000
}

fn default_breaker_threshold() -> u32 {
    5
}

fn default_breaker_cooldown_secs() -> u64 {
    600
}

fn default_max_concurrent_searches() -> usize {
    64
}

fn default_shutdown_grace_secs() -> u64 {
    60
}

fn default_listen_addr() -> String {
    "0.0.0.0:4567".to_string()
}
