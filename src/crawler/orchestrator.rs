//! Crawl orchestrator - breadth-first traversal for one search
//!
//! This module contains the crawl loop that drives a single search:
//! - Seeding the frontier with the base URL
//! - Consulting the shared circuit breaker before every fetch
//! - Fetching bodies and matching the keyword
//! - Extracting, deduplicating and enqueueing same-host links
//! - Spending the retry budget on failed fetches
//! - Finalizing the search status

use crate::config::{CrawlerConfig, RetryPolicy};
use crate::crawler::parser::{contains_keyword, extract_hrefs, resolve_link};
use crate::crawler::{CircuitBreaker, PageFetcher};
use crate::state::{OperationState, SearchStatus};
use crate::url::{extract_host, is_same_host, normalize_url, parse_seed_url};
use crate::UrlError;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failure that ends a whole search rather than a single URL
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid seed URL: {0}")]
    InvalidSeed(#[from] UrlError),
}

/// Limits and inputs for one traversal
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub base_url: String,
    pub max_results: usize,
    pub max_retries: u32,
    pub fetch_timeout: Duration,
    pub max_queue_size: usize,
    pub retry_policy: RetryPolicy,
}

impl From<&CrawlerConfig> for CrawlSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            max_results: config.max_results,
            max_retries: config.max_retries,
            fetch_timeout: config.fetch_timeout(),
            max_queue_size: config.max_queue_size,
            retry_policy: config.retry_policy,
        }
    }
}

/// Counters describing a finished traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Fetches attempted, retries included
    pub fetch_attempts: usize,
    /// Fetches that returned a body
    pub pages_fetched: usize,
    /// URLs dropped because their circuit was open
    pub skipped: usize,
    /// Failed URLs pushed back for another attempt
    pub retries: usize,
    /// Failed URLs given up on
    pub dropped: usize,
}

/// Drives searches over the configured site
///
/// One orchestrator is shared by every search; each call to [`run`](Self::run)
/// owns its own frontier, so concurrent runs never share traversal state.
pub struct Orchestrator<F> {
    settings: CrawlSettings,
    breaker: Arc<CircuitBreaker>,
    fetcher: Arc<F>,
}

impl<F: PageFetcher> Orchestrator<F> {
    pub fn new(settings: CrawlSettings, breaker: Arc<CircuitBreaker>, fetcher: Arc<F>) -> Self {
        Self {
            settings,
            breaker,
            fetcher,
        }
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Runs the traversal for `op` to completion
    ///
    /// On return the operation is `Done` unless something else already marked
    /// it `Failed`. An `Err` means the search could not run at all; the caller
    /// decides how to record that.
    pub async fn run(&self, op: &OperationState) -> Result<CrawlStats, CrawlError> {
        let seed = parse_seed_url(&self.settings.base_url)?;
        let seed_host = extract_host(&seed).ok_or(UrlError::MissingHost)?;

        let mut frontier = VecDeque::new();
        op.add_visited_url(normalize_url(&seed).to_string());
        frontier.push_back(seed);

        let mut stats = CrawlStats::default();
        let mut per_url_retries: HashMap<String, u32> = HashMap::new();

        tracing::debug!(
            "Operation {} crawling {} for {:?}",
            op.id(),
            self.settings.base_url,
            op.keyword()
        );

        while op.result_count() < self.settings.max_results {
            let Some(current) = frontier.pop_front() else {
                break;
            };

            if self.breaker.should_skip(current.as_str(), op.id().as_str()) {
                stats.skipped += 1;
                continue;
            }

            stats.fetch_attempts += 1;
            match self.fetcher.fetch(&current, self.settings.fetch_timeout).await {
                Ok(body) => {
                    stats.pages_fetched += 1;
                    self.process_page(op, &current, &body, &seed_host, &mut frontier);
                }
                Err(e) => {
                    tracing::warn!("Fetch failed for operation {}: {}", op.id(), e);
                    self.breaker.record_failure(current.as_str());

                    if self.allow_retry(op, &current, &mut per_url_retries) {
                        stats.retries += 1;
                        frontier.push_back(current);
                    } else {
                        stats.dropped += 1;
                        tracing::debug!("Retry budget exhausted, dropping {}", current);
                    }
                }
            }
        }

        if op.status() != SearchStatus::Failed {
            if let Err(e) = op.set_status(SearchStatus::Done) {
                tracing::warn!("Could not finalize operation {}: {}", op.id(), e);
            }
        }

        Ok(stats)
    }

    /// Matches the keyword on a fetched page and queues its links
    fn process_page(
        &self,
        op: &OperationState,
        current: &Url,
        body: &str,
        seed_host: &str,
        frontier: &mut VecDeque<Url>,
    ) {
        if contains_keyword(body, op.keyword_lower()) {
            let normalized = normalize_url(current).to_string();
            tracing::info!("Keyword {:?} found in {}", op.keyword(), normalized);

            if op.add_urls([normalized]) > 0 && op.result_count() >= self.settings.max_results {
                tracing::info!("Reached max results limit for operation {}", op.id());
            }
        }

        if op.visited_count() < self.settings.max_queue_size {
            self.enqueue_links(op, current, body, seed_host, frontier);
        } else {
            tracing::warn!(
                "Queue size limit reached; skipping link extraction for operation {}",
                op.id()
            );
        }
    }

    /// Queues unseen same-host links found in `body`
    ///
    /// Stops as soon as either the result or the visited limit is reached,
    /// even partway through the page.
    fn enqueue_links(
        &self,
        op: &OperationState,
        current: &Url,
        body: &str,
        seed_host: &str,
        frontier: &mut VecDeque<Url>,
    ) -> usize {
        let mut queued = 0;

        for href in extract_hrefs(body) {
            if op.result_count() >= self.settings.max_results
                || op.visited_count() >= self.settings.max_queue_size
            {
                break;
            }

            let Some(link) = resolve_link(&href, current) else {
                continue;
            };
            if !is_same_host(&link, seed_host) {
                continue;
            }

            if op.add_visited_url(normalize_url(&link).to_string()) {
                frontier.push_back(link);
                queued += 1;
            }
        }

        tracing::trace!("Queued {} links from {}", queued, current);
        queued
    }

    fn allow_retry(
        &self,
        op: &OperationState,
        url: &Url,
        per_url_retries: &mut HashMap<String, u32>,
    ) -> bool {
        match self.settings.retry_policy {
            RetryPolicy::Shared => op.try_consume_retry(self.settings.max_retries),
            RetryPolicy::PerUrl => {
                let used = per_url_retries.entry(url.to_string()).or_insert(0);
                if *used >= self.settings.max_retries {
                    return false;
                }
                *used += 1;
                op.increment_retry_count();
                true
            }
        }
    }
}
