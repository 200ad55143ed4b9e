//! Search service - the entry point for submitting and polling searches
//!
//! This module wires together:
//! - The search registry (id -> operation)
//! - The bounded task runner that executes crawls
//! - The orchestrator and the circuit breaker shared by all searches

mod registry;
mod runner;

pub use registry::SearchRegistry;
pub use runner::TaskRunner;

use crate::config::Config;
use crate::crawler::{CircuitBreaker, CrawlSettings, Orchestrator, PageFetcher};
use crate::state::{OperationId, OperationSnapshot, OperationState, SearchStatus};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Shortest accepted keyword, in characters
pub const MIN_KEYWORD_LENGTH: usize = 4;

/// Longest accepted keyword, in characters
pub const MAX_KEYWORD_LENGTH: usize = 32;

/// Errors surfaced to the submitter of a search
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Keyword must be between {min} and {max} characters")]
    InvalidKeyword { len: usize, min: usize, max: usize },

    #[error("Search runner is shut down")]
    RunnerClosed,
}

/// Checks the keyword length bounds
///
/// Length is counted in characters, not bytes.
pub fn validate_keyword(keyword: &str) -> Result<(), SearchError> {
    let len = keyword.chars().count();
    if (MIN_KEYWORD_LENGTH..=MAX_KEYWORD_LENGTH).contains(&len) {
        Ok(())
    } else {
        Err(SearchError::InvalidKeyword {
            len,
            min: MIN_KEYWORD_LENGTH,
            max: MAX_KEYWORD_LENGTH,
        })
    }
}

/// Submits searches and serves their state
pub struct SearchService<F> {
    registry: SearchRegistry,
    runner: TaskRunner,
    orchestrator: Arc<Orchestrator<F>>,
    shutdown_grace: Duration,
}

impl<F: PageFetcher> SearchService<F> {
    pub fn new(orchestrator: Orchestrator<F>, runner: TaskRunner, shutdown_grace: Duration) -> Self {
        Self {
            registry: SearchRegistry::new(),
            runner,
            orchestrator: Arc::new(orchestrator),
            shutdown_grace,
        }
    }

    /// Builds a service from a validated configuration and a fetcher
    pub fn from_config(config: &Config, fetcher: F) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(
            config.circuit_breaker.threshold,
            config.circuit_breaker.cooldown(),
        ));
        let orchestrator = Orchestrator::new(
            CrawlSettings::from(&config.crawler),
            breaker,
            Arc::new(fetcher),
        );
        let runner = TaskRunner::new(config.runner.max_concurrent_searches);

        Self::new(orchestrator, runner, config.runner.shutdown_grace())
    }

    /// Validates `keyword`, registers a new operation and schedules its crawl
    ///
    /// # Returns
    ///
    /// * `Ok(OperationId)` - The identifier to poll
    /// * `Err(SearchError)` - Keyword rejected or runner shut down; nothing was registered
    pub fn start_search(&self, keyword: &str) -> Result<OperationId, SearchError> {
        validate_keyword(keyword)?;

        let settings = self.orchestrator.settings();
        let op = Arc::new(OperationState::with_limits(
            keyword,
            settings.max_results,
            settings.max_queue_size,
        ));
        let id = op.id().clone();

        // Registered before the crawl can start, so it is never unobservable
        self.registry.insert(Arc::clone(&op));

        if let Err(e) = self
            .runner
            .submit(run_search(Arc::clone(&self.orchestrator), op))
        {
            self.registry.remove(id.as_str());
            return Err(e);
        }

        tracing::info!("Started search {} for keyword {:?}", id, keyword);
        Ok(id)
    }

    pub fn get_search(&self, id: &str) -> Option<Arc<OperationState>> {
        self.registry.get(id)
    }

    /// Latest published snapshot of a search, if the id is known
    pub fn snapshot(&self, id: &str) -> Option<Arc<OperationSnapshot>> {
        self.registry.get(id).map(|op| op.snapshot())
    }

    /// Drops finished searches older than `retention`
    pub fn evict_finished(&self, retention: Duration) -> usize {
        let evicted = self.registry.evict_finished(retention);
        if evicted > 0 {
            tracing::debug!("Evicted {} finished searches", evicted);
        }
        evicted
    }

    pub fn search_count(&self) -> usize {
        self.registry.len()
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        self.orchestrator.breaker()
    }

    /// Stops accepting searches and drains running ones within the configured grace
    ///
    /// Returns the number of crawls that had to be cancelled.
    pub async fn shutdown(&self) -> usize {
        self.runner.shutdown(self.shutdown_grace).await
    }
}

/// Runs one crawl and records its terminal status
///
/// A crawl error or a panic inside the crawl marks the search failed.
async fn run_search<F: PageFetcher>(orchestrator: Arc<Orchestrator<F>>, op: Arc<OperationState>) {
    let outcome = AssertUnwindSafe(orchestrator.run(&op)).catch_unwind().await;

    let failure = match outcome {
        Ok(Ok(stats)) => {
            tracing::info!(
                "Search {} completed with {} results ({} fetches, {} skipped, {} retries)",
                op.id(),
                op.result_count(),
                stats.fetch_attempts,
                stats.skipped,
                stats.retries
            );
            return;
        }
        Ok(Err(e)) => e.to_string(),
        Err(panic) => format!("crawl panicked: {}", panic_message(&*panic)),
    };

    tracing::error!("Search {} failed: {}", op.id(), failure);
    if let Err(e) = op.set_status(SearchStatus::Failed) {
        tracing::warn!("Could not mark search {} as failed: {}", op.id(), e);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
