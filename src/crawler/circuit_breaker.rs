//! Per-URL circuit breaker shared by every search
//!
//! Failures are tracked by exact URL string, so a failing page never blocks
//! other pages on the same host. Once a URL has failed `threshold` times it is
//! skipped until `cooldown` has elapsed since its last recorded failure; the
//! first skip check after that removes the record and lets the URL through.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Failure history for a single URL
#[derive(Debug, Clone, Copy)]
pub struct FailureRecord {
    /// Failures since the record was created
    pub failure_count: u32,
    /// Time of the most recent failure
    pub last_failure: Instant,
}

/// Process-wide failure cache keyed by URL
#[derive(Debug)]
pub struct CircuitBreaker {
    records: DashMap<String, FailureRecord>,
    threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    /// Creates a circuit breaker
    ///
    /// # Arguments
    /// * `threshold` - Failures after which a URL is skipped
    /// * `cooldown` - How long a tripped URL stays skipped after its last failure
    #[must_use]
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            records: DashMap::new(),
            threshold,
            cooldown,
        }
    }

    /// Returns true if `url` should not be fetched right now
    ///
    /// A tripped record whose cooldown has run out is deleted here and the
    /// call returns false.
    pub fn should_skip(&self, url: &str, operation_id: &str) -> bool {
        {
            let Some(record) = self.records.get(url) else {
                return false;
            };
            if record.failure_count < self.threshold {
                return false;
            }

            let elapsed = record.last_failure.elapsed();
            if elapsed < self.cooldown {
                tracing::warn!(
                    "Circuit breaker active for {} (operation {}): {} failures, last {:?} ago; skipping",
                    url,
                    operation_id,
                    record.failure_count,
                    elapsed
                );
                return true;
            }
            // Shard guard must be released before removal
        }

        let removed = self.records.remove_if(url, |_, record| {
            record.failure_count >= self.threshold && record.last_failure.elapsed() >= self.cooldown
        });
        if removed.is_some() {
            tracing::info!("Circuit breaker reset for {} after cooldown", url);
        }
        false
    }

    /// Records one failed fetch of `url`
    pub fn record_failure(&self, url: &str) {
        let now = Instant::now();
        let count = {
            let record = self
                .records
                .entry(url.to_string())
                .and_modify(|r| {
                    r.failure_count += 1;
                    r.last_failure = now;
                })
                .or_insert(FailureRecord {
                    failure_count: 1,
                    last_failure: now,
                });
            record.failure_count
        };

        tracing::warn!("Incremented failure count for {} to {}", url, count);
    }

    /// Returns the recorded failure count for `url`, if any
    #[must_use]
    pub fn failure_count(&self, url: &str) -> Option<u32> {
        self.records.get(url).map(|r| r.failure_count)
    }

    /// Number of URLs with a failure record
    #[must_use]
    pub fn tracked_urls(&self) -> usize {
        self.records.len()
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
