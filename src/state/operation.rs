//! Per-search operation state
//!
//! One `OperationState` exists per search. Its crawl is the only writer; any
//! number of request handlers read it concurrently. Externally visible data
//! (id, status, matched URLs) lives in an immutable `OperationSnapshot` that
//! the writer replaces wholesale after every change with a single atomic
//! pointer swap. Readers load the current `Arc` without locking and never
//! observe a half-applied update.

use crate::state::SearchStatus;
use crate::SitegrepError;
use arc_swap::{ArcSwap, Guard};
use dashmap::DashSet;
use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Opaque identifier of a search operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Generates a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OperationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for OperationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Externally visible view of a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationSnapshot {
    pub id: OperationId,
    pub status: SearchStatus,
    /// Matched URLs in discovery order
    pub urls: Vec<String>,
}

impl OperationSnapshot {
    /// Serializes the snapshot as the JSON document served to clients
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Mutable state of one search operation
pub struct OperationState {
    id: OperationId,
    keyword: String,
    keyword_lower: String,
    max_results: usize,
    max_visited: usize,

    /// Normalized URLs already discovered; internal, never published
    visited: DashSet<String>,

    /// Retries consumed by this operation
    retry_count: AtomicU32,

    /// Latest published snapshot; replaced, never mutated in place
    published: ArcSwap<OperationSnapshot>,

    finished_at: OnceLock<Instant>,
}

impl OperationState {
    /// Creates an unbounded operation for `keyword`
    pub fn new(keyword: impl Into<String>) -> Self {
        Self::with_limits(keyword, usize::MAX, usize::MAX)
    }

    /// Creates an operation whose result and visited sets never exceed the given sizes
    pub fn with_limits(keyword: impl Into<String>, max_results: usize, max_visited: usize) -> Self {
        let keyword = keyword.into();
        let id = OperationId::generate();
        let snapshot = OperationSnapshot {
            id: id.clone(),
            status: SearchStatus::Active,
            urls: Vec::new(),
        };

        Self {
            id,
            keyword_lower: keyword.to_lowercase(),
            keyword,
            max_results,
            max_visited,
            visited: DashSet::new(),
            retry_count: AtomicU32::new(0),
            published: ArcSwap::from_pointee(snapshot),
            finished_at: OnceLock::new(),
        }
    }

    pub fn id(&self) -> &OperationId {
        &self.id
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// The keyword lowercased once, for case-insensitive matching
    pub fn keyword_lower(&self) -> &str {
        &self.keyword_lower
    }

    /// Returns the latest published snapshot
    pub fn snapshot(&self) -> Arc<OperationSnapshot> {
        self.published.load_full()
    }

    pub fn status(&self) -> SearchStatus {
        self.published.load().status
    }

    pub fn result_count(&self) -> usize {
        self.published.load().urls.len()
    }

    /// Matched URLs in discovery order
    pub fn result_urls(&self) -> Vec<String> {
        self.published.load().urls.clone()
    }

    /// Merges a batch of matched URLs into the result set
    ///
    /// Duplicates are ignored and nothing is added once the result limit is
    /// reached. Returns the number of URLs actually added.
    pub fn add_urls<I>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let urls: Vec<String> = urls.into_iter().collect();

        self.publish(|current| {
            let mut next = current.urls.clone();
            let before = next.len();

            for url in &urls {
                if next.len() >= self.max_results {
                    break;
                }
                if !next.contains(url) {
                    next.push(url.clone());
                }
            }

            let added = next.len() - before;
            if added == 0 {
                return (None, 0);
            }
            let snapshot = OperationSnapshot {
                id: self.id.clone(),
                status: current.status,
                urls: next,
            };
            (Some(snapshot), added)
        })
    }

    /// Records a discovered URL for deduplication
    ///
    /// Returns true if the URL was new and the visited limit allowed it.
    pub fn add_visited_url(&self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.visited.contains(&url) || self.visited.len() >= self.max_visited {
            return false;
        }
        self.visited.insert(url)
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Moves the operation to `status` and republishes the snapshot
    ///
    /// Terminal states never change; attempting to leave one is an error.
    pub fn set_status(&self, status: SearchStatus) -> crate::Result<()> {
        let changed = self.publish(|current| {
            if !current.status.can_transition_to(status) {
                return (
                    None,
                    Err(SitegrepError::InvalidTransition {
                        from: current.status,
                        to: status,
                    }),
                );
            }
            if current.status == status {
                return (None, Ok(false));
            }
            let snapshot = OperationSnapshot {
                id: self.id.clone(),
                status,
                urls: current.urls.clone(),
            };
            (Some(snapshot), Ok(true))
        })?;

        if changed && status.is_terminal() {
            let _ = self.finished_at.set(Instant::now());
        }
        Ok(())
    }

    /// Replaces the published snapshot with the one `update` derives from it
    ///
    /// `update` returns the new snapshot (or None to leave it alone) and a
    /// result. The compare-and-swap is retried until it lands on the snapshot
    /// `update` saw.
    fn publish<T>(
        &self,
        mut update: impl FnMut(&OperationSnapshot) -> (Option<OperationSnapshot>, T),
    ) -> T {
        let mut current = self.published.load_full();
        loop {
            let (next, result) = update(&current);
            let Some(next) = next else {
                return result;
            };

            let previous = self.published.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*previous, &current) {
                return result;
            }
            current = Guard::into_inner(previous);
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::Acquire)
    }

    /// Unconditionally records one consumed retry, returning the new count
    pub fn increment_retry_count(&self) -> u32 {
        self.retry_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Consumes one retry if fewer than `max` have been used
    pub fn try_consume_retry(&self, max: u32) -> bool {
        self.retry_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < max).then_some(used + 1)
            })
            .is_ok()
    }

    /// Time since the operation reached a terminal state, if it has
    pub fn finished_for(&self) -> Option<Duration> {
        self.finished_at.get().map(Instant::elapsed)
    }
}

impl fmt::Debug for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationState")
            .field("id", &self.id)
            .field("keyword", &self.keyword)
            .field("status", &self.status())
            .field("results", &self.result_count())
            .field("visited", &self.visited_count())
            .field("retries", &self.retry_count())
            .finish()
    }
}
