/// Status definitions for search operations
///
/// A search starts `Active` and ends in exactly one of the terminal states.
use serde::Serialize;
use std::fmt;

/// Represents the lifecycle state of a search operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    /// The crawl is still running (or queued for a worker)
    Active,

    /// The crawl finished; results are final
    Done,

    /// The crawl aborted on an unrecoverable error
    Failed,
}

impl SearchStatus {
    /// Returns true if this is a terminal state (no further changes)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// Transitions only go forward: `Active` may move anywhere, terminal states
    /// only accept re-assertion of themselves.
    pub fn can_transition_to(&self, next: SearchStatus) -> bool {
        match self {
            Self::Active => true,
            terminal => *terminal == next,
        }
    }

    /// Lowercase name used in snapshots and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
