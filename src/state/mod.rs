//! State module for tracking search progress
//!
//! # Components
//!
//! - `SearchStatus`: lifecycle of a search (active, done, failed)
//! - `OperationState`: per-search keyword, visited set, results and retry budget
//! - `OperationSnapshot`: the immutable view published to readers

mod operation;
mod search_status;

// Re-export main types
pub use operation::{OperationId, OperationSnapshot, OperationState};
pub use search_status::SearchStatus;
