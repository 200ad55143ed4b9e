//! URL handling module for Sitegrep
//!
//! This module provides URL normalization, seed parsing and host extraction.

mod domain;
mod normalize;

pub use domain::{extract_host, is_same_host};
pub use normalize::{normalize_url, parse_seed_url};
