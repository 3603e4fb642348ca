//! Repository file fetching and relevance filtering.
//!
//! This crate provides:
//! - [`RepoFetcher`] — concurrent contents-API traversal and file fetching
//! - [`FilterConfig`] — the pure include/exclude predicate deciding which
//!   files enter the analysis

pub mod fetcher;
pub mod filter;

pub use fetcher::{FetchConfig, FetchOutcome, RepoEntry, RepoFetcher};
pub use filter::{FilterConfig, extension_of};
