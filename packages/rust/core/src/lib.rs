//! End-to-end analysis pipeline for FeatureLens.
//!
//! Ties together repository traversal, relevance filtering, context
//! assembly, and feature extraction into one `analyze_repository` flow.

pub mod pipeline;

pub use pipeline::{AnalyzeConfig, AnalyzeOutcome, analyze_repository};
