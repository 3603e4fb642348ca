//! Shared types, error model, and configuration for FeatureLens.
//!
//! This crate is the foundation depended on by all other FeatureLens crates.
//! It provides:
//! - [`FeatureLensError`] — the unified error type
//! - Domain types ([`RepoRef`], [`FileRecord`], [`AnalysisReport`], [`AnalysisId`])
//! - Configuration ([`AppConfig`], config loading, credential validation)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AssemblyPolicyConfig, Credentials, FilterPoliciesConfig, GithubConfig,
    OpenAiConfig, ServerConfig, config_dir, config_file_path, load_config, load_config_from,
    resolve_credential,
};
pub use error::{FeatureLensError, Result};
pub use types::{
    AnalysisId, AnalysisReport, AnalysisSummary, Category, Documentation, Feature, FileRecord,
    RepoRef, SkippedFile,
};
