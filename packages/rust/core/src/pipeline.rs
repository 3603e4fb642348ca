//! End-to-end `analyze` pipeline: repository → listing → filter → context → report.

use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};

use featurelens_context::{AssemblyMode, AssemblyOptions, assemble};
use featurelens_extraction::{ExtractionClient, ExtractionConfig, parse_report};
use featurelens_github::{FetchConfig, FilterConfig, RepoFetcher};
use featurelens_shared::{
    AnalysisId, AnalysisReport, AnalysisSummary, AppConfig, Credentials, FeatureLensError,
    RepoRef, Result,
};

/// Configuration for one analysis run, assembled from the app config plus
/// the caller-supplied repository reference. Every component receives its
/// piece explicitly — there is no process-wide mutable state.
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    /// Repository to analyze.
    pub repo: RepoRef,
    /// Fetcher settings (API base, token, concurrency, timeout).
    pub fetch: FetchConfig,
    /// Relevance filter pattern sets.
    pub filter: FilterConfig,
    /// Context bucketing policy.
    pub assembly: AssemblyOptions,
    /// Completion endpoint settings.
    pub extraction: ExtractionConfig,
}

impl AnalyzeConfig {
    /// Build a run config from the app config, the startup-resolved
    /// credentials, and a repository reference (`owner/name` or URL).
    pub fn from_app(
        config: &AppConfig,
        credentials: &Credentials,
        repository: &str,
    ) -> Result<Self> {
        let repo = RepoRef::parse(repository)?;
        let mode: AssemblyMode = config.assembly.mode.parse()?;

        Ok(Self {
            repo,
            fetch: FetchConfig::new(&config.github, credentials.github_token.clone()),
            filter: FilterConfig::from(&config.filter),
            assembly: AssemblyOptions { mode },
            extraction: ExtractionConfig::new(&config.openai, credentials.openai_api_key.clone()),
        })
    }
}

/// Result of a completed analysis run.
#[derive(Debug)]
pub struct AnalyzeOutcome {
    /// The parsed, categorized feature inventory.
    pub report: AnalysisReport,
    /// Run statistics for logging and observability.
    pub summary: AnalysisSummary,
}

/// Run the full analysis pipeline.
///
/// 1. Traverse the repository tree
/// 2. Filter and fetch relevant file contents
/// 3. Assemble the prompt context
/// 4. Request the completion
/// 5. Parse the report at the malformed-output boundary
#[instrument(skip_all, fields(repo = %config.repo))]
pub async fn analyze_repository(config: &AnalyzeConfig) -> Result<AnalyzeOutcome> {
    let start = Instant::now();
    let started_at = Utc::now();
    let id = AnalysisId::new();

    info!(%id, repo = %config.repo, "starting analysis");

    let fetcher = RepoFetcher::new(config.fetch.clone())?;

    // --- Phase 1: traversal ---
    let entries = fetcher.list_files(&config.repo).await?;

    // --- Phase 2: filter + content fetch ---
    let fetched = fetcher
        .fetch_records(&config.repo, &entries, &config.filter)
        .await;

    if !fetched.skipped.is_empty() {
        warn!(
            %id,
            skipped = fetched.skipped.len(),
            "some selected files were dropped"
        );
    }

    if fetched.records.is_empty() {
        return Err(FeatureLensError::validation(format!(
            "no relevant source files found in {}",
            config.repo
        )));
    }

    // --- Phase 3: context assembly ---
    let context = assemble(&fetched.records, &config.assembly);

    // --- Phase 4: extraction ---
    let client = ExtractionClient::new(config.extraction.clone())?;
    let raw = client.extract_features(&context).await?;

    // --- Phase 5: parse ---
    let report = parse_report(&raw)?;

    let summary = AnalysisSummary {
        id,
        files_listed: entries.len(),
        files_fetched: fetched.records.len(),
        files_skipped: fetched.skipped.len(),
        context_bytes: context.len(),
        started_at,
        elapsed: start.elapsed(),
    };

    info!(
        id = %summary.id,
        files_listed = summary.files_listed,
        files_fetched = summary.files_fetched,
        files_skipped = summary.files_skipped,
        context_bytes = summary.context_bytes,
        categories = report.categories.len(),
        elapsed_ms = summary.elapsed.as_millis(),
        "analysis complete"
    );

    Ok(AnalyzeOutcome { report, summary })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
