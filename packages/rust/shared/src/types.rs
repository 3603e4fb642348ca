//! Core domain types for FeatureLens analysis runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FeatureLensError, Result};

// ---------------------------------------------------------------------------
// AnalysisId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one analysis run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisId(pub Uuid);

impl AnalysisId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AnalysisId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AnalysisId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// RepoRef
// ---------------------------------------------------------------------------

/// A reference to a hosted repository: owner plus repository name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Parse a repository reference from `"owner/name"` or a full URL
    /// (`https://github.com/owner/name`, trailing segments ignored).
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();

        let path = if trimmed.contains("://") {
            let url = url::Url::parse(trimmed).map_err(|e| {
                FeatureLensError::validation(format!("invalid repository URL '{trimmed}': {e}"))
            })?;
            url.path().trim_matches('/').to_string()
        } else {
            trimmed.trim_matches('/').to_string()
        };

        let mut parts = path.split('/');
        let owner = parts.next().unwrap_or_default();
        let repo = parts.next().unwrap_or_default();

        if owner.is_empty() || repo.is_empty() {
            return Err(FeatureLensError::validation(format!(
                "repository reference must be 'owner/name' or a repository URL, got '{trimmed}'"
            )));
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.trim_end_matches(".git").to_string(),
        })
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl std::str::FromStr for RepoRef {
    type Err = FeatureLensError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// FileRecord
// ---------------------------------------------------------------------------

/// A fetched source file: path, decoded content, and extension (with dot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Repository-relative path.
    pub path: String,
    /// Decoded UTF-8 file content.
    pub content: String,
    /// File extension including the leading dot (e.g. `.tsx`).
    pub extension: String,
}

/// A file that was selected but could not be turned into a [`FileRecord`],
/// with the reason it was dropped.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// AnalysisReport (the model's contract)
// ---------------------------------------------------------------------------

/// The categorized feature inventory the model is instructed to emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub categories: Vec<Category>,
}

/// A named group of related features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub features: Vec<Feature>,
}

/// One user-facing capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub user_interactions: Vec<String>,
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<Documentation>,
}

/// Step-by-step usage documentation for a feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Documentation {
    pub overview: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

// ---------------------------------------------------------------------------
// AnalysisSummary
// ---------------------------------------------------------------------------

/// Observability summary of a completed analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    /// Run identifier (appears in every log line of the run).
    pub id: AnalysisId,
    /// Number of file entries discovered by traversal.
    pub files_listed: usize,
    /// Number of files fetched and decoded successfully.
    pub files_fetched: usize,
    /// Number of selected files dropped (with reasons logged).
    pub files_skipped: usize,
    /// Size of the assembled context in bytes.
    pub context_bytes: usize,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Total wall-clock duration.
    pub elapsed: std::time::Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_id_roundtrip() {
        let id = AnalysisId::new();
        let s = id.to_string();
        let parsed: AnalysisId = s.parse().expect("parse AnalysisId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn repo_ref_from_owner_slash_name() {
        let r = RepoRef::parse("octocat/hello-world").unwrap();
        assert_eq!(r.owner, "octocat");
        assert_eq!(r.repo, "hello-world");
        assert_eq!(r.to_string(), "octocat/hello-world");
    }

    #[test]
    fn repo_ref_from_url() {
        let r = RepoRef::parse("https://github.com/octocat/hello-world").unwrap();
        assert_eq!(r.owner, "octocat");
        assert_eq!(r.repo, "hello-world");

        let r = RepoRef::parse("https://github.com/octocat/hello-world.git").unwrap();
        assert_eq!(r.repo, "hello-world");

        let r = RepoRef::parse("https://github.com/octocat/hello-world/tree/main/src").unwrap();
        assert_eq!(r.owner, "octocat");
        assert_eq!(r.repo, "hello-world");
    }

    #[test]
    fn repo_ref_rejects_garbage() {
        assert!(RepoRef::parse("").is_err());
        assert!(RepoRef::parse("just-a-name").is_err());
        assert!(RepoRef::parse("https://github.com/").is_err());
    }

    #[test]
    fn report_roundtrip() {
        let json = r#"{
            "categories": [
                {
                    "name": "Authentication",
                    "features": [
                        {
                            "title": "Sign In",
                            "description": "Log into the application",
                            "user_interactions": ["Enter email", "Enter password"],
                            "use_cases": ["Returning user access"],
                            "documentation": {
                                "overview": "Standard email login",
                                "steps": ["Open the login page", "Submit credentials"],
                                "tips": ["Use a password manager"]
                            }
                        }
                    ]
                }
            ]
        }"#;

        let report: AnalysisReport = serde_json::from_str(json).expect("deserialize");
        assert_eq!(report.categories.len(), 1);
        assert_eq!(report.categories[0].features[0].title, "Sign In");

        let out = serde_json::to_string(&report).expect("serialize");
        let back: AnalysisReport = serde_json::from_str(&out).expect("re-deserialize");
        assert_eq!(back.categories[0].name, "Authentication");
    }

    #[test]
    fn report_documentation_is_optional() {
        let json = r#"{"categories":[{"name":"Misc","features":[
            {"title":"T","description":"D","user_interactions":[],"use_cases":[]}
        ]}]}"#;
        let report: AnalysisReport = serde_json::from_str(json).expect("deserialize");
        assert!(report.categories[0].features[0].documentation.is_none());

        // Absent documentation must not serialize as null
        let out = serde_json::to_string(&report).unwrap();
        assert!(!out.contains("documentation"));
    }
}
