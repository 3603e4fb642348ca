//! Concurrent repository file fetcher for the GitHub contents API.
//!
//! Traverses a repository tree breadth-first, one HTTP call per directory,
//! then fetches and decodes the content of each file selected by the
//! relevance filter. Per-subtree and per-file failures are absorbed
//! (skip-and-continue); only a failed root listing aborts the traversal.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use featurelens_shared::config::GithubConfig;
use featurelens_shared::{FeatureLensError, FileRecord, RepoRef, Result, SkippedFile};

use crate::filter::{FilterConfig, extension_of};

/// User-Agent string for code-host requests.
const USER_AGENT: &str = concat!("FeatureLens/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types (the only contents-API shape we consume)
// ---------------------------------------------------------------------------

/// One entry from a directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoEntry {
    pub name: String,
    pub path: String,
    /// `"file"`, `"dir"`, or something we ignore (symlink, submodule).
    #[serde(rename = "type")]
    pub kind: String,
}

/// A file response carrying base64 content.
#[derive(Debug, Deserialize)]
struct ContentsFile {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// FetchConfig / FetchOutcome
// ---------------------------------------------------------------------------

/// Runtime configuration for the fetcher.
#[derive(Clone)]
pub struct FetchConfig {
    /// Base URL of the contents API (no trailing slash).
    pub api_base: String,
    /// Bearer token for the code host.
    pub token: String,
    /// Maximum concurrent requests.
    pub concurrency: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the token, even in debug logs.
        f.debug_struct("FetchConfig")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .field("concurrency", &self.concurrency)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl FetchConfig {
    /// Build from the `[github]` config section plus a resolved token.
    pub fn new(github: &GithubConfig, token: String) -> Self {
        Self {
            api_base: github.api_base.trim_end_matches('/').to_string(),
            token,
            concurrency: github.concurrency,
            timeout_secs: github.timeout_secs,
        }
    }
}

/// Result of fetching the selected files: decoded records plus the files
/// that were dropped, each with its reason.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub records: Vec<FileRecord>,
    pub skipped: Vec<SkippedFile>,
}

// ---------------------------------------------------------------------------
// RepoFetcher
// ---------------------------------------------------------------------------

/// Fetches file listings and contents from a hosted repository.
pub struct RepoFetcher {
    config: FetchConfig,
    client: Client,
}

impl RepoFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FeatureLensError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn contents_url(&self, repo: &RepoRef, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{path}",
            self.config.api_base, repo.owner, repo.repo
        )
    }

    /// List every file entry reachable from the repository root.
    ///
    /// Directories discovered in one round are listed concurrently, bounded
    /// by the configured cap. A non-200 for any directory yields an empty
    /// subtree; only a failed root listing is fatal. The returned order is
    /// not guaranteed across concurrent rounds.
    #[instrument(skip_all, fields(repo = %repo))]
    pub async fn list_files(&self, repo: &RepoRef) -> Result<Vec<RepoEntry>> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency as usize));

        let mut queue: Vec<String> = vec![String::new()];
        let mut files: Vec<RepoEntry> = Vec::new();
        let mut directories_listed: usize = 0;

        while !queue.is_empty() {
            let batch: Vec<String> = queue.drain(..).collect();
            let mut handles = Vec::new();

            for path in batch {
                let client = self.client.clone();
                let url = self.contents_url(repo, &path);
                let token = self.config.token.clone();
                let sem = semaphore.clone();

                handles.push(tokio::spawn(async move {
                    let _permit = sem.acquire().await.expect("semaphore closed");
                    (path, list_directory(&client, &url, &token).await)
                }));
            }

            for handle in handles {
                let (path, listed) = handle
                    .await
                    .map_err(|e| FeatureLensError::Fetch(format!("listing task failed: {e}")))?;
                directories_listed += 1;

                match listed {
                    Ok(entries) => {
                        for entry in entries {
                            match entry.kind.as_str() {
                                "file" => files.push(entry),
                                "dir" => queue.push(entry.path),
                                other => {
                                    debug!(path = %entry.path, kind = other, "ignoring entry")
                                }
                            }
                        }
                    }
                    Err(e) if path.is_empty() => {
                        // The root listing failing means the repository itself
                        // is unreachable; nothing useful can follow.
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(%path, error = %e, "directory unreadable, treating as empty");
                    }
                }
            }
        }

        info!(
            files = files.len(),
            directories = directories_listed,
            "repository traversal complete"
        );

        Ok(files)
    }

    /// Fetch and decode the content of every entry accepted by `filter`.
    ///
    /// Individual fetch or decode failures are recorded in the outcome's
    /// `skipped` list and never abort the batch.
    #[instrument(skip_all, fields(repo = %repo, candidates = entries.len()))]
    pub async fn fetch_records(
        &self,
        repo: &RepoRef,
        entries: &[RepoEntry],
        filter: &FilterConfig,
    ) -> FetchOutcome {
        let selected: Vec<&RepoEntry> = entries
            .iter()
            .filter(|e| e.kind == "file" && filter.is_relevant(&e.name, &e.path))
            .collect();

        debug!(selected = selected.len(), "relevance filter applied");

        let fetches: Vec<_> = selected
            .into_iter()
            .map(|entry| {
                let client = self.client.clone();
                let url = self.contents_url(repo, &entry.path);
                let token = self.config.token.clone();
                let name = entry.name.clone();
                let path = entry.path.clone();

                async move {
                    let fetched = fetch_file(&client, &url, &token).await;
                    (name, path, fetched)
                }
            })
            .collect();

        let results: Vec<_> = futures::stream::iter(fetches)
            .buffer_unordered(self.config.concurrency as usize)
            .collect()
            .await;

        let mut outcome = FetchOutcome::default();
        for (name, path, fetched) in results {
            match fetched {
                Ok(content) => {
                    let extension = extension_of(&name).unwrap_or_default().to_string();
                    outcome.records.push(FileRecord {
                        path,
                        content,
                        extension,
                    });
                }
                Err(e) => {
                    warn!(%path, error = %e, "file dropped");
                    outcome.skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            fetched = outcome.records.len(),
            skipped = outcome.skipped.len(),
            "file contents fetched"
        );

        outcome
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// List one directory; non-200 responses are errors for the caller to absorb.
async fn list_directory(client: &Client, url: &str, token: &str) -> Result<Vec<RepoEntry>> {
    let response = client
        .get(url)
        .bearer_auth(token)
        .header("Accept", "application/vnd.github.v3+json")
        .send()
        .await
        .map_err(|e| FeatureLensError::Fetch(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FeatureLensError::Fetch(format!("{url}: HTTP {status}")));
    }

    response
        .json::<Vec<RepoEntry>>()
        .await
        .map_err(|e| FeatureLensError::Fetch(format!("{url}: invalid listing: {e}")))
}

/// Fetch a single file and decode its base64 content to UTF-8.
async fn fetch_file(client: &Client, url: &str, token: &str) -> Result<String> {
    let response = client
        .get(url)
        .bearer_auth(token)
        .header("Accept", "application/vnd.github.v3+json")
        .send()
        .await
        .map_err(|e| FeatureLensError::Fetch(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FeatureLensError::Fetch(format!("{url}: HTTP {status}")));
    }

    let file: ContentsFile = response
        .json()
        .await
        .map_err(|e| FeatureLensError::Fetch(format!("{url}: invalid file response: {e}")))?;

    let encoded = file
        .content
        .ok_or_else(|| FeatureLensError::Fetch(format!("{url}: response has no content field")))?;

    decode_content(&encoded).map_err(|e| FeatureLensError::Fetch(format!("{url}: {e}")))
}

/// Decode the newline-wrapped base64 payload the contents API returns.
fn decode_content(encoded: &str) -> std::result::Result<String, String> {
    let compact: String = encoded.split_whitespace().collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| format!("base64 decode failed: {e}"))?;
    String::from_utf8(bytes).map_err(|e| format!("content is not UTF-8: {e}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> FetchConfig {
        FetchConfig {
            api_base: server.uri(),
            token: "test-token".into(),
            concurrency: 4,
            timeout_secs: 5,
        }
    }

    fn test_repo() -> RepoRef {
        RepoRef {
            owner: "octocat".into(),
            repo: "demo".into(),
        }
    }

    #[test]
    fn decode_handles_newline_wrapped_base64() {
        // "hello world" encoded and wrapped the way the contents API wraps it
        let wrapped = "aGVsbG8g\nd29ybGQ=\n";
        assert_eq!(decode_content(wrapped).unwrap(), "hello world");
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(decode_content("!!not base64!!").is_err());
    }

    #[tokio::test]
    async fn traversal_collects_files_recursively() {
        let server = MockServer::start().await;

        let root = serde_json::json!([
            {"name": "app.ts", "path": "app.ts", "type": "file"},
            {"name": "src", "path": "src", "type": "dir"},
        ]);
        let src = serde_json::json!([
            {"name": "Nav.tsx", "path": "src/Nav.tsx", "type": "file"},
        ]);

        Mock::given(method("GET"))
            .and(path("/repos/octocat/demo/contents/"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(root))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/octocat/demo/contents/src"))
            .respond_with(ResponseTemplate::new(200).set_body_json(src))
            .mount(&server)
            .await;

        let fetcher = RepoFetcher::new(test_config(&server)).unwrap();
        let files = fetcher.list_files(&test_repo()).await.unwrap();

        let mut paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["app.ts", "src/Nav.tsx"]);
    }

    #[tokio::test]
    async fn unreadable_subtree_is_empty_and_siblings_complete() {
        let server = MockServer::start().await;

        let root = serde_json::json!([
            {"name": "src", "path": "src", "type": "dir"},
            {"name": "vendor", "path": "vendor", "type": "dir"},
        ]);
        let src = serde_json::json!([
            {"name": "main.py", "path": "src/main.py", "type": "file"},
        ]);

        Mock::given(method("GET"))
            .and(path("/repos/octocat/demo/contents/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(root))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/octocat/demo/contents/src"))
            .respond_with(ResponseTemplate::new(200).set_body_json(src))
            .mount(&server)
            .await;

        // vendor/ is forbidden — must act like an empty directory
        Mock::given(method("GET"))
            .and(path("/repos/octocat/demo/contents/vendor"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let fetcher = RepoFetcher::new(test_config(&server)).unwrap();
        let files = fetcher.list_files(&test_repo()).await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "src/main.py");
    }

    #[tokio::test]
    async fn root_listing_failure_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octocat/demo/contents/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = RepoFetcher::new(test_config(&server)).unwrap();
        let result = fetcher.list_files(&test_repo()).await;

        assert!(matches!(result, Err(FeatureLensError::Fetch(_))));
    }

    #[tokio::test]
    async fn fetch_records_decodes_and_skips() {
        let server = MockServer::start().await;

        // "export {}" → base64
        let good = BASE64.encode("export {}");

        Mock::given(method("GET"))
            .and(path("/repos/octocat/demo/contents/src/App.tsx"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"content": good, "encoding": "base64"})),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/octocat/demo/contents/src/Broken.tsx"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"content": "%%%", "encoding": "base64"})),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/octocat/demo/contents/src/Gone.tsx"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let entries = vec![
            RepoEntry {
                name: "App.tsx".into(),
                path: "src/App.tsx".into(),
                kind: "file".into(),
            },
            RepoEntry {
                name: "Broken.tsx".into(),
                path: "src/Broken.tsx".into(),
                kind: "file".into(),
            },
            RepoEntry {
                name: "Gone.tsx".into(),
                path: "src/Gone.tsx".into(),
                kind: "file".into(),
            },
            // Filtered out before any request is made
            RepoEntry {
                name: "App.test.tsx".into(),
                path: "src/App.test.tsx".into(),
                kind: "file".into(),
            },
        ];

        let fetcher = RepoFetcher::new(test_config(&server)).unwrap();
        let outcome = fetcher
            .fetch_records(&test_repo(), &entries, &FilterConfig::default())
            .await;

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].path, "src/App.tsx");
        assert_eq!(outcome.records[0].content, "export {}");
        assert_eq!(outcome.records[0].extension, ".tsx");

        assert_eq!(outcome.skipped.len(), 2);
        let skipped_paths: Vec<&str> =
            outcome.skipped.iter().map(|s| s.path.as_str()).collect();
        assert!(skipped_paths.contains(&"src/Broken.tsx"));
        assert!(skipped_paths.contains(&"src/Gone.tsx"));
        for skip in &outcome.skipped {
            assert!(!skip.reason.is_empty());
        }
    }

    #[tokio::test]
    async fn missing_content_field_is_skipped() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octocat/demo/contents/src/Empty.tsx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let entries = vec![RepoEntry {
            name: "Empty.tsx".into(),
            path: "src/Empty.tsx".into(),
            kind: "file".into(),
        }];

        let fetcher = RepoFetcher::new(test_config(&server)).unwrap();
        let outcome = fetcher
            .fetch_records(&test_repo(), &entries, &FilterConfig::default())
            .await;

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.skipped.len(), 1);
        assert!(outcome.skipped[0].reason.contains("no content field"));
    }
}
