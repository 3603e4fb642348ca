//! Application configuration for FeatureLens.
//!
//! User config lives at `~/.featurelens/featurelens.toml`.
//! Secrets are never stored in the file — each section names the environment
//! variable that holds the credential, and [`Credentials::from_env`] reads
//! them at startup so absence fails fast instead of surfacing mid-request.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FeatureLensError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "featurelens.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".featurelens";

// ---------------------------------------------------------------------------
// Config structs (matching featurelens.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Code-host settings.
    #[serde(default)]
    pub github: GithubConfig,

    /// Completion-provider settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// File relevance policies.
    #[serde(default)]
    pub filter: FilterPoliciesConfig,

    /// Context assembly policy.
    #[serde(default)]
    pub assembly: AssemblyPolicyConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Name of the env var holding the bearer token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Base URL of the contents API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Maximum concurrent requests against the code host.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            api_base: default_api_base(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_api_base() -> String {
    "https://api.github.com".into()
}
fn default_concurrency() -> u32 {
    10
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the chat-completion API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model to use for feature extraction.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}

/// `[filter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterPoliciesConfig {
    /// File extensions considered source code (with leading dot).
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Case-insensitive path substrings that exclude a file outright.
    #[serde(default = "default_deny_patterns")]
    pub deny_patterns: Vec<String>,
}

impl Default for FilterPoliciesConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            deny_patterns: default_deny_patterns(),
        }
    }
}

fn default_allowed_extensions() -> Vec<String> {
    [".js", ".jsx", ".ts", ".tsx", ".vue", ".py", ".rb", ".php"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_deny_patterns() -> Vec<String> {
    [
        "test",
        "spec",
        "mock",
        "stub",
        "fixture",
        "config",
        "dist",
        "build",
        "node_modules",
        "util",
        "type",
        ".git",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[assembly]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyPolicyConfig {
    /// Bucketing policy: "category" or "priority".
    #[serde(default = "default_assembly_mode")]
    pub mode: String,
}

impl Default for AssemblyPolicyConfig {
    fn default() -> Self {
        Self {
            mode: default_assembly_mode(),
        }
    }
}

fn default_assembly_mode() -> String {
    "category".into()
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// The single origin allowed by CORS.
    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allow_origin: default_allow_origin(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".into()
}
fn default_allow_origin() -> String {
    "http://localhost:3000".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.featurelens/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FeatureLensError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.featurelens/featurelens.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FeatureLensError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        FeatureLensError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

// ---------------------------------------------------------------------------
// Credential resolution
// ---------------------------------------------------------------------------

/// Read a credential from the env var named in the config.
pub fn resolve_credential(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(FeatureLensError::config(format!(
            "credential not found: set the {var_name} environment variable"
        ))),
    }
}

/// Resolved secrets, read once at startup and passed explicitly to the
/// components that need them. Tests construct this directly with fakes.
#[derive(Clone)]
pub struct Credentials {
    /// Bearer token for the code host.
    pub github_token: String,
    /// API key for the completion provider.
    pub openai_api_key: String,
}

impl Credentials {
    /// Resolve both credentials from the env vars named in the config.
    ///
    /// Called at startup so a missing token or API key aborts before the
    /// first request rather than failing mid-pipeline.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            github_token: resolve_credential(&config.github.token_env)?,
            openai_api_key: resolve_credential(&config.openai.api_key_env)?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret material, even in debug logs.
        f.debug_struct("Credentials")
            .field("github_token", &"<redacted>")
            .field("openai_api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("GITHUB_TOKEN"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("allow_origin"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.github.concurrency, 10);
        assert_eq!(parsed.openai.model, "gpt-4o-mini");
        assert_eq!(parsed.assembly.mode, "category");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[openai]
model = "gpt-4"

[assembly]
mode = "priority"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.openai.model, "gpt-4");
        assert_eq!(config.openai.temperature, 0.7);
        assert_eq!(config.assembly.mode, "priority");
        assert!(config.filter.allowed_extensions.contains(&".tsx".into()));
    }

    #[test]
    fn credential_resolution_fails_on_unset_var() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.github.token_env = "FL_TEST_NONEXISTENT_TOKEN_98765".into();
        let result = Credentials::from_env(&config);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("FL_TEST_NONEXISTENT_TOKEN_98765")
        );
    }

    #[test]
    fn credentials_debug_never_leaks_secrets() {
        let creds = Credentials {
            github_token: "ghp_secret".into(),
            openai_api_key: "sk-secret".into(),
        };
        let printed = format!("{creds:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn default_deny_patterns_include_common_noise() {
        let filter = FilterPoliciesConfig::default();
        for pattern in ["test", "node_modules", "util", ".git"] {
            assert!(filter.deny_patterns.contains(&pattern.to_string()));
        }
    }
}
