//! Relevance filter: decides which repository files enter the analysis.
//!
//! A file is included when its extension is in the allow-set AND no
//! case-insensitive substring of its full path matches a deny pattern.
//! Exclusion always wins over inclusion. The predicate is pure — no I/O.

use featurelens_shared::config::FilterPoliciesConfig;

/// Pattern sets driving the relevance predicate.
///
/// Deny patterns are matched case-insensitively against the full path;
/// extensions keep their leading dot and are compared case-insensitively.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    allowed_extensions: Vec<String>,
    deny_patterns: Vec<String>,
}

impl FilterConfig {
    /// Build a filter from explicit pattern sets.
    pub fn new(allowed_extensions: Vec<String>, deny_patterns: Vec<String>) -> Self {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
            deny_patterns: deny_patterns
                .into_iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether the file at `path` (with file name `name`) is in scope.
    pub fn is_relevant(&self, name: &str, path: &str) -> bool {
        // Deny wins: check exclusion before the extension.
        let lower_path = path.to_ascii_lowercase();
        if self
            .deny_patterns
            .iter()
            .any(|pattern| lower_path.contains(pattern))
        {
            return false;
        }

        match extension_of(name) {
            Some(ext) => {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions.iter().any(|a| *a == ext)
            }
            None => false,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::from(&FilterPoliciesConfig::default())
    }
}

impl From<&FilterPoliciesConfig> for FilterConfig {
    fn from(policies: &FilterPoliciesConfig) -> Self {
        Self::new(
            policies.allowed_extensions.clone(),
            policies.deny_patterns.clone(),
        )
    }
}

/// Extract the extension (with leading dot) from a file name.
pub fn extension_of(name: &str) -> Option<&str> {
    name.rfind('.').map(|idx| &name[idx..])
}
