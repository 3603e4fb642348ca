//! Prompt context assembly.
//!
//! Takes the filtered [`FileRecord`]s and serializes them into one ordered
//! text block: files are grouped into named buckets, each bucket emitted
//! under a section header, each file rendered as a `File:` line followed by
//! its full content in a fenced block labeled with the file's extension.
//! The output is deterministic for a given input order and never truncates
//! file content — any length budget is a caller concern.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use featurelens_shared::{FeatureLensError, FileRecord, Result};

// ---------------------------------------------------------------------------
// Bucketing policies
// ---------------------------------------------------------------------------

/// How files are grouped into sections of the assembled context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyMode {
    /// Group by role: components, pages, api, other.
    Category,
    /// Group by priority tier: high, medium, low.
    Priority,
}

impl std::str::FromStr for AssemblyMode {
    type Err = FeatureLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "category" => Ok(Self::Category),
            "priority" => Ok(Self::Priority),
            other => Err(FeatureLensError::config(format!(
                "unknown assembly mode '{other}' (expected 'category' or 'priority')"
            ))),
        }
    }
}

/// Options for context assembly.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub mode: AssemblyMode,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            mode: AssemblyMode::Category,
        }
    }
}

/// Category-mode buckets, in declaration (= emission) order.
/// First matching substring wins.
const CATEGORY_BUCKETS: &[(&str, &[&str])] = &[
    ("components", &["component"]),
    ("pages", &["page", "view"]),
    ("api", &["api"]),
    ("other", &[]),
];

/// Priority-mode tiers, in emission order. First matching tier wins; the
/// low tier names support code explicitly but also catches everything else.
const PRIORITY_TIERS: &[(&str, &[&str])] = &[
    ("high priority", &["component", "page", "view", "screen", "form"]),
    ("medium priority", &["route", "controller", "handler"]),
    ("low priority", &["util", "helper", "service"]),
];

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Serialize the records into one prompt-ready context block.
///
/// Bucket membership is decided per record by first-match-wins substring
/// tests on the lowercased path; within-bucket order is input order; empty
/// buckets are omitted entirely.
#[instrument(skip_all, fields(files = records.len(), mode = ?opts.mode))]
pub fn assemble(records: &[FileRecord], opts: &AssemblyOptions) -> String {
    let buckets = match opts.mode {
        AssemblyMode::Category => CATEGORY_BUCKETS,
        AssemblyMode::Priority => PRIORITY_TIERS,
    };

    let mut grouped: Vec<Vec<&FileRecord>> = vec![Vec::new(); buckets.len()];

    for record in records {
        let idx = bucket_index(&record.path, buckets);
        grouped[idx].push(record);
    }

    let mut parts: Vec<String> = Vec::new();
    for ((label, _), members) in buckets.iter().zip(&grouped) {
        if members.is_empty() {
            continue;
        }

        parts.push(format!("\n=== {} ===\n", label.to_uppercase()));
        for record in members {
            parts.push(render_file(record));
        }
    }

    let context = parts.join("\n");
    debug!(bytes = context.len(), "context assembled");
    context
}

/// Index of the first bucket whose patterns match the path; the final
/// bucket is the catch-all.
fn bucket_index(path: &str, buckets: &[(&str, &[&str])]) -> usize {
    let lower = path.to_ascii_lowercase();
    for (idx, (_, patterns)) in buckets.iter().enumerate() {
        if patterns.iter().any(|p| lower.contains(p)) {
            return idx;
        }
    }
    buckets.len() - 1
}

/// Render one file as a `File:` line plus an extension-labeled fence.
fn render_file(record: &FileRecord) -> String {
    let lang = record.extension.trim_start_matches('.');
    format!(
        "\nFile: {}\n```{}\n{}\n```\n",
        record.path, lang, record.content
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
