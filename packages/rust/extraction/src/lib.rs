//! Feature extraction via an OpenAI-compatible chat-completion endpoint.
//!
//! Sends exactly two messages — the fixed extraction instruction and one
//! user message carrying the assembled context — with JSON-object response
//! mode, and returns the raw textual payload of the first choice.
//! Parsing that payload into an [`AnalysisReport`] is a separate boundary
//! ([`parse_report`]) so "model unreachable" and "model produced garbage"
//! stay distinguishable.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use featurelens_shared::config::OpenAiConfig;
use featurelens_shared::{AnalysisReport, FeatureLensError, Result};

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("FeatureLens/", env!("CARGO_PKG_VERSION"));

/// Cap on upstream error bodies quoted into error messages.
const MAX_ERROR_BODY_BYTES: usize = 8 * 1024;

/// The fixed extraction instruction. The wording restates a five-step
/// procedure; the binding parts are the user-facing-only constraint, the
/// exact output schema, and the instruction to ignore internal plumbing.
const SYSTEM_PROMPT: &str = r#"You are an expert code analyzer. Follow these steps:

1. READ & UNDERSTAND:
- Carefully read through all provided code
- Make notes about functionality and purpose
- Identify key components and their relationships

2. LIST ALL FUNCTIONALITY:
- Document all features and capabilities
- Include both frontend and backend functionality
- Note system processes and user interactions

3. IDENTIFY USER FEATURES:
- Focus on user-facing features only
- Look for UI components, forms, and interactive elements
- Ignore internal, configuration, and infrastructure code

4. CATEGORIZE & DESCRIBE:
- Group features into logical categories
- Write clear, user-friendly feature titles
- Provide simple explanations for each feature

5. CREATE USER DOCUMENTATION:
- Focus on how users interact with each feature
- Provide step-by-step usage instructions
- Include practical examples and use cases

Format the response as a JSON object with:
{
    "categories": [
        {
            "name": "Category Name",
            "features": [
                {
                    "title": "User-Friendly Feature Title",
                    "description": "Clear explanation for users",
                    "user_interactions": ["Step 1", "Step 2", ...],
                    "use_cases": ["Example 1", "Example 2", ...],
                    "documentation": {
                        "overview": "Brief overview",
                        "steps": ["Detailed step 1", "Detailed step 2", ...],
                        "tips": ["Helpful tip 1", "Helpful tip 2", ...]
                    }
                }
            ]
        }
    ]
}"#;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// ExtractionConfig / ExtractionClient
// ---------------------------------------------------------------------------

/// Runtime configuration for the extraction client.
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Base URL of the chat-completion API (no trailing slash).
    pub base_url: String,
    /// Provider API key.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the API key, even in debug logs.
        f.debug_struct("ExtractionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Build from the `[openai]` config section plus a resolved API key.
    pub fn new(openai: &OpenAiConfig, api_key: String) -> Self {
        Self {
            base_url: openai.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: openai.model.clone(),
            temperature: openai.temperature,
            timeout_secs: openai.timeout_secs,
        }
    }
}

/// Client for the chat-completion endpoint.
pub struct ExtractionClient {
    config: ExtractionConfig,
    http: Client,
}

impl ExtractionClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                FeatureLensError::Extraction(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { config, http })
    }

    /// Submit the assembled context and return the raw JSON text of the
    /// first completion choice.
    #[instrument(skip_all, fields(model = %self.config.model, context_bytes = context.len()))]
    pub async fn extract_features(&self, context: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Analyze this codebase and identify user-facing features:\n\n{context}"
                    ),
                },
            ],
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FeatureLensError::Extraction(format!("completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_limited_text(response).await;
            return Err(FeatureLensError::Extraction(format!(
                "completion endpoint returned HTTP {status}: {body}"
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            FeatureLensError::Extraction(format!("invalid completion envelope: {e}"))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                FeatureLensError::Extraction("completion has no choices[0].message.content".into())
            })?;

        info!(reply_bytes = content.len(), "completion received");
        Ok(content)
    }
}

/// Parse the raw completion payload into a report.
///
/// This is the malformed-output boundary: anything that is not valid JSON
/// matching the report schema becomes [`FeatureLensError::MalformedOutput`].
pub fn parse_report(raw: &str) -> Result<AnalysisReport> {
    let report: AnalysisReport = serde_json::from_str(raw)
        .map_err(|e| FeatureLensError::malformed(format!("{e}")))?;

    debug!(categories = report.categories.len(), "report parsed");
    Ok(report)
}

async fn read_limited_text(response: reqwest::Response) -> String {
    match response.bytes().await {
        Ok(mut bytes) => {
            if bytes.len() > MAX_ERROR_BODY_BYTES {
                bytes.truncate(MAX_ERROR_BODY_BYTES);
            }
            String::from_utf8_lossy(&bytes).to_string()
        }
        Err(_) => "<failed to read error body>".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
