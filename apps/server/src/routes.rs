//! HTTP surface: the `/analyze` route, response shaping, and CORS.
//!
//! Any pipeline error becomes a 500 carrying the error's message — no
//! finer-grained status mapping exists.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use featurelens_core::{AnalyzeConfig, analyze_repository};
use featurelens_shared::{
    AnalysisReport, AppConfig, Credentials, FeatureLensError, Result as LensResult,
};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Immutable per-process state shared by all requests.
pub struct AppState {
    config: AppConfig,
    credentials: Credentials,
    allow_origin: HeaderValue,
}

/// Build the application router.
pub fn router(config: AppConfig, credentials: Credentials) -> LensResult<Router> {
    let allow_origin = HeaderValue::from_str(&config.server.allow_origin).map_err(|e| {
        FeatureLensError::config(format!(
            "invalid allow_origin '{}': {e}",
            config.server.allow_origin
        ))
    })?;

    let state = Arc::new(AppState {
        config,
        credentials,
        allow_origin,
    });

    Ok(Router::new()
        .route("/analyze", post(analyze))
        .layer(middleware::from_fn_with_state(state.clone(), cors))
        .with_state(state))
}

// ---------------------------------------------------------------------------
// Request / response models
// ---------------------------------------------------------------------------

/// Body of `POST /analyze`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Repository reference: `owner/name` or a repository URL.
    pub repository_path: String,
}

/// One feature in the flattened response.
#[derive(Debug, Serialize)]
pub struct FeatureEntry {
    pub name: String,
    pub description: String,
    pub category: String,
    pub user_interactions: Vec<String>,
}

/// Body of a successful `POST /analyze` response.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub features: Vec<FeatureEntry>,
    pub categories: Vec<String>,
}

impl AnalyzeResponse {
    /// Flatten the categorized report into the response shape.
    fn from_report(report: AnalysisReport) -> Self {
        let mut features = Vec::new();
        let mut categories = Vec::new();

        for category in report.categories {
            categories.push(category.name.clone());
            for feature in category.features {
                features.push(FeatureEntry {
                    name: feature.title,
                    description: feature.description,
                    category: category.name.clone(),
                    user_interactions: feature.user_interactions,
                });
            }
        }

        Self {
            features,
            categories,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Wraps pipeline errors for the 500-with-message mapping.
struct ApiError(FeatureLensError);

impl From<FeatureLensError> for ApiError {
    fn from(err: FeatureLensError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "analysis failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Run the analysis pipeline for the requested repository.
#[instrument(skip_all, fields(repository = %request.repository_path))]
async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    info!("analysis requested");

    let config = AnalyzeConfig::from_app(
        &state.config,
        &state.credentials,
        &request.repository_path,
    )?;
    let outcome = analyze_repository(&config).await?;

    Ok(Json(AnalyzeResponse::from_report(outcome.report)))
}

/// CORS for the single configured origin: answers preflight directly and
/// stamps the allow headers on every response.
async fn cors(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        state.allow_origin.clone(),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("authorization, content-type"),
    );

    response
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
