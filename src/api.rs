//! REST API server for the transformation crew
//!
//! Thin HTTP layer over the pipeline: run an analysis, normalize it, store it
//! per owner, and serve the latest stored report back.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::crew::Crew;
use crate::error::PipelineError;
use crate::fusion::normalize;
use crate::models::OrganizationProfile;
use crate::store::{owner_id, ReportStore, StoredReport};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(flatten)]
    pub profile: OrganizationProfile,
    /// Opaque caller token; reports are stored and looked up under it
    #[serde(default)]
    pub owner: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub crew: Arc<Crew>,
    pub store: Arc<dyn ReportStore>,
    pub deadline: Duration,
}

/// Transient upstream trouble is the caller's to retry; everything else is ours
pub fn status_for(err: &PipelineError) -> StatusCode {
    if err.is_retryable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn failure(err: PipelineError) -> (StatusCode, Json<ApiResponse>) {
    let status = status_for(&err);
    if status == StatusCode::SERVICE_UNAVAILABLE {
        warn!(error = %err, "Analysis unavailable, caller may retry");
    } else {
        error!(error = %err, "Analysis failed");
    }
    (status, Json(ApiResponse::error(err.to_string())))
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "agents": state.crew.roster(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Analysis Endpoint
/// =============================

async fn analyze(
    State(state): State<ApiState>,
    Json(req): Json<AnalyzeRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.profile.company_name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("companyName must not be empty".into())),
        );
    }

    let owner = owner_id(req.owner.as_deref());
    info!(
        company = %req.profile.company_name,
        owner = %owner,
        has_document = req.profile.document_text().is_some(),
        "Received analysis request"
    );

    let result = match state.crew.run_with_deadline(req.profile, state.deadline).await {
        Ok(result) => result,
        Err(e) => return failure(e),
    };

    let record = StoredReport::new(owner, normalize(&result));
    let fingerprint = record.fingerprint.clone();
    let fused = record.fused.clone();

    let report_id = match state.store.save(owner, record).await {
        Ok(id) => id,
        Err(e) => return failure(e),
    };

    info!(report_id = %report_id, fingerprint = %fingerprint, "Analysis stored");

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "reportId": report_id,
            "owner": owner,
            "fingerprint": fingerprint,
            "result": fused,
        }))),
    )
}

/// =============================
/// Report Lookup Endpoint
/// =============================

async fn latest_report(
    State(state): State<ApiState>,
    Path(owner): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let owner = owner_id(Some(&owner));

    match state.store.latest(owner).await {
        Ok(Some(report)) => (StatusCode::OK, Json(ApiResponse::success(report))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("No report stored for owner {}", owner))),
        ),
        Err(e) => failure(e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/reports/:owner", get(latest_report))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
