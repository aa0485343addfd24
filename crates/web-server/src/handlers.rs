use crate::{error::AppError, AppState};
use analytics::{AnomalyReport, HealthAssessment, LoomSummary, QualityReport};
use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct AnomalyRequest {
    pub loom_id: String,
    #[serde(default)]
    pub hours: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MaintenanceRequest {
    pub loom_id: String,
}

#[derive(Debug, Deserialize)]
pub struct QualityRequest {
    pub loom_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct LoomQuery {
    pub loom_id: String,
}

fn require_loom(loom_id: &str) -> Result<&str, AppError> {
    let trimmed = loom_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("loom_id is required".to_string()));
    }
    Ok(trimmed)
}

/// # GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "service": "analytics",
    }))
}

/// # POST /api/v1/analytics/anomaly-detection
pub async fn detect_anomalies(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): WithRejection<Json<AnomalyRequest>, AppError>,
) -> Result<Json<AnomalyReport>, AppError> {
    let loom_id = require_loom(&request.loom_id)?;
    let report = state.facade.detect_anomalies(loom_id, request.hours).await?;
    Ok(Json(report))
}

/// # POST /api/v1/analytics/predict-maintenance
pub async fn predict_maintenance(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): WithRejection<Json<MaintenanceRequest>, AppError>,
) -> Result<Json<HealthAssessment>, AppError> {
    let loom_id = require_loom(&request.loom_id)?;
    let assessment = state.facade.predict_maintenance(loom_id).await?;
    Ok(Json(assessment))
}

/// # POST /api/v1/analytics/quality-report
/// `end_time` defaults to now.
pub async fn quality_report(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): WithRejection<Json<QualityRequest>, AppError>,
) -> Result<Json<QualityReport>, AppError> {
    let loom_id = require_loom(&request.loom_id)?;
    let report = state
        .facade
        .quality_report(loom_id, request.start_time, request.end_time)
        .await?;
    Ok(Json(report))
}

/// # GET /api/v1/analytics/summary?loom_id=
pub async fn summary(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(query), _): WithRejection<Query<LoomQuery>, AppError>,
) -> Result<Json<LoomSummary>, AppError> {
    let loom_id = require_loom(&query.loom_id)?;
    let summary = state.facade.summary(loom_id).await?;
    Ok(Json(summary))
}
