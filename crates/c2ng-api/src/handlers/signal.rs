//! Telemetry ingest and read-back.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use crate::auth::AuthUser;
use crate::error::{ApiFailure, ApiResult, BaseSuccess};
use crate::models::{decode_json, SignalRequestResponse, SignalStatsReportRequest};
use crate::state::AppState;

/// `POST /signal/{uasid}` - receive one measurement sample.
pub async fn post_signal(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(uasid): Path<String>,
    body: Bytes,
) -> ApiResult<Json<BaseSuccess>> {
    let report: SignalStatsReportRequest = decode_json(&body)?;
    let packet = report.validate()?;

    state.signals.write_signal(&uasid, &packet).await?;
    tracing::info!(uasid, "Signal data written");
    Ok(Json(BaseSuccess::new()))
}

/// `GET /signal/{uasid}` - recent aggregated signal samples.
pub async fn get_signal(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(uasid): Path<String>,
) -> ApiResult<Json<SignalRequestResponse>> {
    let stats = state.stats.get_signal_stats(&uasid).await.map_err(|e| {
        tracing::error!(uasid, "Failed to read signal stats: {e}");
        ApiFailure::domain(json!({"Database": "unable_to_read"}))
    })?;

    Ok(Json(SignalRequestResponse {
        success: true,
        stats,
    }))
}
