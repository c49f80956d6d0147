//! Peer address and certificate lookups.
//!
//! Both endpoints resolve the session document and pick the endpoint record
//! named by the path segment; they differ only in which record fields they
//! return.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use c2ng_core::session::{Endpoint, Segment};

use crate::auth::AuthUser;
use crate::error::{ApiFailure, ApiResult};
use crate::models::{AddressRequestResponse, CertificateRequestResponse};
use crate::state::AppState;

/// `GET /address/{uasid}/{segment}`.
pub async fn get_address(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path((uasid, segment)): Path<(String, String)>,
) -> ApiResult<Json<AddressRequestResponse>> {
    let endpoint = resolve_endpoint(&state, &uasid, &segment).await?;

    Ok(Json(AddressRequestResponse {
        success: true,
        address: endpoint.ip,
    }))
}

/// `GET /certificate/{uasid}/{segment}`.
pub async fn get_certificate(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path((uasid, segment)): Path<(String, String)>,
) -> ApiResult<Json<CertificateRequestResponse>> {
    let endpoint = resolve_endpoint(&state, &uasid, &segment).await?;

    Ok(Json(CertificateRequestResponse {
        success: true,
        kid: endpoint.kid,
        certificate: endpoint.certificate,
    }))
}

/// Resolve the endpoint record for `(uasid, segment)`, mapping each miss
/// onto its taxonomy code.
async fn resolve_endpoint(
    state: &AppState,
    uasid: &str,
    segment: &str,
) -> Result<Endpoint, ApiFailure> {
    if uasid.is_empty() {
        return Err(ApiFailure::domain(json!({"UasID": "not_found"})));
    }

    let Some(session) = state.store.get(uasid).await? else {
        tracing::info!(uasid, "Session not found");
        return Err(ApiFailure::domain(json!({"Session": "session_not_found"})));
    };

    let Some(segment) = Segment::parse(segment) else {
        tracing::warn!(uasid, segment, "Invalid segment");
        return Err(ApiFailure::domain(json!({"Segment": "invalid"})));
    };

    let Some(endpoint) = session.endpoint(segment) else {
        return Err(ApiFailure::domain(json!({"Session": "peer_not_connected"})));
    };

    Ok(endpoint.clone())
}
