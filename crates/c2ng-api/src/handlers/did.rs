//! Decentralized-identity lookups: pre-provisioned verifiable credentials
//! and verifier configurations, keyed by UAS identifier.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use c2ng_core::did::DidError;

use crate::auth::AuthUser;
use crate::error::{ApiFailure, ApiResult};
use crate::models::{DidConfigResponse, DidJwtResponse};
use crate::state::AppState;

/// `GET /did/jwt/{uasid}`.
pub async fn get_jwt(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(uasid): Path<String>,
) -> ApiResult<Json<DidJwtResponse>> {
    let jwt = state.did.issue_jwt(&uasid).map_err(|e| not_found(&uasid, e))?;

    Ok(Json(DidJwtResponse { success: true, jwt }))
}

/// `GET /did/config/{uasid}`.
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(uasid): Path<String>,
) -> ApiResult<Json<DidConfigResponse>> {
    let config = state
        .did
        .verifier_config(&uasid)
        .map_err(|e| not_found(&uasid, e))?;

    Ok(Json(DidConfigResponse {
        success: true,
        config,
    }))
}

fn not_found(uasid: &str, err: DidError) -> ApiFailure {
    tracing::error!(uasid, "Unable to serve DID material: {err}");
    ApiFailure::domain(json!({"UasID": "not_found"}))
}
