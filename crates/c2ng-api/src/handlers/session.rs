//! Session open and terminate endpoints.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;

use c2ng_core::session::Segment;

use crate::auth::AuthUser;
use crate::error::{ApiResult, BaseSuccess};
use crate::models::{decode_json, AerialConnectionSessionRequest, AerialConnectionSessionResponse};
use crate::state::AppState;

/// `POST /session` - open (or reopen) a connectivity session for one
/// segment and hand back addressing plus fresh credentials.
pub async fn open_session(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    body: Bytes,
) -> ApiResult<Json<AerialConnectionSessionResponse>> {
    let request: AerialConnectionSessionRequest = decode_json(&body)?;
    let valid = request.validate()?;

    let grant = match valid.segment {
        Segment::Ua => state.manager.open_ua_session(&valid.request).await?,
        Segment::Adx => state.manager.open_adx_session(&valid.request).await?,
    };

    Ok(Json(grant.into()))
}

/// `DELETE /session/{uasid}` - session termination endpoint. Termination is
/// not wired to the backends yet; the call acknowledges and leaves state
/// untouched.
pub async fn delete_session(
    State(_state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(uasid): Path<String>,
) -> Json<BaseSuccess> {
    tracing::warn!(uasid, "Session removal requested");
    Json(BaseSuccess::new())
}
