//! HTTP/WebSocket frontend of the C2NG service.
//!
//! Endpoints:
//!
//! * `POST /session` - open (or reopen) a connectivity session
//! * `DELETE /session/{uasid}` - terminate a session (acknowledge-only)
//! * `GET /certificate/{uasid}/{segment}` - peer certificate lookup
//! * `GET /address/{uasid}/{segment}` - peer address lookup
//! * `POST|GET /signal/{uasid}` - telemetry ingest and read-back
//! * `POST /notifications/auth/{uasid}/{segment}` - WebSocket ticket
//! * `GET /notifications/websocket` - notification channel upgrade
//! * `GET /did/jwt/{uasid}`, `GET /did/config/{uasid}` - DID lookups
//! * `GET /` and `GET /gui/dashboard` - HTML pages
//!
//! All JSON endpoints answer the `{Success, ...}` envelope; bearer tokens
//! travel in the `Authentication` header.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

use state::AppState;

/// Build the service router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::home::homepage))
        .route("/session", post(handlers::session::open_session))
        .route("/session/:uasid", delete(handlers::session::delete_session))
        .route(
            "/certificate/:uasid/:segment",
            get(handlers::peers::get_certificate),
        )
        .route(
            "/address/:uasid/:segment",
            get(handlers::peers::get_address),
        )
        .route(
            "/signal/:uasid",
            post(handlers::signal::post_signal).get(handlers::signal::get_signal),
        )
        .route(
            "/notifications/auth/:uasid/:segment",
            post(handlers::notify::ws_auth),
        )
        .route(
            "/notifications/websocket",
            get(handlers::notify::ws_notifications),
        )
        .route("/did/jwt/:uasid", get(handlers::did::get_jwt))
        .route("/did/config/:uasid", get(handlers::did::get_config))
        .route("/gui/dashboard", get(handlers::dashboard::dashboard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
