use std::sync::Arc;

use anyhow::Context;
use tracing::{info, Level};

use c2ng_api::auth::Authenticator;
use c2ng_api::{create_router, state::AppState};
use c2ng_core::config::Config;
use c2ng_core::credentials::CredentialIssuer;
use c2ng_core::session::MemorySessionStore;
use c2ng_core::slice::select_provider;
use c2ng_core::telemetry::MemorySignalStore;
use c2ng_core::ticket::TicketKeeper;
use c2ng_core::uss::HttpUss;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("loading configuration")?;

    let level = if config.logging.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("---------- Starting up ----------");

    // Pre-start: the IdP keys must be present before any request is served.
    let authenticator = Authenticator::fetch(&config.oauth.keycloak).await;

    info!(uri = config.mongo.uri, "Session document store configured");
    let store = Arc::new(MemorySessionStore::new());

    info!(uri = config.influx.uri, "Telemetry store configured");
    let signals = Arc::new(MemorySignalStore::new());

    let uss = Arc::new(HttpUss::new(config.uss.clone()));
    let slice = select_provider(&config.sliceman).context("selecting slice provider")?;
    slice.establish().await.context("slice provider pre-start")?;

    let issuer = Arc::new(CredentialIssuer::from_config(&config.security)?);
    let tickets = TicketKeeper::from_env()?;

    let port = config.service.port;
    let state = AppState::new(
        config,
        authenticator,
        store,
        signals,
        uss,
        slice,
        issuer,
        tickets,
    );

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(addr, "Listening for requests");
    axum::serve(listener, create_router(state)).await?;

    Ok(())
}
