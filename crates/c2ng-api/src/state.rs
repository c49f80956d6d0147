//! Shared application state handed to every handler.

use std::sync::Arc;

use c2ng_core::config::Config;
use c2ng_core::credentials::CredentialIssuer;
use c2ng_core::did::DidProvider;
use c2ng_core::manager::SessionManager;
use c2ng_core::notify::SubscriberRegistry;
use c2ng_core::session::SessionStore;
use c2ng_core::slice::SliceProvider;
use c2ng_core::stats::StatsManager;
use c2ng_core::telemetry::SignalStore;
use c2ng_core::ticket::TicketKeeper;
use c2ng_core::uss::UssProvider;

use crate::auth::Authenticator;

pub struct AppState {
    pub config: Config,
    pub authenticator: Authenticator,
    pub manager: SessionManager,
    pub stats: StatsManager,
    pub store: Arc<dyn SessionStore>,
    pub signals: Arc<dyn SignalStore>,
    pub tickets: TicketKeeper,
    pub registry: Arc<SubscriberRegistry>,
    pub did: DidProvider,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        authenticator: Authenticator,
        store: Arc<dyn SessionStore>,
        signals: Arc<dyn SignalStore>,
        uss: Arc<dyn UssProvider>,
        slice: Arc<dyn SliceProvider>,
        issuer: Arc<CredentialIssuer>,
        tickets: TicketKeeper,
    ) -> Arc<Self> {
        let registry = Arc::new(SubscriberRegistry::new());

        let manager = SessionManager::new(
            Arc::clone(&store),
            uss,
            slice,
            issuer,
            Arc::clone(&registry),
        );
        let stats = StatsManager::new(Arc::clone(&store), Arc::clone(&signals));
        let did = DidProvider::new(config.did.clone());

        Arc::new(Self {
            config,
            authenticator,
            manager,
            stats,
            store,
            signals,
            tickets,
            registry,
            did,
        })
    }
}
