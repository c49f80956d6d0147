//! Session manager: the state transducer behind `POST /session`.
//!
//! An open walks USSP approval (aerial only), slice allocation, credential
//! issuance and persistence, in that order; the peer is notified only after
//! the persist returns, so a reader woken by a notification always sees the
//! new state. Reopening replaces the endpoint record and rotates the
//! credential; notifications fire on every call.

use std::sync::Arc;

use crate::credentials::CredentialIssuer;
use crate::error::{CredentialsError, SessionError};
use crate::notify::{Event, NotificationSender, SubscriberRegistry};
use crate::session::{Endpoint, Segment, Session, SessionStore};
use crate::slice::SliceProvider;
use crate::uss::UssProvider;

/// Parsed body of a session-open request.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub uasid: String,
    pub imsi: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Everything a freshly opened endpoint needs to start talking to its peer.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub ip: String,
    pub gateway_ip: String,
    pub kid: String,
    pub encrypted_private_key: String,
}

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    uss: Arc<dyn UssProvider>,
    slice: Arc<dyn SliceProvider>,
    issuer: Arc<CredentialIssuer>,
    registry: Arc<SubscriberRegistry>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        uss: Arc<dyn UssProvider>,
        slice: Arc<dyn SliceProvider>,
        issuer: Arc<CredentialIssuer>,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        Self {
            store,
            uss,
            slice,
            issuer,
            registry,
        }
    }

    /// Open (or reopen) the aerial side of a session.
    pub async fn open_ua_session(
        &self,
        request: &SessionRequest,
    ) -> Result<SessionGrant, SessionError> {
        let uasid = &request.uasid;
        let imsi = request.imsi.as_deref().ok_or(SessionError::ImsiRequired)?;

        let approved = self
            .uss
            .request(uasid)
            .await
            .map_err(|e| SessionError::UssUnavailable(e.to_string()))?;
        tracing::info!(uasid, approved, "USSP approval");

        if !approved {
            return Err(SessionError::FlightNotApproved);
        }

        let net = self.slice.get_ue_network_creds(imsi).await?;
        self.open_endpoint(uasid, Segment::Ua, net).await
    }

    /// Open (or reopen) the ground side of a session. No IMSI and no USSP
    /// approval are involved.
    pub async fn open_adx_session(
        &self,
        request: &SessionRequest,
    ) -> Result<SessionGrant, SessionError> {
        let uasid = &request.uasid;
        let net = self.slice.get_adx_network_creds(uasid).await?;
        self.open_endpoint(uasid, Segment::Adx, net).await
    }

    async fn open_endpoint(
        &self,
        uasid: &str,
        segment: Segment,
        net: crate::slice::NetworkCreds,
    ) -> Result<SessionGrant, SessionError> {
        let mut session = match self.store.get(uasid).await? {
            Some(session) => {
                tracing::info!(uasid, "Session exists");
                session
            }
            None => {
                tracing::info!(uasid, "Initializing new session");
                Session::new(uasid)
            }
        };

        tracing::info!(uasid, segment = %segment, "Generating credentials");
        let client_id = format!("{uasid}::{}", segment.designator());
        let issuer = Arc::clone(&self.issuer);
        let creds = tokio::task::spawn_blocking(move || issuer.issue(&client_id))
            .await
            .map_err(|e| {
                SessionError::Credentials(CredentialsError::Issuance(e.to_string()))
            })??;

        session.set_endpoint(
            segment,
            Endpoint {
                ip: net.ip.clone(),
                gateway_ip: net.gateway.clone(),
                kid: creds.kid.clone(),
                certificate: creds.certificate_pem.clone(),
            },
        );

        self.store.put(session).await?;

        let peer = segment.peer().as_str();
        self.registry.notify(uasid, peer, Event::PeerAddressChanged);
        self.registry
            .notify(uasid, peer, Event::PeerCredentialsChanged);

        Ok(SessionGrant {
            ip: net.ip,
            gateway_ip: net.gateway,
            kid: creds.kid,
            encrypted_private_key: creds.encrypted_private_key_pem,
        })
    }

    /// Register a notification channel for the pair (last subscribe wins).
    pub fn subscribe(&self, uasid: &str, segment: Segment, sender: NotificationSender) {
        self.registry.subscribe(uasid, segment.as_str(), sender);
    }

    /// Drop the pair's subscription, if any.
    pub fn unsubscribe(&self, uasid: &str, segment: Segment) {
        self.registry.unsubscribe(uasid, segment.as_str());
    }
}
