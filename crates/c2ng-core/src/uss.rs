//! USSP approval client.
//!
//! Before an aerial session opens, the external UAS Service Supplier is
//! asked whether the aircraft is approved to fly. The call is authenticated
//! with a client-credentials token from the identity provider, fetched per
//! request.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::UssConfig;
use crate::secrets;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const TOKEN_TIMEOUT: Duration = Duration::from_secs(2);

/// Any transport, authentication or decoding failure collapses into this
/// error; the caller maps it to the provider-unavailable taxonomy code.
#[derive(Debug, Error)]
#[error("USSP request failed: {0}")]
pub struct UssError(pub String);

#[async_trait]
pub trait UssProvider: Send + Sync {
    /// Ask whether the given UAS is approved to fly.
    async fn request(&self, uasid: &str) -> Result<bool, UssError>;
}

/// HTTP binding to the USSP approval endpoint.
pub struct HttpUss {
    config: UssConfig,
    client: reqwest::Client,
    token_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ApprovalResponse {
    #[serde(rename = "Approved")]
    approved: bool,
}

impl HttpUss {
    pub fn new(config: UssConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            token_client: reqwest::Client::builder()
                .timeout(TOKEN_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn service_token(&self) -> Result<String, UssError> {
        let keycloak = &self.config.oauth.keycloak;
        let client_id = keycloak
            .auth_client_id
            .as_deref()
            .ok_or_else(|| UssError("auth-client-id is not configured".to_string()))?;
        let client_secret = secrets::require(secrets::USS_CLIENT_SECRET)
            .map_err(|e| UssError(e.to_string()))?;

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", &client_secret),
        ];

        let response = self
            .token_client
            .post(keycloak.token_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| UssError(e.to_string()))?
            .error_for_status()
            .map_err(|e| UssError(e.to_string()))?;

        let token: TokenResponse = response.json().await.map_err(|e| UssError(e.to_string()))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl UssProvider for HttpUss {
    async fn request(&self, uasid: &str) -> Result<bool, UssError> {
        let access_token = self.service_token().await?;
        let url = format!("{}/approve?UasID={}", self.config.endpoint, uasid);
        tracing::debug!(url, "Requesting USSP approval");

        let response = self
            .client
            .get(&url)
            .header("Authentication", format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(|e| UssError(e.to_string()))?
            .error_for_status()
            .map_err(|e| UssError(e.to_string()))?;

        let approval: ApprovalResponse =
            response.json().await.map_err(|e| UssError(e.to_string()))?;
        tracing::info!(uasid, approved = approval.approved, "USSP approval received");
        Ok(approval.approved)
    }
}
