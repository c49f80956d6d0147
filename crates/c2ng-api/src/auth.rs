//! Bearer authentication against the identity provider.
//!
//! Signing keys are fetched once from the IdP JWKS endpoint during boot,
//! retrying with the configured back-off until the IdP answers; afterwards
//! the key set is read-only. Tokens arrive in the header literally named
//! `Authentication` (a long-standing wire quirk shared by every client of
//! this API) and are verified as RS256 with the audience check disabled.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use c2ng_core::config::KeycloakConfig;

use crate::error::ApiFailure;
use crate::state::AppState;

/// Header carrying the bearer token.
pub const AUTH_HEADER: &str = "Authentication";

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

/// Claims exposed to handlers after verification.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthClaims {
    pub preferred_username: Option<String>,
    pub exp: i64,
}

/// Verifies bearer tokens against the IdP-published signing key.
pub struct Authenticator {
    key: DecodingKey,
}

impl Authenticator {
    pub fn new(key: DecodingKey) -> Self {
        Self { key }
    }

    /// Fetch the IdP JWKS, retrying forever with the configured back-off.
    pub async fn fetch(config: &KeycloakConfig) -> Self {
        let url = config.certs_url();
        let client = reqwest::Client::new();

        loop {
            tracing::info!(url, "Fetching IdP public keys");

            match Self::try_fetch(&client, &url).await {
                Ok(authenticator) => return authenticator,
                Err(cause) => {
                    tracing::warn!(cause, "Unable to fetch IdP keys, re-trying");
                    tokio::time::sleep(std::time::Duration::from_secs(config.retry_timeout)).await;
                }
            }
        }
    }

    async fn try_fetch(client: &reqwest::Client, url: &str) -> Result<Self, String> {
        let jwks: Jwks = client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;

        Self::from_jwks(jwks)
    }

    fn from_jwks(jwks: Jwks) -> Result<Self, String> {
        let signing = jwks
            .keys
            .iter()
            .find(|key| key.key_use.as_deref() == Some("sig"))
            .ok_or_else(|| "no signature key in JWKS".to_string())?;

        let (n, e) = match (&signing.n, &signing.e) {
            (Some(n), Some(e)) => (n, e),
            _ => return Err("signature key has no RSA components".to_string()),
        };

        let key = DecodingKey::from_rsa_components(n, e).map_err(|e| e.to_string())?;
        Ok(Self::new(key))
    }

    /// Verify the value of the `Authentication` header.
    pub fn authenticate(&self, header: Option<&str>) -> Result<AuthClaims, ApiFailure> {
        let header = header.unwrap_or_default();
        let mut parts = header.split_whitespace();
        let (_scheme, bearer) = match (parts.next(), parts.next()) {
            (Some(scheme), Some(bearer)) => (scheme, bearer),
            _ => {
                tracing::warn!("Authentication failed: malformed bearer header");
                return Err(ApiFailure::access_denied());
            }
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;

        let token = decode::<AuthClaims>(bearer, &self.key, &validation).map_err(|e| {
            tracing::warn!("Authentication failed: {e}");
            ApiFailure::access_denied()
        })?;

        tracing::debug!(
            user = token.claims.preferred_username.as_deref().unwrap_or("<unnamed>"),
            "User authorized"
        );
        Ok(token.claims)
    }
}

/// Extractor for handlers that require an authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: AuthClaims,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiFailure;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTH_HEADER)
            .and_then(|value| value.to_str().ok());

        let claims = state.authenticator.authenticate(header)?;
        Ok(AuthUser { claims })
    }
}
