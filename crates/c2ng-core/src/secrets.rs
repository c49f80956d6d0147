//! Process secrets, supplied exclusively through the environment.

use thiserror::Error;

/// Passphrase protecting the root private key and every issued client key.
pub const UAS_CLIENT_SECRET: &str = "C2NG_UAS_CLIENT_SECRET";

/// Service-account secret for the USSP OAuth client.
pub const USS_CLIENT_SECRET: &str = "C2NG_USS_CLIENT_SECRET";

/// Symmetric key signing WebSocket tickets.
pub const WS_AUTH_SECRET: &str = "C2NG_WS_AUTH_SECRET";

#[derive(Debug, Error)]
#[error("{0} is not set")]
pub struct MissingSecret(pub &'static str);

/// Read a required secret from the environment.
pub fn require(name: &'static str) -> Result<String, MissingSecret> {
    std::env::var(name).map_err(|_| MissingSecret(name))
}
