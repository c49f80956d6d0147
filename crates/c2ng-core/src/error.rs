//! Domain error types shared across the backend components.

use thiserror::Error;

/// Failure of a session-open operation.
///
/// The first three variants are client-visible domain failures; the rest
/// surface as internal errors at the API boundary.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IMSI is required to open an aerial session")]
    ImsiRequired,

    #[error("USSP is unreachable: {0}")]
    UssUnavailable(String),

    #[error("flight is not approved by the USSP")]
    FlightNotApproved,

    #[error("slice provider failure: {0}")]
    Slice(#[from] SliceError),

    #[error("credential issuance failure: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("session store failure: {0}")]
    Store(#[from] StoreError),
}

/// Failure of the session or signal store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a network slice allocation.
#[derive(Debug, Error)]
pub enum SliceError {
    #[error("slice allocation is not supported by the configured provider")]
    Unsupported,

    #[error("slice provider request failed: {0}")]
    Provider(String),
}

/// Failure of client credential issuance.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("unable to load root credentials: {0}")]
    RootMaterial(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("certificate issuance failed: {0}")]
    Issuance(String),

    #[error(transparent)]
    MissingSecret(#[from] crate::secrets::MissingSecret),
}
