//! Client credential issuance.
//!
//! Every session open mints a fresh RSA-2048 key pair and a short-lived
//! X.509 certificate signed by the service root. The private key never
//! leaves the process in plaintext: it is serialized as an encrypted PKCS#8
//! PEM under the UAS client secret, the same passphrase the client uses to
//! decrypt it.

use rcgen::{
    CertificateParams, DistinguishedName, DnType, KeyPair, SerialNumber, PKCS_RSA_SHA256,
};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::error::CredentialsError;
use crate::secrets;

const KEY_BITS: usize = 2048;

/// Credentials returned to the requesting client. The server persists only
/// the certificate; the encrypted key is handed out exactly once.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    /// Fresh identifier binding the certificate to this issuance.
    pub kid: String,
    /// X.509 client certificate, PEM.
    pub certificate_pem: String,
    /// PKCS#8 private key encrypted with the UAS client secret, PEM.
    pub encrypted_private_key_pem: String,
}

/// Issues client certificates signed by the service root.
pub struct CredentialIssuer {
    root_cert: rcgen::Certificate,
    root_key: KeyPair,
    client_secret: String,
    default_ttl: u64,
}

impl CredentialIssuer {
    /// Load the root material from the configured PEM files. The root
    /// private key is itself passphrase-protected; the passphrase comes
    /// from `C2NG_UAS_CLIENT_SECRET`.
    pub fn from_config(security: &SecurityConfig) -> Result<Self, CredentialsError> {
        let client_secret = secrets::require(secrets::UAS_CLIENT_SECRET)?;

        let cert_pem = std::fs::read_to_string(&security.certificate)
            .map_err(|e| CredentialsError::RootMaterial(e.to_string()))?;
        let key_pem = std::fs::read_to_string(&security.private)
            .map_err(|e| CredentialsError::RootMaterial(e.to_string()))?;

        let root_key = RsaPrivateKey::from_pkcs8_encrypted_pem(&key_pem, client_secret.as_bytes())
            .map_err(|e| CredentialsError::RootMaterial(e.to_string()))?;

        let issuer = Self::from_parts(&cert_pem, &root_key, client_secret, security.default_ttl)?;
        tracing::info!("Root credentials loaded from {:?}", security.certificate);
        Ok(issuer)
    }

    /// Build an issuer from in-memory root material.
    pub fn from_parts(
        root_cert_pem: &str,
        root_key: &RsaPrivateKey,
        client_secret: String,
        default_ttl: u64,
    ) -> Result<Self, CredentialsError> {
        let root_key = rcgen_key(root_key)?;

        let params = CertificateParams::from_ca_cert_pem(root_cert_pem)
            .map_err(|e| CredentialsError::RootMaterial(e.to_string()))?;
        let root_cert = params
            .self_signed(&root_key)
            .map_err(|e| CredentialsError::RootMaterial(e.to_string()))?;

        Ok(Self {
            root_cert,
            root_key,
            client_secret,
            default_ttl,
        })
    }

    /// Mint credentials for `client_id` (`{UasID}::UA` or `{UasID}::ADX`).
    pub fn issue(&self, client_id: &str) -> Result<ClientCredentials, CredentialsError> {
        let kid = Uuid::new_v4().to_string();
        tracing::debug!(client_id, kid, "Issuing client credentials");

        let mut rng = rand::thread_rng();
        let client_key = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| CredentialsError::KeyGeneration(e.to_string()))?;
        let key_pair = rcgen_key(&client_key)?;

        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, format!("{client_id}.c2ng"));
        params.distinguished_name = dn;
        params.serial_number = Some(SerialNumber::from_slice(&rand::random::<[u8; 16]>()));

        let now = time::OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + time::Duration::seconds(self.default_ttl as i64);

        let certificate = params
            .signed_by(&key_pair, &self.root_cert, &self.root_key)
            .map_err(|e| CredentialsError::Issuance(e.to_string()))?;

        let encrypted_key = client_key
            .to_pkcs8_encrypted_pem(&mut rng, self.client_secret.as_bytes(), LineEnding::LF)
            .map_err(|e| CredentialsError::Issuance(e.to_string()))?;

        Ok(ClientCredentials {
            kid,
            certificate_pem: certificate.pem(),
            encrypted_private_key_pem: encrypted_key.to_string(),
        })
    }
}

fn rcgen_key(key: &RsaPrivateKey) -> Result<KeyPair, CredentialsError> {
    let pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CredentialsError::KeyGeneration(e.to_string()))?;
    KeyPair::from_pem_and_sign_algo(&pem, &PKCS_RSA_SHA256)
        .map_err(|e| CredentialsError::KeyGeneration(e.to_string()))
}

/// Generate self-signed root material (used by provisioning and tests).
pub fn generate_root(common_name: &str) -> Result<(String, RsaPrivateKey), CredentialsError> {
    let mut rng = rand::thread_rng();
    let root_key = RsaPrivateKey::new(&mut rng, KEY_BITS)
        .map_err(|e| CredentialsError::KeyGeneration(e.to_string()))?;
    let key_pair = rcgen_key(&root_key)?;

    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name.to_string());
    params.distinguished_name = dn;
    params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);

    let now = time::OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + time::Duration::days(3650);

    let certificate = params
        .self_signed(&key_pair)
        .map_err(|e| CredentialsError::Issuance(e.to_string()))?;

    Ok((certificate.pem(), root_key))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::OnceLock;

    static ROOT: OnceLock<(String, RsaPrivateKey)> = OnceLock::new();

    /// Shared root material; RSA generation is expensive enough to amortize
    /// across the test suite.
    pub(crate) fn root() -> &'static (String, RsaPrivateKey) {
        ROOT.get_or_init(|| generate_root("root.c2ng").unwrap())
    }
}
