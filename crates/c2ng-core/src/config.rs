//! Service configuration loaded from a YAML file.
//!
//! The file location is taken from the `C2NG_CONFIG_FILE` environment
//! variable. Secrets are never part of the file; they come from the
//! environment (see [`crate::secrets`]).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default location used when `C2NG_CONFIG_FILE` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "/app/config/c2ng/config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
    pub mongo: MongoConfig,
    pub uss: UssConfig,
    pub sliceman: SlicemanConfig,
    pub security: SecurityConfig,
    pub influx: InfluxConfig,
    pub did: DidConfig,
    pub oauth: OauthConfig,
}

impl Config {
    /// Load the configuration from `C2NG_CONFIG_FILE` or the default path.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("C2NG_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub verbose: bool,
}

/// Connection settings for the external session document store.
#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UssConfig {
    /// Base URL of the USSP approval API.
    pub endpoint: String,
    pub oauth: OauthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OauthConfig {
    pub keycloak: KeycloakConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeycloakConfig {
    /// Base URL of the identity provider.
    pub base: String,
    pub realm: String,
    #[serde(rename = "auth-client-id", default)]
    pub auth_client_id: Option<String>,
    /// Seconds to wait between retries of startup-time fetches.
    #[serde(rename = "retry-timeout")]
    pub retry_timeout: u64,
}

impl KeycloakConfig {
    pub fn certs_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/certs",
            self.base, self.realm
        )
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.base, self.realm
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlicemanConfig {
    pub provider: String,
    pub simulated: Option<SimulatedSliceConfig>,
    pub external: Option<ExternalSliceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedSliceConfig {
    /// Fixed address handed to every UE.
    pub ue: String,
    /// Fixed address handed to every ADX client.
    pub adx: String,
    pub gateway: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalSliceConfig {
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Path to the root certificate PEM.
    pub certificate: PathBuf,
    /// Path to the passphrase-protected root private key PEM.
    pub private: PathBuf,
    /// Client certificate lifetime in seconds.
    #[serde(rename = "default-ttl")]
    pub default_ttl: u64,
}

/// Connection settings for the external telemetry time-series store.
#[derive(Debug, Clone, Deserialize)]
pub struct InfluxConfig {
    pub uri: String,
    pub org: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DidConfig {
    /// Path to a file holding the issuer DID.
    #[serde(rename = "issuer-did")]
    pub issuer_did: PathBuf,
    /// Per-resource verifiable credential files.
    pub resources: HashMap<String, DidResourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DidResourceConfig {
    /// Path to the pre-provisioned JWT for this resource.
    pub jwt: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
service:
  port: 9090
logging:
  verbose: true
mongo:
  uri: mongodb://mongo:27017
uss:
  endpoint: http://uss-sim:9091
  oauth:
    keycloak:
      base: http://oauth:8080
      realm: c2ng
      auth-client-id: c2ng-uss
      retry-timeout: 5
sliceman:
  provider: simulated
  simulated:
    ue: 10.0.0.2
    adx: 10.0.0.3
    gateway: 10.0.0.1
security:
  certificate: /c2ng/config/c2ng/root.crt
  private: /c2ng/config/c2ng/root.key
  default-ttl: 3600
influx:
  uri: http://influx:8086
  org: c2ng
  bucket: c2ng
did:
  issuer-did: /c2ng/config/c2ng/issuer.did
  resources:
    sim-drone-id:
      jwt: /c2ng/config/c2ng/sim-drone-id.jwt
oauth:
  keycloak:
    base: http://oauth:8080
    realm: c2ng
    retry-timeout: 5
"#;

    #[test]
    fn parses_full_config() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.service.port, 9090);
        assert!(config.logging.verbose);
        assert_eq!(config.sliceman.provider, "simulated");
        assert_eq!(config.sliceman.simulated.as_ref().unwrap().ue, "10.0.0.2");
        assert_eq!(config.security.default_ttl, 3600);
        assert_eq!(
            config.uss.oauth.keycloak.auth_client_id.as_deref(),
            Some("c2ng-uss")
        );
        assert!(config.did.resources.contains_key("sim-drone-id"));
    }

    #[test]
    fn keycloak_urls() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        let kc = &config.oauth.keycloak;
        assert_eq!(
            kc.certs_url(),
            "http://oauth:8080/realms/c2ng/protocol/openid-connect/certs"
        );
        assert_eq!(
            kc.token_url(),
            "http://oauth:8080/realms/c2ng/protocol/openid-connect/token"
        );
    }
}
