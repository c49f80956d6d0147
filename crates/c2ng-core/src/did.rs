//! Pre-provisioned decentralized-identity artifacts.
//!
//! The service does not verify credentials itself; it only hands out the
//! JWT-encoded verifiable credential provisioned for a resource and the
//! matching verifier configuration.

use serde_json::{json, Value};
use thiserror::Error;

use crate::config::DidConfig;

#[derive(Debug, Error)]
pub enum DidError {
    #[error("unknown DID resource: {0}")]
    UnknownResource(String),
    #[error("unable to read DID material: {0}")]
    Material(String),
}

pub struct DidProvider {
    config: DidConfig,
}

impl DidProvider {
    pub fn new(config: DidConfig) -> Self {
        Self { config }
    }

    /// The pre-provisioned JWT for a resource.
    pub fn issue_jwt(&self, resource_id: &str) -> Result<String, DidError> {
        let resource = self
            .config
            .resources
            .get(resource_id)
            .ok_or_else(|| DidError::UnknownResource(resource_id.to_string()))?;

        let jwt = std::fs::read_to_string(&resource.jwt)
            .map_err(|e| DidError::Material(e.to_string()))?;
        Ok(jwt.trim().to_string())
    }

    /// Verifier configuration granting CONTROL over the resource to holders
    /// of credentials from the configured issuer.
    pub fn verifier_config(&self, resource_id: &str) -> Result<Value, DidError> {
        if !self.config.resources.contains_key(resource_id) {
            return Err(DidError::UnknownResource(resource_id.to_string()));
        }

        let issuer_did = std::fs::read_to_string(&self.config.issuer_did)
            .map_err(|e| DidError::Material(e.to_string()))?;
        let issuer_did = issuer_did.trim();

        Ok(json!({
            "resources": {
                "sim-drone-id": {
                    "authorization": {
                        "type": "jwt-vc",
                        "trusted_issuers": {
                            issuer_did: {
                                "issuer_key": issuer_did,
                                "issuer_key_type": "did"
                            }
                        },
                        "filters": [
                            [
                                format!("$.vc.credentialSubject.capabilities.'{resource_id}'[*]"),
                                "CONTROL"
                            ]
                        ]
                    }
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DidResourceConfig;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("c2ng-did-test-{name}-{}", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn issues_provisioned_jwt_and_config() {
        let jwt_path = write_temp("jwt", "eyJ.header.payload\n");
        let did_path = write_temp("did", "did:web:c2ng.example\n");

        let mut resources = HashMap::new();
        resources.insert(
            "sim-drone-id".to_string(),
            DidResourceConfig {
                jwt: jwt_path.clone(),
            },
        );

        let provider = DidProvider::new(DidConfig {
            issuer_did: did_path.clone(),
            resources,
        });

        assert_eq!(provider.issue_jwt("sim-drone-id").unwrap(), "eyJ.header.payload");
        assert!(provider.issue_jwt("unknown").is_err());

        let config = provider.verifier_config("sim-drone-id").unwrap();
        let auth = &config["resources"]["sim-drone-id"]["authorization"];
        assert_eq!(auth["type"], "jwt-vc");
        assert!(auth["trusted_issuers"]["did:web:c2ng.example"].is_object());

        std::fs::remove_file(jwt_path).ok();
        std::fs::remove_file(did_path).ok();
    }
}
