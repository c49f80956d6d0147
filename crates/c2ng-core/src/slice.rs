//! Network slice providers.
//!
//! A provider allocates addressing inside the cellular core: an IP and a
//! gateway for a UE (looked up by IMSI) or for an ADX client (looked up by
//! UAS identifier).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ExternalSliceConfig, SimulatedSliceConfig, SlicemanConfig};
use crate::error::SliceError;

/// Addressing allocated for one endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkCreds {
    #[serde(rename = "IP")]
    pub ip: String,
    #[serde(rename = "Gateway")]
    pub gateway: String,
}

#[async_trait]
pub trait SliceProvider: Send + Sync {
    /// Pre-start activities of the provider, if any.
    async fn establish(&self) -> Result<(), SliceError>;

    /// Allocate network credentials for a UE.
    async fn get_ue_network_creds(&self, imsi: &str) -> Result<NetworkCreds, SliceError>;

    /// Allocate network credentials for an ADX client.
    async fn get_adx_network_creds(&self, uid: &str) -> Result<NetworkCreds, SliceError>;
}

#[derive(Debug, Error)]
#[error("invalid slice provider type: {0}")]
pub struct UnknownProvider(String);

/// Select a provider from the `sliceman` configuration section. An unknown
/// provider name fails startup.
pub fn select_provider(config: &SlicemanConfig) -> Result<Arc<dyn SliceProvider>, UnknownProvider> {
    match config.provider.as_str() {
        "simulated" => {
            let simulated = config
                .simulated
                .clone()
                .ok_or_else(|| UnknownProvider("simulated section missing".to_string()))?;
            Ok(Arc::new(SimulatedSlice::new(simulated)))
        }
        "external" => {
            let external = config.external.clone().unwrap_or(ExternalSliceConfig {
                endpoint: None,
            });
            Ok(Arc::new(ExternalSlice::new(external)))
        }
        other => Err(UnknownProvider(other.to_string())),
    }
}

/// Simulated slice control: hands out the fixed addresses from the
/// configuration and performs no provisioning.
pub struct SimulatedSlice {
    config: SimulatedSliceConfig,
}

impl SimulatedSlice {
    pub fn new(config: SimulatedSliceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SliceProvider for SimulatedSlice {
    async fn establish(&self) -> Result<(), SliceError> {
        Ok(())
    }

    async fn get_ue_network_creds(&self, _imsi: &str) -> Result<NetworkCreds, SliceError> {
        Ok(NetworkCreds {
            ip: self.config.ue.clone(),
            gateway: self.config.gateway.clone(),
        })
    }

    async fn get_adx_network_creds(&self, _uid: &str) -> Result<NetworkCreds, SliceError> {
        Ok(NetworkCreds {
            ip: self.config.adx.clone(),
            gateway: self.config.gateway.clone(),
        })
    }
}

/// Vendor slice controller binding. The allocation calls are not wired to a
/// live deployment yet.
pub struct ExternalSlice {
    #[allow(dead_code)]
    config: ExternalSliceConfig,
}

impl ExternalSlice {
    pub fn new(config: ExternalSliceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SliceProvider for ExternalSlice {
    async fn establish(&self) -> Result<(), SliceError> {
        Ok(())
    }

    async fn get_ue_network_creds(&self, _imsi: &str) -> Result<NetworkCreds, SliceError> {
        Err(SliceError::Unsupported)
    }

    async fn get_adx_network_creds(&self, _uid: &str) -> Result<NetworkCreds, SliceError> {
        Err(SliceError::Unsupported)
    }
}
