//! HTTP client for the device registry (inventory service)
//!
//! Fetches run on the user's forwarded bearer token; status pushes run on
//! the internal service token and are best-effort. All calls carry a
//! bounded timeout so a dead registry cannot block admission indefinitely.

use async_trait::async_trait;
use futures_util::future::try_join_all;
use reqwest::StatusCode;
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::{DeviceDescriptor, DeviceRegistry, DeviceStatus, RegistryError};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Registry connection settings
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Inventory service base URL, no trailing slash
    pub base_url: String,
    /// Service-to-service credential for status pushes; empty disables them
    pub internal_token: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://inventory:8000".to_string(),
            internal_token: String::new(),
        }
    }
}

pub struct HttpDeviceRegistry {
    client: reqwest::Client,
    config: RegistryConfig,
}

impl HttpDeviceRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, config })
    }

    async fn fetch_one(&self, id: Uuid, bearer: &str) -> Result<DeviceDescriptor, RegistryError> {
        let url = format!("{}/devices/{}", self.config.base_url, id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RegistryError::DeviceNotFound(id));
        }
        if !response.status().is_success() {
            return Err(RegistryError::Unavailable(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }
        response
            .json::<DeviceDescriptor>()
            .await
            .map_err(|e| RegistryError::Unavailable(format!("invalid descriptor: {e}")))
    }
}

#[async_trait]
impl DeviceRegistry for HttpDeviceRegistry {
    async fn fetch_devices(
        &self,
        ids: &[Uuid],
        bearer: &str,
    ) -> Result<Vec<DeviceDescriptor>, RegistryError> {
        // one retrieval per id, concurrently; any failure fails the batch
        try_join_all(ids.iter().map(|id| self.fetch_one(*id, bearer))).await
    }

    async fn push_status(&self, ids: &[Uuid], status: DeviceStatus) {
        if self.config.internal_token.is_empty() {
            debug!("No internal token configured; skipping device status push");
            return;
        }

        for id in ids {
            let url = format!("{}/devices/{}/status", self.config.base_url, id);
            let result = self
                .client
                .post(&url)
                .header("X-Internal-Token", &self.config.internal_token)
                .json(&serde_json::json!({ "status": status.as_str() }))
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    error!(
                        device_id = %id,
                        status = %status,
                        http_status = %response.status(),
                        "Device status push rejected"
                    );
                }
                Err(e) => {
                    error!(
                        device_id = %id,
                        status = %status,
                        error = %e,
                        "Device status push failed"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_without_internal_token_is_a_noop() {
        let registry = HttpDeviceRegistry::new(RegistryConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            internal_token: String::new(),
        })
        .unwrap();
        // must not attempt the network at all
        registry
            .push_status(&[Uuid::new_v4()], DeviceStatus::Available)
            .await;
    }

    #[tokio::test]
    async fn unreachable_registry_maps_to_unavailable() {
        let registry = HttpDeviceRegistry::new(RegistryConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            internal_token: "secret".to_string(),
        })
        .unwrap();
        let err = registry
            .fetch_devices(&[Uuid::new_v4()], "token")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unavailable(_)));
    }
}
