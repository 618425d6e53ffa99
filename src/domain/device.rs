//! Device registry boundary
//!
//! The inventory service owns device existence, type and availability.
//! This module defines the descriptor shape returned by the registry and the
//! outbound port the engine talks through. Descriptors are never cached
//! beyond a single request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Topology class of a device. A single reservation may not mix classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopologyType {
    Physical,
    Cloud,
}

impl TopologyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Physical => "PHYSICAL",
            Self::Cloud => "CLOUD",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "CLOUD" => Self::Cloud,
            _ => Self::Physical,
        }
    }
}

impl std::fmt::Display for TopologyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Availability status as tracked by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Available,
    Reserved,
    Offline,
    Maintenance,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Reserved => "RESERVED",
            Self::Offline => "OFFLINE",
            Self::Maintenance => "MAINTENANCE",
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Device descriptor as returned by `GET /devices/{id}`.
/// Unknown extra fields are tolerated and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceDescriptor {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub device_type: Option<String>,
    pub topology_type: TopologyType,
    pub status: DeviceStatus,
}

/// Errors from the validation-path fetch
#[derive(Debug, Error)]
pub enum RegistryError {
    /// One id in the batch does not exist; fails the whole batch.
    #[error("Device {0} not found in inventory")]
    DeviceNotFound(Uuid),

    /// Network failure, timeout or non-2xx; a dependency failure,
    /// not a client error.
    #[error("Inventory service unavailable: {0}")]
    Unavailable(String),
}

/// Outbound port to the device registry.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Fetch descriptors for every id, forwarding the caller's bearer token.
    /// Any unresolvable id fails the whole batch with `DeviceNotFound`.
    async fn fetch_devices(
        &self,
        ids: &[Uuid],
        bearer: &str,
    ) -> Result<Vec<DeviceDescriptor>, RegistryError>;

    /// Best-effort status push using the internal service credential.
    /// Attempts every id even if some fail; failures are logged, never
    /// returned.
    async fn push_status(&self, ids: &[Uuid], status: DeviceStatus);
}
