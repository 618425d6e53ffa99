//! In-memory fakes for the repository, registry and notifier ports,
//! shared by the application test modules.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::conflicts::conflicting_devices;
use super::events::{EventNotifier, ReservationCreated};
use crate::domain::{
    DeviceDescriptor, DeviceRegistry, DeviceStatus, DomainError, DomainResult, ExpirationSweep,
    RegistryError, Reservation, ReservationRepository, ReservationStatus, StatusChange,
    TopologyType,
};

/// Vec-backed store. The mutex serializes check-and-insert the same way the
/// real engine's transaction-scoped locks do.
#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<Vec<Reservation>>,
}

impl InMemoryStore {
    pub fn with_rows(rows: Vec<Reservation>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    pub fn snapshot(&self) -> Vec<Reservation> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReservationRepository for InMemoryStore {
    async fn admit(&self, candidate: Reservation) -> DomainResult<Reservation> {
        let mut rows = self.rows.lock().unwrap();
        let contended =
            conflicting_devices(&candidate.device_ids, &candidate.window, &rows, None);
        if !contended.is_empty() {
            return Err(DomainError::Conflict {
                device_ids: contended.into_iter().collect(),
            });
        }
        rows.push(candidate.clone());
        Ok(candidate)
    }

    async fn find_by_id_for_owner(
        &self,
        id: Uuid,
        owner: Uuid,
    ) -> DomainResult<Option<Reservation>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|r| r.id == id && r.user_id == owner)
            .cloned())
    }

    async fn list_for_owner(&self, owner: Uuid) -> DomainResult<Vec<Reservation>> {
        let rows = self.rows.lock().unwrap();
        let mut out: Vec<Reservation> =
            rows.iter().filter(|r| r.user_id == owner).cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn cancel(&self, id: Uuid, owner: Uuid) -> DomainResult<Option<StatusChange>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| r.id == id && r.user_id == owner) else {
            return Ok(None);
        };
        let changed = row.cancel();
        Ok(Some(StatusChange {
            reservation: row.clone(),
            changed,
        }))
    }

    async fn release(&self, id: Uuid, owner: Uuid) -> DomainResult<Option<StatusChange>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| r.id == id && r.user_id == owner) else {
            return Ok(None);
        };
        let changed = row.release();
        Ok(Some(StatusChange {
            reservation: row.clone(),
            changed,
        }))
    }

    async fn run_expiration(&self, now: DateTime<Utc>) -> DomainResult<ExpirationSweep> {
        let mut rows = self.rows.lock().unwrap();
        let mut sweep = ExpirationSweep::default();
        for row in rows.iter_mut() {
            if row.status == ReservationStatus::Pending && row.window.start <= now {
                row.activate();
                sweep.activated.push(row.clone());
            } else if row.status == ReservationStatus::Active && row.window.end <= now {
                row.complete();
                sweep.completed.push(row.clone());
            }
        }
        Ok(sweep)
    }
}

/// Scripted registry: a fixed device catalog, optionally down.
#[derive(Default)]
pub struct FakeRegistry {
    devices: HashMap<Uuid, DeviceDescriptor>,
    outage: bool,
    pub pushes: Mutex<Vec<(Vec<Uuid>, DeviceStatus)>>,
}

impl FakeRegistry {
    pub fn with_devices(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices: devices.into_iter().map(|d| (d.id, d)).collect(),
            ..Default::default()
        }
    }

    pub fn down() -> Self {
        Self {
            outage: true,
            ..Default::default()
        }
    }

    pub fn pushed(&self) -> Vec<(Vec<Uuid>, DeviceStatus)> {
        self.pushes.lock().unwrap().clone()
    }
}

pub fn descriptor(id: Uuid, topology: TopologyType, status: DeviceStatus) -> DeviceDescriptor {
    DeviceDescriptor {
        id,
        name: format!("device-{}", &id.to_string()[..8]),
        device_type: Some("FIREWALL".to_string()),
        topology_type: topology,
        status,
    }
}

#[async_trait]
impl DeviceRegistry for FakeRegistry {
    async fn fetch_devices(
        &self,
        ids: &[Uuid],
        _bearer: &str,
    ) -> Result<Vec<DeviceDescriptor>, RegistryError> {
        if self.outage {
            return Err(RegistryError::Unavailable("connection refused".into()));
        }
        ids.iter()
            .map(|id| {
                self.devices
                    .get(id)
                    .cloned()
                    .ok_or(RegistryError::DeviceNotFound(*id))
            })
            .collect()
    }

    async fn push_status(&self, ids: &[Uuid], status: DeviceStatus) {
        self.pushes.lock().unwrap().push((ids.to_vec(), status));
    }
}

/// Captures published events.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ReservationCreated>>,
}

impl RecordingNotifier {
    pub fn published(&self) -> Vec<ReservationCreated> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventNotifier for RecordingNotifier {
    async fn publish_created(&self, event: &ReservationCreated) {
        self.events.lock().unwrap().push(event.clone());
    }
}
