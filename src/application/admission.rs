//! Admission controller
//!
//! Orchestrates one reservation request end-to-end:
//! validate device existence against the registry, validate topology
//! homogeneity and current availability, then hand the candidate to the
//! store for the transactional conflict-check-and-insert. Registry status
//! pushes and the created event run after commit and are best-effort.

use std::collections::BTreeSet;
use std::sync::Arc;

use metrics::counter;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::events::{EventNotifier, ReservationCreated};
use crate::domain::{
    DeviceRegistry, DeviceStatus, DomainError, DomainResult, RegistryError, Reservation,
    ReservationRepository, TimeWindow,
};

/// A validated inbound reservation request
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub device_ids: Vec<Uuid>,
    pub window: TimeWindow,
    pub purpose: Option<String>,
}

pub struct AdmissionController {
    store: Arc<dyn ReservationRepository>,
    registry: Arc<dyn DeviceRegistry>,
    notifier: Arc<dyn EventNotifier>,
}

impl AdmissionController {
    pub fn new(
        store: Arc<dyn ReservationRepository>,
        registry: Arc<dyn DeviceRegistry>,
        notifier: Arc<dyn EventNotifier>,
    ) -> Self {
        Self {
            store,
            registry,
            notifier,
        }
    }

    /// Admit a reservation request for `owner`. The caller's bearer token is
    /// forwarded to the registry for the validation fetch.
    #[instrument(skip(self, request, bearer), fields(owner = %owner))]
    pub async fn create(
        &self,
        request: NewReservation,
        owner: Uuid,
        bearer: &str,
    ) -> DomainResult<Reservation> {
        if request.device_ids.is_empty() {
            return Err(DomainError::Validation(
                "At least one device must be specified".to_string(),
            ));
        }

        let devices = self
            .registry
            .fetch_devices(&request.device_ids, bearer)
            .await
            .map_err(|e| match e {
                RegistryError::DeviceNotFound(_) => DomainError::Validation(e.to_string()),
                RegistryError::Unavailable(msg) => DomainError::DependencyUnavailable(msg),
            })?;

        let classes: BTreeSet<&'static str> =
            devices.iter().map(|d| d.topology_type.as_str()).collect();
        if classes.len() > 1 {
            return Err(DomainError::Validation(format!(
                "All devices must share the same topology type. Found: {}",
                classes.into_iter().collect::<Vec<_>>().join(", ")
            )));
        }

        let unavailable: Vec<&str> = devices
            .iter()
            .filter(|d| d.status != DeviceStatus::Available)
            .map(|d| d.name.as_str())
            .collect();
        if !unavailable.is_empty() {
            return Err(DomainError::Validation(format!(
                "The following devices are not available: {}",
                unavailable.join(", ")
            )));
        }

        // Non-empty: one descriptor per requested id
        let topology_type = devices[0].topology_type;

        let candidate = Reservation::new(
            owner,
            request.device_ids,
            topology_type,
            request.window,
            request.purpose,
        )?;

        let admitted = match self.store.admit(candidate).await {
            Ok(r) => r,
            Err(e) => {
                if matches!(e, DomainError::Conflict { .. }) {
                    counter!("reservation_conflicts_total").increment(1);
                }
                return Err(e);
            }
        };

        counter!("reservations_created_total").increment(1);
        info!(
            reservation_id = %admitted.id,
            devices = admitted.device_ids.len(),
            topology = %admitted.topology_type,
            "Reservation admitted"
        );

        // Best-effort side effects; neither failure rolls back the reservation
        self.registry
            .push_status(&admitted.device_ids, DeviceStatus::Reserved)
            .await;
        self.notifier
            .publish_created(&ReservationCreated::from_reservation(&admitted))
            .await;

        Ok(admitted)
    }

    /// Cancel an owned reservation. Already-terminal reservations are
    /// returned unchanged. Non-owners read "not found".
    pub async fn cancel(&self, id: Uuid, owner: Uuid) -> DomainResult<Reservation> {
        let change = self
            .store
            .cancel(id, owner)
            .await?
            .ok_or_else(|| DomainError::reservation_not_found(id))?;

        if change.changed {
            info!(reservation_id = %id, "Reservation cancelled");
            self.registry
                .push_status(&change.reservation.device_ids, DeviceStatus::Available)
                .await;
        }
        Ok(change.reservation)
    }

    /// Early release: ACTIVE moves to COMPLETED, anything else is returned
    /// unchanged without error.
    pub async fn release(&self, id: Uuid, owner: Uuid) -> DomainResult<Reservation> {
        let change = self
            .store
            .release(id, owner)
            .await?
            .ok_or_else(|| DomainError::reservation_not_found(id))?;

        if change.changed {
            info!(reservation_id = %id, "Reservation released early");
            self.registry
                .push_status(&change.reservation.device_ids, DeviceStatus::Available)
                .await;
        } else {
            warn!(
                reservation_id = %id,
                status = %change.reservation.status,
                "Release requested for non-active reservation; no transition"
            );
        }
        Ok(change.reservation)
    }

    pub async fn get(&self, id: Uuid, owner: Uuid) -> DomainResult<Reservation> {
        self.store
            .find_by_id_for_owner(id, owner)
            .await?
            .ok_or_else(|| DomainError::reservation_not_found(id))
    }

    pub async fn list(&self, owner: Uuid) -> DomainResult<Vec<Reservation>> {
        self.store.list_for_owner(owner).await
    }
}

// ── Tests ──────────────────────────────────────────────────────
