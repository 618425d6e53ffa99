//! Lifecycle events published to downstream services
//!
//! At-most-once, best-effort: a publish failure is logged and absorbed,
//! never joined back into the caller's result.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Reservation, TopologyType};

/// Payload for `reservation.created`. Field names are stable; consumers
/// must tolerate additional fields.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationCreated {
    pub event: &'static str,
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub device_ids: Vec<Uuid>,
    pub topology_type: TopologyType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ReservationCreated {
    pub fn from_reservation(r: &Reservation) -> Self {
        Self {
            event: "reservation.created",
            reservation_id: r.id,
            user_id: r.user_id,
            device_ids: r.device_ids.clone(),
            topology_type: r.topology_type,
            start_time: r.window.start,
            end_time: r.window.end,
        }
    }
}

/// Outbound port to the message bus.
#[async_trait]
pub trait EventNotifier: Send + Sync {
    /// Fire-and-forget publish; implementations log failures internally.
    async fn publish_created(&self, event: &ReservationCreated);
}
