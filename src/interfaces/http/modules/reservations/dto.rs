//! Reservation DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::admission::NewReservation;
use crate::domain::{DomainError, Reservation, TimeWindow};

/// Request to create a new reservation
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservationRequest {
    /// Devices to reserve; all must share one topology type
    #[validate(length(min = 1, message = "at least one device is required"))]
    pub device_ids: Vec<Uuid>,
    /// Window start (ISO 8601)
    pub start_time: DateTime<Utc>,
    /// Window end (ISO 8601), exclusive
    pub end_time: DateTime<Utc>,
    /// Free-text purpose
    #[validate(length(max = 500, message = "purpose must be at most 500 characters"))]
    pub purpose: Option<String>,
}

impl CreateReservationRequest {
    /// Window validation (end after start) lives in the domain type.
    pub fn into_new_reservation(self) -> Result<NewReservation, DomainError> {
        let window = TimeWindow::new(self.start_time, self.end_time)?;
        Ok(NewReservation {
            device_ids: self.device_ids,
            window,
            purpose: self.purpose,
        })
    }
}

/// Reservation details in API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_ids: Vec<Uuid>,
    pub topology_type: String,
    pub purpose: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            device_ids: r.device_ids,
            topology_type: r.topology_type.as_str().to_string(),
            purpose: r.purpose,
            start_time: r.window.start,
            end_time: r.window.end,
            status: r.status.as_str().to_string(),
            created_at: r.created_at,
        }
    }
}
