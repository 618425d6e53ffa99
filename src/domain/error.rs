//! Domain error taxonomy
//!
//! Four caller-visible kinds plus a storage bucket:
//! - `Validation`: the request itself is wrong, never retried as-is
//! - `Conflict`: the window collides with an existing reservation
//! - `NotFound`: entity absent *or* owned by someone else (no existence leak)
//! - `DependencyUnavailable`: the device registry could not be reached
//! - `Storage`: database failure

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation: {0}")]
    Validation(String),

    #[error("Time conflict: devices {} already reserved in the requested window", format_ids(device_ids))]
    Conflict { device_ids: Vec<Uuid> },

    #[error("Not found: {entity} {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn reservation_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "Reservation",
            id,
        }
    }
}

fn format_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Storage(e.to_string())
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
