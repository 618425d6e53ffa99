//! Reservation repository interface
//!
//! The store is the only durable shared mutable resource. `admit` is the
//! serialization point: conflict check and insert happen atomically with
//! respect to any other admission touching the same devices.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::Reservation;
use crate::domain::DomainResult;

/// Outcome of a cancel/release attempt on an existing reservation
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub reservation: Reservation,
    /// Whether the call actually transitioned the status. Idempotent
    /// no-ops (cancelling a cancelled reservation) report `false`.
    pub changed: bool,
}

/// Reservations activated and completed in one expiration sweep
#[derive(Debug, Default)]
pub struct ExpirationSweep {
    pub activated: Vec<Reservation>,
    pub completed: Vec<Reservation>,
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Admit a candidate reservation: acquire per-device exclusion, check
    /// for overlapping non-terminal reservations and insert, all inside one
    /// transaction. Fails with `DomainError::Conflict` naming the contended
    /// devices.
    async fn admit(&self, candidate: Reservation) -> DomainResult<Reservation>;

    /// Ownership-scoped lookup; a foreign-owned id reads as absent.
    async fn find_by_id_for_owner(
        &self,
        id: Uuid,
        owner: Uuid,
    ) -> DomainResult<Option<Reservation>>;

    /// All reservations for an owner, newest first.
    async fn list_for_owner(&self, owner: Uuid) -> DomainResult<Vec<Reservation>>;

    /// Cancel unless terminal (idempotent). `None` when absent/foreign.
    async fn cancel(&self, id: Uuid, owner: Uuid) -> DomainResult<Option<StatusChange>>;

    /// Early release; only ACTIVE transitions to COMPLETED.
    async fn release(&self, id: Uuid, owner: Uuid) -> DomainResult<Option<StatusChange>>;

    /// One transactional sweep: PENDING with `start <= now` become ACTIVE,
    /// ACTIVE with `end <= now` become COMPLETED.
    async fn run_expiration(&self, now: DateTime<Utc>) -> DomainResult<ExpirationSweep>;
}
