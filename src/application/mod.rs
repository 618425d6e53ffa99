//! Business logic: admission control, conflict detection and the
//! expiration scheduler

pub mod admission;
pub mod conflicts;
pub mod events;
pub mod expiration;

#[cfg(test)]
pub mod testing;

pub use admission::{AdmissionController, NewReservation};
pub use events::{EventNotifier, ReservationCreated};
pub use expiration::{ExpirationConfig, ExpirationScheduler};
