//! Reservation aggregate: entity, status machine and repository port

pub mod model;
pub mod repository;

pub use model::{Reservation, ReservationStatus, TimeWindow};
pub use repository::{ExpirationSweep, ReservationRepository, StatusChange};
