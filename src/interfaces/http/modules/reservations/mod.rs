//! Reservation endpoints

pub mod dto;
pub mod handlers;

pub use dto::{CreateReservationRequest, ReservationDto};
pub use handlers::ReservationAppState;
