//! Core business entities, value types and ports

pub mod device;
pub mod error;
pub mod reservation;

pub use device::{DeviceDescriptor, DeviceRegistry, DeviceStatus, RegistryError, TopologyType};
pub use error::{DomainError, DomainResult};
pub use reservation::{
    ExpirationSweep, Reservation, ReservationRepository, ReservationStatus, StatusChange,
    TimeWindow,
};
