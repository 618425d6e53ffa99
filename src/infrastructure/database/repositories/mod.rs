//! SeaORM repository implementations

pub mod reservation_repository;

pub use reservation_repository::SeaOrmReservationRepository;
