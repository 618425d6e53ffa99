//! # HERD Reservation Service
//!
//! Admission control and lifecycle management for lab device reservations.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Core business entities, types and traits
//! - **application**: Admission control, conflict detection, expiration
//! - **infrastructure**: External concerns (database, device registry, event bus)
//! - **interfaces**: REST API with Swagger documentation
//! - **auth**: JWT bearer-token verification
//! - **shared**: Graceful shutdown primitives

pub mod application;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod shared;

pub use config::AppConfig;

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig};

// Re-export API router
pub use interfaces::http::create_api_router;
