//! External concerns: database, device-registry client, event notifier

pub mod database;
pub mod notifier;
pub mod registry;

pub use database::{init_database, DatabaseConfig};
pub use notifier::{KafkaEventNotifier, NoopEventNotifier};
pub use registry::{HttpDeviceRegistry, RegistryConfig};
