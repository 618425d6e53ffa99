//! HERD reservation service entry point
//!
//! Wires the admission controller, expiration scheduler and REST API
//! together from environment configuration and runs until SIGTERM/SIGINT.

use std::sync::Arc;

use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use herd_reservations::application::admission::AdmissionController;
use herd_reservations::application::events::EventNotifier;
use herd_reservations::application::expiration::ExpirationScheduler;
use herd_reservations::auth::JwtConfig;
use herd_reservations::domain::{DeviceRegistry, ReservationRepository};
use herd_reservations::infrastructure::database::migrator::Migrator;
use herd_reservations::infrastructure::database::repositories::SeaOrmReservationRepository;
use herd_reservations::infrastructure::{HttpDeviceRegistry, KafkaEventNotifier, NoopEventNotifier};
use herd_reservations::shared::shutdown::ShutdownCoordinator;
use herd_reservations::{create_api_router, init_database, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("Starting HERD reservation service...");

    // Prometheus recorder must be installed before any metrics calls
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))?;

    // ── Database ───────────────────────────────────────────────
    info!("Database: {}", config.database.url);
    let db = match init_database(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    Migrator::up(&db, None).await?;
    info!("Migrations completed");

    // ── Collaborators ──────────────────────────────────────────
    let store: Arc<dyn ReservationRepository> =
        Arc::new(SeaOrmReservationRepository::new(db.clone()));

    let registry: Arc<dyn DeviceRegistry> =
        Arc::new(HttpDeviceRegistry::new(config.registry.clone())?);
    info!("Device registry: {}", config.registry.base_url);

    let notifier: Arc<dyn EventNotifier> = if config.kafka_brokers.is_empty() {
        warn!("KAFKA_BROKERS not set; reservation events will not be published");
        Arc::new(NoopEventNotifier)
    } else {
        Arc::new(KafkaEventNotifier::new(&config.kafka_brokers)?)
    };

    let controller = Arc::new(AdmissionController::new(
        store.clone(),
        registry.clone(),
        notifier,
    ));

    // ── Shutdown handling ──────────────────────────────────────
    let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout_secs);
    let shutdown_signal = shutdown.signal();
    shutdown.start_signal_listener();

    // ── Expiration scheduler ───────────────────────────────────
    let scheduler = Arc::new(
        ExpirationScheduler::new(store, registry).with_config(config.expiration.clone()),
    );
    let scheduler_handle = scheduler.start(shutdown_signal.clone());

    // ── REST API ───────────────────────────────────────────────
    let jwt_config = JwtConfig::new(config.jwt_secret.clone());
    let api_router = create_api_router(
        controller,
        db.clone(),
        jwt_config,
        prometheus_handle,
        &config.cors_origins,
    );

    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("REST API server listening on http://{}", addr);
    info!("Swagger UI available at http://{}/docs/", addr);

    let api_shutdown = shutdown_signal.clone();
    axum::serve(listener, api_router)
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("REST API server received shutdown signal");
        })
        .await?;

    // ── Final cleanup, bounded by the configured grace period ──
    shutdown
        .shutdown_with_cleanup(|| async {
            if let Err(e) = scheduler_handle.await {
                warn!("Expiration scheduler task failed: {}", e);
            }
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("Database connection closed");
            }
        })
        .await;

    info!("HERD reservation service shutdown complete");
    Ok(())
}
