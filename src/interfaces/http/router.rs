//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::admission::AdmissionController;
use crate::auth::{auth_middleware, AuthState, JwtConfig};
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::modules::health::{self, HealthState};
use crate::interfaces::http::modules::metrics::{
    http_metrics_middleware, prometheus_metrics, MetricsState,
};
use crate::interfaces::http::modules::reservations::{self, ReservationAppState};

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::handlers::health_check,
        reservations::handlers::create_reservation,
        reservations::handlers::list_reservations,
        reservations::handlers::get_reservation,
        reservations::handlers::cancel_reservation,
        reservations::handlers::release_reservation,
    ),
    components(
        schemas(
            ApiResponse<String>,
            reservations::CreateReservationRequest,
            reservations::ReservationDto,
            health::handlers::HealthResponse,
            health::handlers::ComponentHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health check endpoints"),
        (name = "Reservations", description = "Lab device reservation lifecycle: create, inspect, cancel, release"),
    ),
    info(
        title = "HERD Reservation Service API",
        version = "1.0.0",
        description = "Admission control and lifecycle management for lab device reservations",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

fn cors_layer(origins: &[String]) -> CorsLayer {
    // No configured origins (or a wildcard) means permissive CORS
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Create the API router with all routes
pub fn create_api_router(
    controller: Arc<AdmissionController>,
    db: DatabaseConnection,
    jwt_config: JwtConfig,
    metrics_handle: PrometheusHandle,
    cors_origins: &[String],
) -> Router {
    let auth_state = AuthState { jwt_config };

    let reservation_state = ReservationAppState { controller };

    // Every /api/v1/reservations route requires a valid bearer token
    let reservation_routes = Router::new()
        .route(
            "/",
            post(reservations::handlers::create_reservation)
                .get(reservations::handlers::list_reservations),
        )
        .route(
            "/{id}",
            get(reservations::handlers::get_reservation)
                .delete(reservations::handlers::cancel_reservation),
        )
        .route(
            "/{id}/release",
            put(reservations::handlers::release_reservation),
        )
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(reservation_state);

    let health_state = HealthState {
        db,
        started_at: Arc::new(Instant::now()),
    };
    let health_routes = Router::new()
        .route("/health", get(health::handlers::health_check))
        .with_state(health_state);

    let metrics_state = MetricsState {
        handle: metrics_handle,
    };
    let metrics_routes = Router::new()
        .route("/metrics", get(prometheus_metrics))
        .with_state(metrics_state);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        .merge(swagger_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .nest("/api/v1/reservations", reservation_routes)
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

// ── Tests ──────────────────────────────────────────────────────
