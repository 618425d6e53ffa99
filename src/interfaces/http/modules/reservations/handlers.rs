//! Reservation HTTP handlers
//!
//! Thin layer over the admission controller: extract the authenticated
//! owner and raw bearer token from request extensions, convert DTOs, and
//! let `ApiError` map domain failures onto status codes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::application::admission::AdmissionController;
use crate::auth::{AuthenticatedUser, BearerToken};
use crate::interfaces::http::common::{ApiError, ApiResponse, ValidatedJson};

use super::dto::*;

/// Application state for reservation handlers.
#[derive(Clone)]
pub struct ReservationAppState {
    pub controller: Arc<AdmissionController>,
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation created", body = ApiResponse<ReservationDto>),
        (status = 422, description = "Invalid request: unknown device, mixed topology, device not available, or bad window"),
        (status = 409, description = "Window overlaps an existing reservation"),
        (status = 503, description = "Device registry unreachable")
    )
)]
pub async fn create_reservation(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Extension(token): Extension<BearerToken>,
    ValidatedJson(request): ValidatedJson<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReservationDto>>), ApiError> {
    let new_reservation = request.into_new_reservation()?;
    let reservation = state
        .controller
        .create(new_reservation, user.user_id, &token.0)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(reservation.into())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's reservations", body = ApiResponse<Vec<ReservationDto>>)
    )
)]
pub async fn list_reservations(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<ReservationDto>>>, ApiError> {
    let reservations = state.controller.list(user.user_id).await?;
    let dtos = reservations.into_iter().map(ReservationDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation details", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Not found or owned by someone else")
    )
)]
pub async fn get_reservation(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReservationDto>>, ApiError> {
    let reservation = state.controller.get(id, user.user_id).await?;
    Ok(Json(ApiResponse::success(reservation.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 204, description = "Reservation cancelled (idempotent)"),
        (status = 404, description = "Not found or owned by someone else")
    )
)]
pub async fn cancel_reservation(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.controller.cancel(id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/v1/reservations/{id}/release",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation after release", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Not found or owned by someone else")
    )
)]
pub async fn release_reservation(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReservationDto>>, ApiError> {
    let reservation = state.controller.release(id, user.user_id).await?;
    Ok(Json(ApiResponse::success(reservation.into())))
}
