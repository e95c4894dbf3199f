use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::Value as JsonValue;

use crate::{
    dto::booking_dto::{BookingListQuery, CreateBookingPayload},
    error::Result,
    models::actor::Actor,
    services::transition_engine,
    utils::validation::parse_body,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/bookings",
    params(
        ("namespace" = Option<String>, Query, description = "Calendar namespace, defaults to the configured one"),
        ("from" = Option<String>, Query, description = "Window start"),
        ("to" = Option<String>, Query, description = "Window end")
    ),
    responses(
        (status = 200, description = "Bookings overlapping the window", body = [Booking])
    )
)]
#[axum::debug_handler]
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingListQuery>,
) -> Result<impl IntoResponse> {
    let bookings = state.calendar_service.list_events(query).await?;
    Ok(Json(bookings))
}

#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingPayload,
    responses(
        (status = 201, description = "Calendar event created", body = Booking),
        (status = 400, description = "Invalid payload or slot"),
        (status = 403, description = "Role may not manage the calendar"),
        (status = 409, description = "Slot overlaps an existing booking"),
        (status = 503, description = "Calendar busy, retry later")
    )
)]
#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<JsonValue>,
) -> Result<impl IntoResponse> {
    transition_engine::ensure_can_schedule(actor.role)?;
    let payload: CreateBookingPayload = parse_body(body)?;
    let booking = state.calendar_service.create_event(payload, &actor).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[utoipa::path(
    delete,
    path = "/api/bookings/{id}",
    params(
        ("id" = i64, Path, description = "Booking ID")
    ),
    responses(
        (status = 204, description = "Calendar event deleted"),
        (status = 400, description = "Booking belongs to an interview"),
        (status = 403, description = "Role may not manage the calendar"),
        (status = 404, description = "Booking not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    transition_engine::ensure_can_schedule(actor.role)?;
    state.calendar_service.delete_event(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
