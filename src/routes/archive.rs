use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::Value as JsonValue;

use crate::{
    dto::archive_dto::BulkIdsPayload, error::Result, models::actor::Actor,
    utils::validation::parse_body, AppState,
};

#[utoipa::path(
    put,
    path = "/api/applications/archive",
    request_body = BulkIdsPayload,
    responses(
        (status = 200, description = "Eligible applications archived", body = BulkResult),
        (status = 400, description = "Empty or oversized id list")
    )
)]
#[axum::debug_handler]
pub async fn archive_applications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<JsonValue>,
) -> Result<impl IntoResponse> {
    let payload: BulkIdsPayload = parse_body(body)?;
    let result = state.archival_service.archive(&payload.ids, &actor).await?;
    Ok(Json(result))
}

#[utoipa::path(
    put,
    path = "/api/applications/unarchive",
    request_body = BulkIdsPayload,
    responses(
        (status = 200, description = "Archived applications restored", body = BulkResult),
        (status = 400, description = "Empty or oversized id list")
    )
)]
#[axum::debug_handler]
pub async fn unarchive_applications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<JsonValue>,
) -> Result<impl IntoResponse> {
    let payload: BulkIdsPayload = parse_body(body)?;
    let result = state.archival_service.unarchive(&payload.ids, &actor).await?;
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/applications/bulk-delete",
    request_body = BulkIdsPayload,
    responses(
        (status = 200, description = "Active applications deleted with their bookings and CVs", body = BulkResult),
        (status = 400, description = "Empty or oversized id list")
    )
)]
#[axum::debug_handler]
pub async fn bulk_delete_applications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<JsonValue>,
) -> Result<impl IntoResponse> {
    let payload: BulkIdsPayload = parse_body(body)?;
    let result = state
        .archival_service
        .bulk_delete_active(&payload.ids, &actor)
        .await?;
    Ok(Json(result))
}
