use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::Value as JsonValue;

use crate::{
    dto::schedule_dto::ScheduleInterviewPayload, error::Result, models::actor::Actor,
    utils::validation::parse_body, AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications/{id}/schedule",
    params(
        ("id" = i64, Path, description = "Application ID")
    ),
    request_body = ScheduleInterviewPayload,
    responses(
        (status = 200, description = "Interview booked, application advanced", body = Application),
        (status = 400, description = "Invalid type, slot, preference or status"),
        (status = 403, description = "Role may not schedule interviews"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Slot overlaps an existing booking"),
        (status = 503, description = "Calendar busy, retry later")
    )
)]
#[axum::debug_handler]
pub async fn schedule_interview(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(body): Json<JsonValue>,
) -> Result<impl IntoResponse> {
    let payload: ScheduleInterviewPayload = parse_body(body)?;
    let application = state.scheduling_service.schedule(id, payload, &actor).await?;
    Ok(Json(application))
}
