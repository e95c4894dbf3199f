use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::Value as JsonValue;

use crate::{
    dto::application_dto::{
        ApplicationListQuery, SubmitApplicationPayload, UpdateApplicationPayload,
    },
    error::Result,
    models::{actor::Actor, application::ApplicationStatus},
    utils::validation::parse_body,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications",
    request_body = SubmitApplicationPayload,
    responses(
        (status = 201, description = "Application submitted", body = Application),
        (status = 400, description = "Invalid payload or agreement not accepted"),
        (status = 404, description = "Position not found or closed"),
        (status = 409, description = "Candidate already applied to this position")
    )
)]
#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>,
) -> Result<impl IntoResponse> {
    let payload: SubmitApplicationPayload = parse_body(body)?;
    let application = state.application_service.submit(payload).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[utoipa::path(
    get,
    path = "/api/applications",
    params(
        ("status" = Option<String>, Query, description = "Only applications in this status")
    ),
    responses(
        (status = 200, description = "Active applications", body = [Application]),
        (status = 400, description = "Unknown status")
    )
)]
#[axum::debug_handler]
pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<ApplicationStatus>)
        .transpose()?;
    let applications = state.application_service.list_active(status).await?;
    Ok(Json(applications))
}

#[utoipa::path(
    get,
    path = "/api/applications/archived",
    responses(
        (status = 200, description = "Archived applications", body = [Application])
    )
)]
#[axum::debug_handler]
pub async fn list_archived_applications(
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let applications = state.application_service.list_archived().await?;
    Ok(Json(applications))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    params(
        ("id" = i64, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application", body = Application),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let application = state.application_service.get(id).await?;
    Ok(Json(application))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/history",
    params(
        ("id" = i64, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Audit trail, oldest first", body = [ApplicationEvent]),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_application_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.application_service.get(id).await?;
    let events = state.audit_service.history(id).await?;
    Ok(Json(events))
}

#[utoipa::path(
    patch,
    path = "/api/applications/{id}/status",
    params(
        ("id" = i64, Path, description = "Application ID")
    ),
    request_body = UpdateApplicationPayload,
    responses(
        (status = 200, description = "Application updated", body = Application),
        (status = 400, description = "Invalid payload or illegal transition"),
        (status = 403, description = "Role may not perform this transition"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn update_application_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(body): Json<JsonValue>,
) -> Result<impl IntoResponse> {
    let payload: UpdateApplicationPayload = parse_body(body)?;
    let application = state.application_service.update(id, payload, &actor).await?;
    Ok(Json(application))
}
