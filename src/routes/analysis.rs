use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use serde_json::Value as JsonValue;

use crate::{
    config::get_config,
    dto::analysis_dto::{AnalysisAck, AnalysisPayload},
    error::{Error, Result},
    utils::crypto::secrets_match,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications/{id}/analysis-result",
    params(
        ("id" = i64, Path, description = "Application ID")
    ),
    request_body = AnalysisPayload,
    responses(
        (status = 200, description = "Callback accepted (applied, duplicate or unknown id)", body = AnalysisAck),
        (status = 400, description = "Malformed analysis payload"),
        (status = 401, description = "Missing or wrong callback secret")
    )
)]
#[axum::debug_handler]
pub async fn receive_analysis_result(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<JsonValue>,
) -> Result<impl IntoResponse> {
    verify_secret(&headers, get_config().scorer_callback_secret.as_deref())?;
    let payload = AnalysisPayload::from_json(body)?;
    state.ingestion_service.ingest(id, payload).await?;
    Ok(Json(AnalysisAck { accepted: true }))
}

fn verify_secret(headers: &HeaderMap, expected: Option<&str>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let Some(secret_hdr) = headers.get("x-webhook-secret") else {
        return Err(Error::Unauthorized("missing_webhook_secret".into()));
    };
    let provided = secret_hdr
        .to_str()
        .map_err(|_| Error::Unauthorized("invalid_secret_header".into()))?;
    if secrets_match(provided, expected) {
        Ok(())
    } else {
        Err(Error::Unauthorized("invalid_webhook_secret".into()))
    }
}
