use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::dto::analysis_dto::AnalysisPayload;
use crate::error::Result;
use crate::models::application::{Application, ApplicationStatus, APPLICATION_COLUMNS};
use crate::services::application_service::lock_application;
use crate::services::audit_service::{self, NewEvent};
use crate::services::transition_engine::{self, Trigger};

/// Applies scorer callbacks. Only an application still in `SUBMITTED` is
/// touched, which makes redelivered callbacks harmless.
#[derive(Clone)]
pub struct IngestionService {
    pool: PgPool,
}

impl IngestionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns `None` when the application does not exist, and the unchanged
    /// record when the analysis was already applied.
    pub async fn ingest(&self, id: i64, payload: AnalysisPayload) -> Result<Option<Application>> {
        let mut tx = self.pool.begin().await?;
        let Some(current) = lock_application(&mut tx, id).await? else {
            warn!(application_id = id, "Analysis result received for unknown application");
            return Ok(None);
        };

        if current.status != ApplicationStatus::Submitted {
            info!(
                application_id = id,
                status = %current.status,
                "Duplicate analysis result ignored"
            );
            return Ok(Some(current));
        }

        transition_engine::check(current.status, ApplicationStatus::Reviewed, Trigger::Ingestion)?;

        let sql = format!(
            r#"
            UPDATE applications
            SET similarity_score = $2,
                passed_hard_gate = $3,
                qualitative_assessment = $4,
                requirement_snapshot = $5,
                status = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        let updated = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .bind(payload.similarity_score)
            .bind(payload.passed_hard_gate)
            .bind(&payload.qualitative_assessment)
            .bind(&payload.requirement_snapshot)
            .bind(ApplicationStatus::Reviewed.as_str())
            .fetch_one(&mut *tx)
            .await?;

        audit_service::record(
            &mut tx,
            NewEvent {
                application_id: id,
                actor_id: None,
                action: "analysis_ingested",
                from_status: Some(ApplicationStatus::Submitted),
                to_status: Some(ApplicationStatus::Reviewed),
                changes: Some(json!({
                    "similarityScore": payload.similarity_score,
                    "passedHardGate": payload.passed_hard_gate,
                })),
            },
        )
        .await?;

        tx.commit().await?;
        info!(
            application_id = id,
            similarity_score = payload.similarity_score,
            passed_hard_gate = payload.passed_hard_gate,
            "Analysis result applied"
        );
        Ok(Some(updated))
    }
}
