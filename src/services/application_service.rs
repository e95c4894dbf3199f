use rand::Rng;
use serde_json::json;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::dto::application_dto::{SubmitApplicationPayload, UpdateApplicationPayload};
use crate::error::{Error, Result};
use crate::models::actor::Actor;
use crate::models::application::{Application, ApplicationStatus, BookingMetadata, APPLICATION_COLUMNS};
use crate::models::job_position::JobPosition;
use crate::services::audit_service::{self, NewEvent};
use crate::services::transition_engine;

const SUBMIT_ATTEMPTS: u64 = 8;
const SUBMIT_BACKOFF_MS: u64 = 10;

/// Loads an application and holds its row lock until the transaction ends.
pub async fn lock_application(conn: &mut PgConnection, id: i64) -> Result<Option<Application>> {
    let sql = format!("SELECT {} FROM applications WHERE id = $1 FOR UPDATE", APPLICATION_COLUMNS);
    let application = sqlx::query_as::<_, Application>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(application)
}

pub async fn find_position(conn: &mut PgConnection, id: i64) -> Result<Option<JobPosition>> {
    let position = sqlx::query_as::<_, JobPosition>(
        r#"SELECT id, title, status, requesting_manager_id, calendar_namespace FROM job_positions WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(position)
}

#[derive(Clone)]
pub struct ApplicationService {
    pool: PgPool,
}

impl ApplicationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: i64) -> Result<Option<Application>> {
        let sql = format!("SELECT {} FROM applications WHERE id = $1", APPLICATION_COLUMNS);
        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(application)
    }

    pub async fn get(&self, id: i64) -> Result<Application> {
        self.find(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Application {} not found", id)))
    }

    /// The active review queue: everything not archived.
    pub async fn list_active(&self, status: Option<ApplicationStatus>) -> Result<Vec<Application>> {
        let sql = format!(
            "SELECT {} FROM applications WHERE NOT is_archived AND ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC, id DESC",
            APPLICATION_COLUMNS
        );
        let applications = sqlx::query_as::<_, Application>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        Ok(applications)
    }

    pub async fn list_archived(&self) -> Result<Vec<Application>> {
        let sql = format!(
            "SELECT {} FROM applications WHERE is_archived ORDER BY updated_at DESC, id DESC",
            APPLICATION_COLUMNS
        );
        let applications = sqlx::query_as::<_, Application>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(applications)
    }

    /// Creates an application in `SUBMITTED`. The duplicate check and the
    /// insert share one serializable transaction, which is retried when
    /// Postgres aborts it on a serialization conflict.
    pub async fn submit(&self, payload: SubmitApplicationPayload) -> Result<Application> {
        if !payload.agreement {
            return Err(Error::BadRequest(
                "The data processing agreement must be accepted".to_string(),
            ));
        }

        let mut attempt = 1;
        loop {
            match self.try_submit(&payload).await {
                Err(Error::Contention(_)) if attempt < SUBMIT_ATTEMPTS => {
                    debug!(attempt, position_id = payload.position_id, "Submission conflicted, retrying");
                    let jitter = rand::thread_rng().gen_range(0..SUBMIT_BACKOFF_MS);
                    tokio::time::sleep(Duration::from_millis(SUBMIT_BACKOFF_MS * attempt + jitter)).await;
                    attempt += 1;
                }
                Err(Error::Contention(msg)) => {
                    warn!(attempts = attempt, position_id = payload.position_id, "Submission kept conflicting");
                    return Err(Error::Contention(msg));
                }
                other => return other,
            }
        }
    }

    async fn try_submit(&self, payload: &SubmitApplicationPayload) -> Result<Application> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        let position = find_position(&mut tx, payload.position_id)
            .await?
            .filter(|p| p.accepts_applications())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "Position {} does not exist or is not open",
                    payload.position_id
                ))
            })?;

        let duplicate: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM applications WHERE lower(email) = lower($1) AND position_id = $2)"#,
        )
        .bind(payload.email.trim())
        .bind(position.id)
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(Error::Conflict(format!(
                "An application from {} already exists for this position",
                payload.email.trim()
            )));
        }

        let sql = format!(
            r#"
            INSERT INTO applications (position_id, full_name, email, qualification, cv_object_key, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(position.id)
            .bind(payload.full_name.trim())
            .bind(payload.email.trim())
            .bind(payload.qualification.as_deref().map(str::trim))
            .bind(payload.cv_object_key.trim())
            .bind(ApplicationStatus::Submitted.as_str())
            .fetch_one(&mut *tx)
            .await?;

        audit_service::record(
            &mut tx,
            NewEvent {
                application_id: application.id,
                actor_id: None,
                action: "submitted",
                from_status: None,
                to_status: Some(ApplicationStatus::Submitted),
                changes: None,
            },
        )
        .await?;

        tx.commit().await?;
        info!(application_id = application.id, position_id = position.id, "Application submitted");
        Ok(application)
    }

    pub async fn transition(
        &self,
        id: i64,
        requested: ApplicationStatus,
        actor: &Actor,
    ) -> Result<Application> {
        self.apply_update(id, Some(requested), None, actor).await
    }

    /// Partial update: applies whichever of `status` and
    /// `interviewNotesPatch` is present and writes only those columns.
    pub async fn update(
        &self,
        id: i64,
        payload: UpdateApplicationPayload,
        actor: &Actor,
    ) -> Result<Application> {
        if payload.is_empty() {
            return Err(Error::BadRequest(
                "Request must contain status or interviewNotesPatch".to_string(),
            ));
        }
        let requested = payload
            .status
            .as_deref()
            .map(str::parse::<ApplicationStatus>)
            .transpose()?;
        let patch = payload.interview_notes_patch.filter(|p| !p.is_empty());
        self.apply_update(id, requested, patch, actor).await
    }

    async fn apply_update(
        &self,
        id: i64,
        requested: Option<ApplicationStatus>,
        patch: Option<crate::models::application::BookingMetadataPatch>,
        actor: &Actor,
    ) -> Result<Application> {
        let mut tx = self.pool.begin().await?;
        let current = lock_application(&mut tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Application {} not found", id)))?;

        if current.is_archived {
            return Err(Error::IllegalTransition(format!(
                "Application {} is archived and cannot be changed",
                id
            )));
        }

        let mut metadata: Option<BookingMetadata> = current.metadata().cloned();
        let mut metadata_touched = false;

        if let Some(to) = requested {
            transition_engine::check_manual(current.status, to, actor.role)?;
            if transition_engine::clears_booking_slot(to) {
                metadata = Some(metadata.unwrap_or_default().cleared_for_decision());
                metadata_touched = true;
            }
        }

        if let Some(patch) = &patch {
            let mut merged = metadata.unwrap_or_default();
            merged.apply_patch(patch);
            metadata = Some(merged);
            metadata_touched = true;
        }

        let sql = format!(
            r#"
            UPDATE applications
            SET status = COALESCE($2, status),
                booking_metadata = CASE WHEN $3 THEN $4 ELSE booking_metadata END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        let updated = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .bind(requested.map(|s| s.as_str()))
            .bind(metadata_touched)
            .bind(metadata.map(Json))
            .fetch_one(&mut *tx)
            .await?;

        audit_service::record(
            &mut tx,
            NewEvent {
                application_id: id,
                actor_id: Some(actor.id),
                action: if requested.is_some() { "status_changed" } else { "notes_patched" },
                from_status: Some(current.status),
                to_status: requested,
                changes: patch.map(|p| json!({ "interviewNotesPatch": p })),
            },
        )
        .await?;

        tx.commit().await?;
        info!(
            application_id = id,
            actor_id = actor.id,
            from = %current.status,
            to = %updated.status,
            "Application updated"
        );
        Ok(updated)
    }
}
