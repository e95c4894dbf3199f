use crate::error::Result;
use crate::models::application::ApplicationStatus;
use crate::models::application_event::ApplicationEvent;
use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool};

/// One row of the application's history, written in the caller's transaction.
pub struct NewEvent<'a> {
    pub application_id: i64,
    pub actor_id: Option<i64>,
    pub action: &'a str,
    pub from_status: Option<ApplicationStatus>,
    pub to_status: Option<ApplicationStatus>,
    pub changes: Option<JsonValue>,
}

pub async fn record(conn: &mut PgConnection, event: NewEvent<'_>) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO application_events (application_id, actor_id, action, from_status, to_status, changes)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(event.application_id)
    .bind(event.actor_id)
    .bind(event.action)
    .bind(event.from_status.map(|s| s.as_str()))
    .bind(event.to_status.map(|s| s.as_str()))
    .bind(event.changes)
    .execute(conn)
    .await?;
    Ok(())
}

#[derive(Clone)]
pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn history(&self, application_id: i64) -> Result<Vec<ApplicationEvent>> {
        let events = sqlx::query_as::<_, ApplicationEvent>(
            r#"
            SELECT id, application_id, actor_id, action, from_status, to_status, changes, created_at
            FROM application_events
            WHERE application_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}
