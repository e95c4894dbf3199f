use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

pub const OUTBOX_COLUMNS: &str = "id, application_id, event_type, payload, target_url, status, \
    attempts, max_attempts, next_retry_at, http_status, response_body, created_at, updated_at";

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_IN_FLIGHT: &str = "in_flight";
pub const STATUS_DELIVERED: &str = "delivered";
pub const STATUS_DEAD: &str = "dead";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub application_id: Option<i64>,
    pub event_type: String,
    pub payload: JsonValue,
    pub target_url: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub http_status: Option<i32>,
    pub response_body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
