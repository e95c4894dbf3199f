use crate::config::Config;
use crate::dto::notification_dto::{InterviewScheduledEvent, INTERVIEW_SCHEDULED_EVENT};
use crate::error::Result;
use crate::models::notification::{
    OutboxEntry, OUTBOX_COLUMNS, STATUS_DEAD, STATUS_DELIVERED, STATUS_IN_FLIGHT, STATUS_PENDING,
};
use crate::utils::crypto::sign_payload;
use rand::Rng;
use reqwest::Client;
use sqlx::PgPool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const BASE_RETRY_SECS: f64 = 30.0;
const MAX_RETRY_SECS: f64 = 3600.0;
const MAX_RESPONSE_BODY: usize = 2048;
/// An `in_flight` row older than this is assumed abandoned by a crashed worker.
const STALE_CLAIM_SECS: i64 = 300;

/// Delay before the next attempt after `attempts` failures, capped at one
/// hour. `jitter` in `[0, 1)` stretches the delay by up to 20%.
pub fn retry_delay(attempts: i32, jitter: f64) -> Duration {
    let exponent = (attempts.max(1) - 1).min(16);
    let base = (BASE_RETRY_SECS * 2f64.powi(exponent)).min(MAX_RETRY_SECS);
    Duration::from_secs_f64(base * (1.0 + 0.2 * jitter.clamp(0.0, 1.0)))
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered(u16),
    Rejected(u16, String),
    Failed(String),
}

#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    client: Client,
    target_url: Option<String>,
    signing_secret: Option<String>,
    max_attempts: i32,
}

impl NotificationService {
    pub fn new(
        pool: PgPool,
        target_url: Option<String>,
        signing_secret: Option<String>,
        timeout: Duration,
        max_attempts: i32,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client for notifications");
                Client::new()
            });
        Self {
            pool,
            client,
            target_url,
            signing_secret,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(pool: PgPool, config: &Config) -> Self {
        Self::new(
            pool,
            config.notification_webhook_url.clone(),
            config.notification_signing_secret.clone(),
            config.notification_timeout,
            config.notification_max_attempts,
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.target_url.is_some()
    }

    /// Queues the event for background delivery. Without a configured
    /// endpoint this is a no-op.
    pub async fn enqueue(&self, event: &InterviewScheduledEvent) -> Result<Option<OutboxEntry>> {
        let Some(target_url) = &self.target_url else {
            debug!(application_id = event.application_id, "Notification endpoint not configured, event dropped");
            return Ok(None);
        };
        let payload = serde_json::to_value(event)?;
        let sql = format!(
            r#"
            INSERT INTO notification_outbox (application_id, event_type, payload, target_url, status, max_attempts)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            OUTBOX_COLUMNS
        );
        let entry = sqlx::query_as::<_, OutboxEntry>(&sql)
            .bind(event.application_id)
            .bind(INTERVIEW_SCHEDULED_EVENT)
            .bind(payload)
            .bind(target_url)
            .bind(STATUS_PENDING)
            .bind(self.max_attempts)
            .fetch_one(&self.pool)
            .await?;
        info!(outbox_id = %entry.id, application_id = event.application_id, "Notification queued");
        Ok(Some(entry))
    }

    /// Claims the oldest due entry. An entry waits while an older undelivered
    /// entry exists for the same application.
    pub async fn claim_next(&self) -> Result<Option<OutboxEntry>> {
        let sql = format!(
            r#"
            UPDATE notification_outbox SET status = $1, updated_at = NOW()
            WHERE id = (
                SELECT o.id FROM notification_outbox o
                WHERE (
                    (o.status = $2 AND (o.next_retry_at IS NULL OR o.next_retry_at <= NOW()))
                    OR (o.status = $1 AND o.updated_at < NOW() - make_interval(secs => $3))
                )
                AND NOT EXISTS (
                    SELECT 1 FROM notification_outbox p
                    WHERE p.application_id = o.application_id
                      AND p.status IN ($1, $2)
                      AND p.created_at < o.created_at
                )
                ORDER BY o.created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING {}
            "#,
            OUTBOX_COLUMNS
        );
        let entry = sqlx::query_as::<_, OutboxEntry>(&sql)
            .bind(STATUS_IN_FLIGHT)
            .bind(STATUS_PENDING)
            .bind(STALE_CLAIM_SECS as f64)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    pub async fn deliver(&self, entry: &OutboxEntry) -> DeliveryOutcome {
        let body = match serde_json::to_vec(&entry.payload) {
            Ok(body) => body,
            Err(e) => return DeliveryOutcome::Failed(format!("payload encoding failed: {}", e)),
        };
        let mut request = self
            .client
            .post(&entry.target_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("X-Event-Type", &entry.event_type)
            .header("X-Event-Id", entry.id.to_string());
        if let Some(secret) = &self.signing_secret {
            request = request.header("X-Signature", sign_payload(secret, &body));
        }

        match request.body(body).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                if (200..300).contains(&status) {
                    DeliveryOutcome::Delivered(status)
                } else {
                    DeliveryOutcome::Rejected(status, text)
                }
            }
            Err(err) => DeliveryOutcome::Failed(err.to_string()),
        }
    }

    async fn record_outcome(&self, entry: &OutboxEntry, outcome: &DeliveryOutcome) -> Result<()> {
        let attempts = entry.attempts + 1;
        let (http_status, body) = match outcome {
            DeliveryOutcome::Delivered(status) => (Some(*status as i32), None),
            DeliveryOutcome::Rejected(status, text) => (Some(*status as i32), Some(truncate(text))),
            DeliveryOutcome::Failed(reason) => (None, Some(truncate(reason))),
        };

        if let DeliveryOutcome::Delivered(_) = outcome {
            sqlx::query(
                r#"UPDATE notification_outbox SET status = $1, http_status = $2, response_body = NULL, attempts = $3, next_retry_at = NULL, updated_at = NOW() WHERE id = $4"#,
            )
            .bind(STATUS_DELIVERED)
            .bind(http_status)
            .bind(attempts)
            .bind(entry.id)
            .execute(&self.pool)
            .await?;
            info!(outbox_id = %entry.id, attempts, "Notification delivered");
            return Ok(());
        }

        if attempts >= entry.max_attempts {
            sqlx::query(
                r#"UPDATE notification_outbox SET status = $1, http_status = $2, response_body = $3, attempts = $4, next_retry_at = NULL, updated_at = NOW() WHERE id = $5"#,
            )
            .bind(STATUS_DEAD)
            .bind(http_status)
            .bind(body)
            .bind(attempts)
            .bind(entry.id)
            .execute(&self.pool)
            .await?;
            error!(outbox_id = %entry.id, application_id = ?entry.application_id, attempts, "Notification delivery exhausted retries");
            return Ok(());
        }

        let delay = retry_delay(attempts, rand::thread_rng().gen::<f64>());
        sqlx::query(
            r#"UPDATE notification_outbox SET status = $1, http_status = $2, response_body = $3, attempts = $4, next_retry_at = NOW() + make_interval(secs => $5), updated_at = NOW() WHERE id = $6"#,
        )
        .bind(STATUS_PENDING)
        .bind(http_status)
        .bind(body)
        .bind(attempts)
        .bind(delay.as_secs_f64())
        .bind(entry.id)
        .execute(&self.pool)
        .await?;
        warn!(outbox_id = %entry.id, attempts, retry_in_secs = delay.as_secs(), "Notification delivery failed, will retry");
        Ok(())
    }

    /// Delivers at most one entry. Returns `false` when nothing was due.
    pub async fn run_once(&self) -> Result<bool> {
        let Some(entry) = self.claim_next().await? else {
            return Ok(false);
        };
        let outcome = self.deliver(&entry).await;
        self.record_outcome(&entry, &outcome).await?;
        Ok(true)
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!(enabled = self.is_enabled(), "Notification dispatcher started");
        loop {
            let idle = match self.run_once().await {
                Ok(true) => None,
                Ok(false) => Some(Duration::from_millis(1000)),
                Err(e) => {
                    error!(error = ?e, "Notification worker error");
                    Some(Duration::from_secs(2))
                }
            };
            match idle {
                Some(wait) => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                None if shutdown.is_cancelled() => break,
                None => {}
            }
        }
        info!("Notification dispatcher stopped");
    }
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_RESPONSE_BODY {
        return text.to_string();
    }
    let mut end = MAX_RESPONSE_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_and_caps() {
        assert_eq!(retry_delay(1, 0.0), Duration::from_secs(30));
        assert_eq!(retry_delay(2, 0.0), Duration::from_secs(60));
        assert_eq!(retry_delay(4, 0.0), Duration::from_secs(240));
        assert_eq!(retry_delay(20, 0.0), Duration::from_secs(3600));
        assert_eq!(retry_delay(0, 0.0), Duration::from_secs(30));
    }

    #[test]
    fn jitter_adds_at_most_a_fifth() {
        assert!((retry_delay(1, 1.0).as_secs_f64() - 36.0).abs() < 1e-6);
        assert!((retry_delay(1, 5.0).as_secs_f64() - 36.0).abs() < 1e-6);
        assert!(retry_delay(3, 0.5) > retry_delay(3, 0.0));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "é".repeat(MAX_RESPONSE_BODY);
        let cut = truncate(&long);
        assert!(cut.len() <= MAX_RESPONSE_BODY);
        assert!(cut.chars().all(|c| c == 'é'));
        assert_eq!(truncate("ok"), "ok");
    }
}
