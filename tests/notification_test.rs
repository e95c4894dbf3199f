mod common;

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use chrono::{TimeZone, Utc};
use recruitment_workflow::{
    dto::notification_dto::InterviewScheduledEvent,
    services::notification_service::NotificationService,
    utils::crypto::sign_payload,
};
use sqlx::PgPool;
use tokio::net::TcpListener;
use uuid::Uuid;

const SIGNING_SECRET: &str = "outbox_test_secret";

/// Rows created here are backdated before this instant so the dispatcher
/// reaches them ahead of anything else queued in the shared database.
const FIXTURE_EPOCH: &str = "2000-01-01 00:00:00+00";

#[derive(Clone)]
struct Receiver {
    status: StatusCode,
    seen: Arc<Mutex<Vec<(HeaderMap, Bytes)>>>,
}

impl Receiver {
    fn seen(&self) -> Vec<(HeaderMap, Bytes)> {
        self.seen.lock().unwrap().clone()
    }
}

async fn receive(State(receiver): State<Receiver>, headers: HeaderMap, body: Bytes) -> StatusCode {
    receiver.seen.lock().unwrap().push((headers, body));
    receiver.status
}

/// Starts a local endpoint that answers every delivery with `status`.
async fn spawn_receiver(status: StatusCode) -> (String, Receiver) {
    let receiver = Receiver {
        status,
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/interviews", post(receive))
        .with_state(receiver.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/interviews", addr), receiver)
}

/// The dispatcher claims globally, so tests in this file take turns.
async fn exclusive() -> tokio::sync::MutexGuard<'static, ()> {
    static LOCK: OnceLock<tokio::sync::Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| tokio::sync::Mutex::new(())).lock().await
}

async fn clear_fixtures(pool: &PgPool) {
    sqlx::query("DELETE FROM notification_outbox WHERE created_at < TIMESTAMPTZ '2001-01-01 00:00:00+00'")
        .execute(pool)
        .await
        .unwrap();
}

fn event(application_id: i64) -> InterviewScheduledEvent {
    InterviewScheduledEvent {
        application_id,
        candidate_name: "Ada Lovelace".to_string(),
        candidate_email: "ada@candidates.example.com".to_string(),
        interview_type: "hr".to_string(),
        slot_start: Utc.with_ymd_and_hms(2030, 3, 4, 9, 0, 0).unwrap(),
        slot_end: Utc.with_ymd_and_hms(2030, 3, 4, 10, 0, 0).unwrap(),
        interviewer_name: "Grace Hopper".to_string(),
        interviewer_email: Some("grace@example.com".to_string()),
        meeting_preference: "online".to_string(),
        note: None,
    }
}

fn unique_application_id() -> i64 {
    -(rand::random::<u32>() as i64) - 1
}

/// Queues an event and moves its `created_at` to `offset_secs` past the
/// fixture epoch.
async fn enqueue_at(
    service: &NotificationService,
    pool: &PgPool,
    application_id: i64,
    offset_secs: f64,
) -> Uuid {
    let entry = service
        .enqueue(&event(application_id))
        .await
        .unwrap()
        .expect("endpoint configured");
    sqlx::query(&format!(
        "UPDATE notification_outbox SET created_at = TIMESTAMPTZ '{}' + make_interval(secs => $2) WHERE id = $1",
        FIXTURE_EPOCH
    ))
    .bind(entry.id)
    .bind(offset_secs)
    .execute(pool)
    .await
    .unwrap();
    entry.id
}

async fn row(pool: &PgPool, id: Uuid) -> (String, i32, Option<i32>, bool) {
    let (status, attempts, http_status, deferred): (String, i32, Option<i32>, Option<bool>) =
        sqlx::query_as(
            "SELECT status, attempts, http_status, next_retry_at > NOW() FROM notification_outbox WHERE id = $1",
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap();
    (status, attempts, http_status, deferred.unwrap_or(false))
}

fn service(pool: &PgPool, url: &str, max_attempts: i32) -> NotificationService {
    NotificationService::new(
        pool.clone(),
        Some(url.to_string()),
        Some(SIGNING_SECRET.to_string()),
        Duration::from_secs(5),
        max_attempts,
    )
}

#[tokio::test]
async fn accepted_delivery_is_signed_and_marked_delivered() {
    let app = common::setup().await;
    let _turn = exclusive().await;
    clear_fixtures(&app.pool).await;

    let (url, receiver) = spawn_receiver(StatusCode::OK).await;
    let service = service(&app.pool, &url, 3);
    let id = enqueue_at(&service, &app.pool, unique_application_id(), 0.0).await;

    assert!(service.run_once().await.unwrap());
    let (status, attempts, http_status, _) = row(&app.pool, id).await;
    assert_eq!(status, "delivered");
    assert_eq!(attempts, 1);
    assert_eq!(http_status, Some(200));

    let seen = receiver.seen();
    assert_eq!(seen.len(), 1);
    let (headers, body) = &seen[0];
    assert_eq!(headers["x-event-type"], "interview_scheduled");
    assert_eq!(headers["x-event-id"], id.to_string().as_str());
    assert_eq!(headers["x-signature"], sign_payload(SIGNING_SECRET, body).as_str());
    let payload: serde_json::Value = serde_json::from_slice(body).unwrap();
    assert_eq!(payload["candidateName"], "Ada Lovelace");
}

#[tokio::test]
async fn rejected_delivery_backs_off_then_goes_dead() {
    let app = common::setup().await;
    let _turn = exclusive().await;
    clear_fixtures(&app.pool).await;

    let (url, receiver) = spawn_receiver(StatusCode::INTERNAL_SERVER_ERROR).await;
    let service = service(&app.pool, &url, 2);
    let id = enqueue_at(&service, &app.pool, unique_application_id(), 0.0).await;

    assert!(service.run_once().await.unwrap());
    let (status, attempts, http_status, deferred) = row(&app.pool, id).await;
    assert_eq!(status, "pending");
    assert_eq!(attempts, 1);
    assert_eq!(http_status, Some(500));
    assert!(deferred, "retry must be scheduled in the future");

    sqlx::query("UPDATE notification_outbox SET next_retry_at = NOW() - INTERVAL '1 second' WHERE id = $1")
        .bind(id)
        .execute(&app.pool)
        .await
        .unwrap();

    assert!(service.run_once().await.unwrap());
    let (status, attempts, _, deferred) = row(&app.pool, id).await;
    assert_eq!(status, "dead");
    assert_eq!(attempts, 2);
    assert!(!deferred);
    assert_eq!(receiver.seen().len(), 2);
}

#[tokio::test]
async fn newer_entry_waits_behind_an_undelivered_older_one() {
    let app = common::setup().await;
    let _turn = exclusive().await;
    clear_fixtures(&app.pool).await;

    let (url, _receiver) = spawn_receiver(StatusCode::OK).await;
    let service = service(&app.pool, &url, 3);
    let blocked_app = unique_application_id();
    let older = enqueue_at(&service, &app.pool, blocked_app, 0.0).await;
    let newer = enqueue_at(&service, &app.pool, blocked_app, 1.0).await;
    let other = enqueue_at(&service, &app.pool, blocked_app - 1, 2.0).await;

    // The older entry is pending but not yet due.
    sqlx::query("UPDATE notification_outbox SET next_retry_at = NOW() + INTERVAL '1 hour' WHERE id = $1")
        .bind(older)
        .execute(&app.pool)
        .await
        .unwrap();

    let claimed = service.claim_next().await.unwrap().expect("a due entry");
    assert_eq!(claimed.id, other);
    assert_eq!(row(&app.pool, newer).await.0, "pending");

    sqlx::query("UPDATE notification_outbox SET next_retry_at = NULL WHERE id = $1")
        .bind(older)
        .execute(&app.pool)
        .await
        .unwrap();
    let claimed = service.claim_next().await.unwrap().expect("a due entry");
    assert_eq!(claimed.id, older);

    // Still blocked while the older entry is in flight.
    let next = service.claim_next().await.unwrap();
    assert_ne!(next.map(|e| e.id), Some(newer));
}
