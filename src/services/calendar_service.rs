use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::{info, warn};

use crate::dto::booking_dto::{BookingListQuery, CreateBookingPayload};
use crate::error::{Error, Result};
use crate::models::actor::Actor;
use crate::models::application::Slot;
use crate::models::booking::{Booking, NewBooking, BOOKING_COLUMNS};

/// Finds bookings in `namespace` that intersect `slot`, optionally ignoring
/// the booking owned by `exclude_application`.
pub async fn find_overlapping(
    conn: &mut PgConnection,
    namespace: &str,
    slot: &Slot,
    exclude_application: Option<i64>,
) -> Result<Vec<Booking>> {
    let sql = format!(
        r#"
        SELECT {} FROM bookings
        WHERE calendar_namespace = $1
          AND starts_at < $3
          AND ends_at > $2
          AND ($4::BIGINT IS NULL OR application_id IS DISTINCT FROM $4)
        ORDER BY starts_at
        "#,
        BOOKING_COLUMNS
    );
    let bookings = sqlx::query_as::<_, Booking>(&sql)
        .bind(namespace)
        .bind(slot.start)
        .bind(slot.end)
        .bind(exclude_application)
        .fetch_all(conn)
        .await?;
    Ok(bookings)
}

pub async fn ensure_free(
    conn: &mut PgConnection,
    namespace: &str,
    slot: &Slot,
    exclude_application: Option<i64>,
) -> Result<()> {
    let overlapping = find_overlapping(conn, namespace, slot, exclude_application).await?;
    match overlapping.first() {
        None => Ok(()),
        Some(existing) => {
            info!(
                namespace,
                booking_id = existing.id,
                requested_start = %slot.start,
                requested_end = %slot.end,
                "Slot rejected, overlaps existing booking"
            );
            Err(Error::Conflict(format!(
                "Requested slot {} - {} overlaps booking {} ({} - {})",
                slot.start.to_rfc3339(),
                slot.end.to_rfc3339(),
                existing.id,
                existing.starts_at.to_rfc3339(),
                existing.ends_at.to_rfc3339()
            )))
        }
    }
}

pub async fn insert_booking(conn: &mut PgConnection, booking: &NewBooking) -> Result<Booking> {
    let sql = format!(
        r#"
        INSERT INTO bookings (calendar_namespace, application_id, interview_type, starts_at, ends_at, title, description, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        BOOKING_COLUMNS
    );
    let created = sqlx::query_as::<_, Booking>(&sql)
        .bind(&booking.calendar_namespace)
        .bind(booking.application_id)
        .bind(booking.interview_type.map(|t| t.as_str()))
        .bind(booking.slot.start)
        .bind(booking.slot.end)
        .bind(&booking.title)
        .bind(&booking.description)
        .bind(booking.created_by)
        .fetch_one(conn)
        .await?;
    Ok(created)
}

/// Swaps the application's booking for a new one.
pub async fn replace_application_booking(
    conn: &mut PgConnection,
    application_id: i64,
    booking: &NewBooking,
) -> Result<Booking> {
    sqlx::query("DELETE FROM bookings WHERE application_id = $1")
        .bind(application_id)
        .execute(&mut *conn)
        .await?;
    insert_booking(conn, booking).await
}

#[derive(Clone)]
pub struct CalendarService {
    pool: PgPool,
    default_namespace: String,
    lock_timeout: Duration,
}

impl CalendarService {
    pub fn new(pool: PgPool, default_namespace: String, lock_timeout: Duration) -> Self {
        Self {
            pool,
            default_namespace,
            lock_timeout,
        }
    }

    pub fn resolve_namespace(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .or_else(|| Some(self.default_namespace.trim()).filter(|ns| !ns.is_empty()))
            .map(str::to_string)
            .ok_or_else(|| {
                Error::Unconfigured(
                    "No calendar namespace configured for this booking".to_string(),
                )
            })
    }

    /// Opens a transaction that owns `namespace` until it commits or rolls
    /// back. Concurrent reservations on the same namespace queue on the
    /// advisory lock and give up after the configured lock timeout.
    pub async fn begin_reservation(&self, namespace: &str) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        let timeout_ms = self.lock_timeout.as_millis().max(1);
        sqlx::query(&format!("SET LOCAL lock_timeout = {}", timeout_ms))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("SET LOCAL statement_timeout = {}", timeout_ms))
            .execute(&mut *tx)
            .await?;
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(namespace)
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// Books a manual HR event (not tied to an application).
    pub async fn create_event(&self, payload: CreateBookingPayload, actor: &Actor) -> Result<Booking> {
        let slot = Slot::new(payload.start, payload.end)?;
        let namespace = self.resolve_namespace(payload.namespace.as_deref())?;

        let mut tx = self.begin_reservation(&namespace).await?;
        ensure_free(&mut tx, &namespace, &slot, None).await?;
        let booking = insert_booking(
            &mut tx,
            &NewBooking {
                calendar_namespace: namespace.clone(),
                application_id: None,
                interview_type: None,
                slot,
                title: payload.title.trim().to_string(),
                description: payload.description,
                created_by: Some(actor.id),
            },
        )
        .await?;
        tx.commit().await?;

        info!(booking_id = booking.id, namespace = %namespace, actor_id = actor.id, "Calendar event created");
        Ok(booking)
    }

    pub async fn list_events(&self, query: BookingListQuery) -> Result<Vec<Booking>> {
        let namespace = self.resolve_namespace(query.namespace.as_deref())?;
        let sql = format!(
            r#"
            SELECT {} FROM bookings
            WHERE calendar_namespace = $1
              AND ($2::TIMESTAMPTZ IS NULL OR ends_at > $2)
              AND ($3::TIMESTAMPTZ IS NULL OR starts_at < $3)
            ORDER BY starts_at
            "#,
            BOOKING_COLUMNS
        );
        let bookings = sqlx::query_as::<_, Booking>(&sql)
            .bind(namespace)
            .bind(query.from)
            .bind(query.to)
            .fetch_all(&self.pool)
            .await?;
        Ok(bookings)
    }

    /// Removes a manual event. Interview bookings belong to their
    /// application's stage and can't be deleted here.
    pub async fn delete_event(&self, id: i64) -> Result<()> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Booking {} not found", id)))?;

        if !booking.is_manual() {
            warn!(booking_id = id, application_id = ?booking.application_id, "Refused to delete interview booking");
            return Err(Error::IllegalTransition(format!(
                "Booking {} belongs to an application interview and cannot be deleted directly",
                id
            )));
        }

        sqlx::query("DELETE FROM bookings WHERE id = $1 AND application_id IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;
        info!(booking_id = id, "Calendar event deleted");
        Ok(())
    }
}
