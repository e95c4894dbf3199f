use serde_json::json;
use sqlx::types::Json;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, warn};

use crate::dto::notification_dto::InterviewScheduledEvent;
use crate::dto::schedule_dto::ScheduleInterviewPayload;
use crate::error::{Error, Result};
use crate::models::actor::{Actor, ActorRole, Interviewer, UserRecord};
use crate::models::application::{
    Application, BookingMetadata, InterviewType, MeetingPreference, Slot, StageBooking,
    APPLICATION_COLUMNS,
};
use crate::models::booking::NewBooking;
use crate::models::job_position::JobPosition;
use crate::services::application_service::{find_position, lock_application, ApplicationService};
use crate::services::audit_service::{self, NewEvent};
use crate::services::calendar_service::{self, CalendarService};
use crate::services::notification_service::NotificationService;
use crate::services::transition_engine::{self, Trigger};
use crate::utils::time;

#[derive(Clone)]
pub struct SchedulingService {
    pool: PgPool,
    applications: ApplicationService,
    calendar: CalendarService,
    notifications: NotificationService,
    enqueue_timeout: Duration,
}

impl SchedulingService {
    pub fn new(
        pool: PgPool,
        applications: ApplicationService,
        calendar: CalendarService,
        notifications: NotificationService,
        enqueue_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            applications,
            calendar,
            notifications,
            enqueue_timeout,
        }
    }

    /// Books an interview stage for an application and advances its status.
    ///
    /// The overlap check, booking write, metadata replacement and status
    /// change commit together while the namespace lock is held. The
    /// notification is queued afterwards and cannot undo the booking.
    pub async fn schedule(
        &self,
        id: i64,
        payload: ScheduleInterviewPayload,
        actor: &Actor,
    ) -> Result<Application> {
        transition_engine::ensure_can_schedule(actor.role)?;

        let application = self.applications.get(id).await?;

        let interview_type: InterviewType = payload
            .interview_type
            .parse()
            .map_err(|e: crate::models::ParseEnumError| Error::InvalidType(e.to_string()))?;
        let slot = Slot::new(payload.start, payload.end)?;
        let preference: MeetingPreference = payload.preference.parse()?;

        let (_, target) = transition_engine::stage_statuses(interview_type);
        ensure_schedulable(&application, interview_type)?;

        let mut conn = self.pool.acquire().await?;
        let position = find_position(&mut conn, application.position_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("Position {} not found", application.position_id))
            })?;
        drop(conn);
        let interviewer = self
            .resolve_interviewer(interview_type, &position, actor)
            .await?;

        if interviewer.is_placeholder() {
            warn!(
                application_id = id,
                position_id = position.id,
                interview_type = %interview_type,
                "No interviewer could be resolved, booking with placeholder"
            );
        }

        let namespace = self
            .calendar
            .resolve_namespace(position.calendar_namespace.as_deref())?;

        let mut tx = self.calendar.begin_reservation(&namespace).await?;

        // Re-read under lock; the status may have moved since the first read.
        let current = lock_application(&mut tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Application {} not found", id)))?;
        ensure_schedulable(&current, interview_type)?;

        calendar_service::ensure_free(&mut tx, &namespace, &slot, Some(id)).await?;

        let booking = calendar_service::replace_application_booking(
            &mut tx,
            id,
            &NewBooking {
                calendar_namespace: namespace.clone(),
                application_id: Some(id),
                interview_type: Some(interview_type),
                slot,
                title: format!("{}: {}", interview_type.label(), current.full_name),
                description: payload.note.clone(),
                created_by: Some(actor.id),
            },
        )
        .await?;

        let metadata = BookingMetadata::for_stage(
            current.metadata(),
            StageBooking {
                scheduled_by: actor.id,
                scheduled_at: time::now(),
                interview_type,
                meeting_preference: preference,
                slot,
                meeting_link: payload.meeting_link.clone(),
                hr_note: payload.note.clone(),
            },
        );

        let sql = format!(
            r#"
            UPDATE applications
            SET status = $2, booking_metadata = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        let updated = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .bind(target.as_str())
            .bind(Json(&metadata))
            .fetch_one(&mut *tx)
            .await?;

        audit_service::record(
            &mut tx,
            NewEvent {
                application_id: id,
                actor_id: Some(actor.id),
                action: "interview_scheduled",
                from_status: Some(current.status),
                to_status: Some(target),
                changes: Some(json!({
                    "bookingId": booking.id,
                    "interviewType": interview_type,
                    "slot": slot,
                    "interviewer": interviewer,
                })),
            },
        )
        .await?;

        tx.commit().await?;
        info!(
            application_id = id,
            booking_id = booking.id,
            namespace = %namespace,
            interview_type = %interview_type,
            status = %target,
            "Interview scheduled"
        );

        let event = InterviewScheduledEvent {
            application_id: id,
            candidate_name: updated.full_name.clone(),
            candidate_email: updated.email.clone(),
            interview_type: interview_type.as_str().to_string(),
            slot_start: slot.start,
            slot_end: slot.end,
            interviewer_name: interviewer.name.clone(),
            interviewer_email: interviewer.email.clone(),
            meeting_preference: preference.as_str().to_string(),
            note: payload.note,
        };
        self.queue_notification(&event).await;

        Ok(updated)
    }

    async fn queue_notification(&self, event: &InterviewScheduledEvent) {
        match tokio::time::timeout(self.enqueue_timeout, self.notifications.enqueue(event)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(
                application_id = event.application_id,
                error = %e,
                "Failed to queue interview notification"
            ),
            Err(_) => warn!(
                application_id = event.application_id,
                timeout_ms = self.enqueue_timeout.as_millis() as u64,
                "Timed out queueing interview notification"
            ),
        }
    }

    async fn resolve_interviewer(
        &self,
        interview_type: InterviewType,
        position: &JobPosition,
        actor: &Actor,
    ) -> Result<Interviewer> {
        let user = match interview_type {
            InterviewType::Technical => match position.requesting_manager_id {
                Some(manager_id) => {
                    sqlx::query_as::<_, UserRecord>(
                        r#"SELECT id, name, email FROM users WHERE id = $1"#,
                    )
                    .bind(manager_id)
                    .fetch_optional(&self.pool)
                    .await?
                }
                None => None,
            },
            InterviewType::Final => {
                sqlx::query_as::<_, UserRecord>(
                    r#"SELECT id, name, email FROM users WHERE role = $1 AND is_active ORDER BY id LIMIT 1"#,
                )
                .bind(ActorRole::HeadHr.as_str())
                .fetch_optional(&self.pool)
                .await?
            }
            InterviewType::Onboarding => return Ok(Interviewer::from(actor)),
        };
        Ok(user.map(Interviewer::from).unwrap_or_else(Interviewer::placeholder))
    }
}

fn ensure_schedulable(application: &Application, interview_type: InterviewType) -> Result<()> {
    if application.is_archived {
        return Err(Error::IllegalTransition(format!(
            "Application {} is archived and cannot be scheduled",
            application.id
        )));
    }
    let (_, target) = transition_engine::stage_statuses(interview_type);
    transition_engine::check(application.status, target, Trigger::Scheduling(interview_type))
}
