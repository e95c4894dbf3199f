use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const INTERVIEW_SCHEDULED_EVENT: &str = "interview_scheduled";

/// Payload posted to the automation endpoint after a slot is booked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewScheduledEvent {
    pub application_id: i64,
    pub candidate_name: String,
    pub candidate_email: String,
    pub interview_type: String,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub interviewer_name: String,
    pub interviewer_email: Option<String>,
    pub meeting_preference: String,
    pub note: Option<String>,
}
