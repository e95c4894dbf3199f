use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::application::{InterviewType, Slot};

pub const BOOKING_COLUMNS: &str = "id, calendar_namespace, application_id, interview_type, \
    starts_at, ends_at, title, description, created_by, created_at";

/// A reserved interval on a calendar namespace. Rows without an
/// `application_id` are manual HR events.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub calendar_namespace: String,
    pub application_id: Option<i64>,
    pub interview_type: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_manual(&self) -> bool {
        self.application_id.is_none()
    }

    pub fn slot(&self) -> Slot {
        Slot {
            start: self.starts_at,
            end: self.ends_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub calendar_namespace: String,
    pub application_id: Option<i64>,
    pub interview_type: Option<InterviewType>,
    pub slot: Slot,
    pub title: String,
    pub description: Option<String>,
    pub created_by: Option<i64>,
}
