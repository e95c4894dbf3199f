use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::time::deserialize_flexible;

/// `interviewType` and `preference` stay as raw strings so the scheduling
/// engine can report them with its own error kinds.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInterviewPayload {
    pub interview_type: String,
    #[serde(deserialize_with = "deserialize_flexible")]
    pub start: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_flexible")]
    pub end: DateTime<Utc>,
    pub preference: String,
    #[validate(length(max = 4000))]
    pub note: Option<String>,
    #[validate(url)]
    pub meeting_link: Option<String>,
}
