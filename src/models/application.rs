use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::ParseEnumError;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Submitted,
    Reviewed,
    StaffApproved,
    StaffRejected,
    InterviewQueued,
    InterviewScheduled,
    PendingFinalDecision,
    FinalInterviewQueued,
    FinalInterviewScheduled,
    Hired,
    NotHired,
    Onboarding,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 12] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::Reviewed,
        ApplicationStatus::StaffApproved,
        ApplicationStatus::StaffRejected,
        ApplicationStatus::InterviewQueued,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::PendingFinalDecision,
        ApplicationStatus::FinalInterviewQueued,
        ApplicationStatus::FinalInterviewScheduled,
        ApplicationStatus::Hired,
        ApplicationStatus::NotHired,
        ApplicationStatus::Onboarding,
    ];

    /// Statuses an application must be in before it can be archived.
    pub const ARCHIVABLE: [ApplicationStatus; 3] = [
        ApplicationStatus::Hired,
        ApplicationStatus::NotHired,
        ApplicationStatus::StaffRejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::Reviewed => "REVIEWED",
            ApplicationStatus::StaffApproved => "STAFF_APPROVED",
            ApplicationStatus::StaffRejected => "STAFF_REJECTED",
            ApplicationStatus::InterviewQueued => "INTERVIEW_QUEUED",
            ApplicationStatus::InterviewScheduled => "INTERVIEW_SCHEDULED",
            ApplicationStatus::PendingFinalDecision => "PENDING_FINAL_DECISION",
            ApplicationStatus::FinalInterviewQueued => "FINAL_INTERVIEW_QUEUED",
            ApplicationStatus::FinalInterviewScheduled => "FINAL_INTERVIEW_SCHEDULED",
            ApplicationStatus::Hired => "HIRED",
            ApplicationStatus::NotHired => "NOT_HIRED",
            ApplicationStatus::Onboarding => "ONBOARDING",
        }
    }

    pub fn is_archivable(self) -> bool {
        Self::ARCHIVABLE.contains(&self)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseEnumError::new("application status", s))
    }
}

impl TryFrom<String> for ApplicationStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewType {
    Technical,
    Final,
    Onboarding,
}

impl InterviewType {
    pub fn as_str(self) -> &'static str {
        match self {
            InterviewType::Technical => "technical",
            InterviewType::Final => "final",
            InterviewType::Onboarding => "onboarding",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InterviewType::Technical => "Technical interview",
            InterviewType::Final => "Final interview",
            InterviewType::Onboarding => "Onboarding",
        }
    }
}

impl fmt::Display for InterviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "technical" => Ok(InterviewType::Technical),
            "final" => Ok(InterviewType::Final),
            "onboarding" => Ok(InterviewType::Onboarding),
            _ => Err(ParseEnumError::new("interview type", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingPreference {
    Online,
    Offline,
}

impl MeetingPreference {
    pub fn as_str(self) -> &'static str {
        match self {
            MeetingPreference::Online => "online",
            MeetingPreference::Offline => "offline",
        }
    }
}

impl FromStr for MeetingPreference {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(MeetingPreference::Online),
            "offline" => Ok(MeetingPreference::Offline),
            _ => Err(ParseEnumError::new("meeting preference", s)),
        }
    }
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Slot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidSlot(format!(
                "slot start {} must be before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Interview booking details for the application's current stage.
///
/// Replaced wholesale when a new stage is scheduled, so fields from an earlier
/// stage never survive into the next one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookingMetadata {
    #[serde(default)]
    pub revision: i32,
    pub scheduled_by: Option<i64>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub interview_type: Option<InterviewType>,
    pub meeting_preference: Option<MeetingPreference>,
    pub slot: Option<Slot>,
    pub meeting_link: Option<String>,
    pub hr_note: Option<String>,
    pub feedback: Option<String>,
}

pub struct StageBooking {
    pub scheduled_by: i64,
    pub scheduled_at: DateTime<Utc>,
    pub interview_type: InterviewType,
    pub meeting_preference: MeetingPreference,
    pub slot: Slot,
    pub meeting_link: Option<String>,
    pub hr_note: Option<String>,
}

impl BookingMetadata {
    /// Builds the record for a newly scheduled stage. Only the reviewer
    /// feedback is carried over from the previous record.
    pub fn for_stage(previous: Option<&BookingMetadata>, stage: StageBooking) -> Self {
        Self {
            revision: previous.map(|p| p.revision).unwrap_or(0) + 1,
            scheduled_by: Some(stage.scheduled_by),
            scheduled_at: Some(stage.scheduled_at),
            interview_type: Some(stage.interview_type),
            meeting_preference: Some(stage.meeting_preference),
            slot: Some(stage.slot),
            meeting_link: stage.meeting_link,
            hr_note: stage.hr_note,
            feedback: previous.and_then(|p| p.feedback.clone()),
        }
    }

    /// Drops every slot-related field once the interview is over.
    pub fn cleared_for_decision(&self) -> Self {
        Self {
            revision: self.revision + 1,
            hr_note: self.hr_note.clone(),
            feedback: self.feedback.clone(),
            ..Self::default()
        }
    }

    pub fn apply_patch(&mut self, patch: &BookingMetadataPatch) {
        if let Some(link) = &patch.meeting_link {
            self.meeting_link = Some(link.clone());
        }
        if let Some(note) = &patch.hr_note {
            self.hr_note = Some(note.clone());
        }
        if let Some(feedback) = &patch.feedback {
            self.feedback = Some(feedback.clone());
        }
        self.revision += 1;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookingMetadataPatch {
    #[validate(url)]
    pub meeting_link: Option<String>,
    #[validate(length(max = 4000))]
    pub hr_note: Option<String>,
    #[validate(length(max = 10000))]
    pub feedback: Option<String>,
}

impl BookingMetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.meeting_link.is_none() && self.hr_note.is_none() && self.feedback.is_none()
    }
}

pub const APPLICATION_COLUMNS: &str = "id, position_id, full_name, email, qualification, \
    cv_object_key, status, is_archived, similarity_score, passed_hard_gate, \
    qualitative_assessment, requirement_snapshot, booking_metadata, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub position_id: i64,
    pub full_name: String,
    pub email: String,
    pub qualification: Option<String>,
    pub cv_object_key: String,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub is_archived: bool,
    pub similarity_score: Option<f64>,
    pub passed_hard_gate: Option<bool>,
    pub qualitative_assessment: Option<JsonValue>,
    pub requirement_snapshot: Option<JsonValue>,
    pub booking_metadata: Option<Json<BookingMetadata>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn metadata(&self) -> Option<&BookingMetadata> {
        self.booking_metadata.as_ref().map(|m| &m.0)
    }
}
