use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::application::BookingMetadataPatch;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationPayload {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    pub position_id: i64,
    pub agreement: bool,
    #[validate(length(min = 1, max = 512))]
    pub cv_object_key: String,
    #[validate(length(max = 200))]
    pub qualification: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateApplicationPayload {
    pub status: Option<String>,
    #[validate(nested)]
    pub interview_notes_patch: Option<BookingMetadataPatch>,
}

impl UpdateApplicationPayload {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self
                .interview_notes_patch
                .as_ref()
                .map(|p| p.is_empty())
                .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationListQuery {
    pub status: Option<String>,
}
