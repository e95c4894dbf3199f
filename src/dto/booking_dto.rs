use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::time::{deserialize_flexible, deserialize_flexible_opt};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingPayload {
    #[validate(length(min = 1, max = 120))]
    pub namespace: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[serde(deserialize_with = "deserialize_flexible")]
    pub start: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_flexible")]
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingListQuery {
    pub namespace: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_opt")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_flexible_opt")]
    pub to: Option<DateTime<Utc>>,
}
