use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const POSITION_OPEN: &str = "open";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobPosition {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub requesting_manager_id: Option<i64>,
    pub calendar_namespace: Option<String>,
}

impl JobPosition {
    pub fn accepts_applications(&self) -> bool {
        self.status.eq_ignore_ascii_case(POSITION_OPEN)
    }
}
