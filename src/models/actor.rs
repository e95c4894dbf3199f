use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    HeadHr,
    StaffHr,
    Manager,
}

impl ActorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ActorRole::HeadHr => "head_hr",
            ActorRole::StaffHr => "staff_hr",
            ActorRole::Manager => "manager",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "head_hr" => Ok(ActorRole::HeadHr),
            "staff_hr" => Ok(ActorRole::StaffHr),
            "manager" => Ok(ActorRole::Manager),
            _ => Err(ParseEnumError::new("actor role", s)),
        }
    }
}

/// The authenticated reviewer behind a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub role: ActorRole,
}

impl Actor {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Who conducts an interview stage. `id` is `None` for the placeholder used
/// when no interviewer could be resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interviewer {
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
}

impl Interviewer {
    pub const PLACEHOLDER_NAME: &'static str = "Unassigned interviewer";

    pub fn placeholder() -> Self {
        Self {
            id: None,
            name: Self::PLACEHOLDER_NAME.to_string(),
            email: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.is_none()
    }
}

impl From<UserRecord> for Interviewer {
    fn from(user: UserRecord) -> Self {
        Self {
            id: Some(user.id),
            name: user.name,
            email: Some(user.email),
        }
    }
}

impl From<&Actor> for Interviewer {
    fn from(actor: &Actor) -> Self {
        Self {
            id: Some(actor.id),
            name: actor.display_name().to_string(),
            email: Some(actor.email.clone()),
        }
    }
}
