pub mod actor;
pub mod application;
pub mod application_event;
pub mod booking;
pub mod job_position;
pub mod notification;

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl From<ParseEnumError> for crate::error::Error {
    fn from(err: ParseEnumError) -> Self {
        crate::error::Error::BadRequest(err.to_string())
    }
}
