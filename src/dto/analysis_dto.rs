use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

/// Body of the scorer's asynchronous callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    pub similarity_score: f64,
    pub passed_hard_gate: bool,
    #[serde(default)]
    pub qualitative_assessment: Option<JsonValue>,
    #[serde(default)]
    pub requirement_snapshot: Option<JsonValue>,
}

impl AnalysisPayload {
    pub fn from_json(value: JsonValue) -> Result<Self> {
        // serde also accepts a positional array for structs.
        if !value.is_object() {
            return Err(Error::BadRequest(
                "Malformed analysis payload: expected a JSON object".to_string(),
            ));
        }
        let payload: AnalysisPayload = serde_json::from_value(value)
            .map_err(|e| Error::BadRequest(format!("Malformed analysis payload: {}", e)))?;
        if !payload.similarity_score.is_finite() {
            return Err(Error::BadRequest(
                "Malformed analysis payload: similarityScore must be finite".to_string(),
            ));
        }
        Ok(payload)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisAck {
    pub accepted: bool,
}
