use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use validator::Validate;

use crate::error::{Error, Result};

pub const MAX_BULK_IDS: usize = 500;

/// Decodes a JSON body and runs its validator rules; every failure is a 400.
pub fn parse_body<T>(body: JsonValue) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let value: T = serde_json::from_value(body)
        .map_err(|e| Error::BadRequest(format!("Invalid request body: {}", e)))?;
    value.validate()?;
    Ok(value)
}

/// Deduplicates bulk ids, keeping first-seen order.
pub fn normalize_ids(ids: &[i64]) -> Result<Vec<i64>> {
    if ids.is_empty() {
        return Err(Error::BadRequest("ids must not be empty".to_string()));
    }
    let mut seen = std::collections::HashSet::new();
    let unique: Vec<i64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if unique.len() > MAX_BULK_IDS {
        return Err(Error::BadRequest(format!(
            "at most {} ids may be processed at once",
            MAX_BULK_IDS
        )));
    }
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::application_dto::SubmitApplicationPayload;
    use serde_json::json;

    #[test]
    fn normalize_ids_dedupes_and_rejects_empty() {
        assert_eq!(normalize_ids(&[3, 1, 3, 2, 1]).unwrap(), vec![3, 1, 2]);
        assert!(matches!(normalize_ids(&[]), Err(Error::BadRequest(_))));
        let too_many: Vec<i64> = (0..(MAX_BULK_IDS as i64 + 1)).collect();
        assert!(normalize_ids(&too_many).is_err());
    }

    #[test]
    fn parse_body_maps_type_and_rule_errors() {
        let ok: SubmitApplicationPayload = parse_body(json!({
            "fullName": "Ada Lovelace",
            "email": "ada@example.com",
            "positionId": 1,
            "agreement": true,
            "cvObjectKey": "cv/ada.pdf"
        }))
        .unwrap();
        assert_eq!(ok.full_name, "Ada Lovelace");

        let wrong_type = parse_body::<SubmitApplicationPayload>(json!({
            "fullName": "Ada", "email": "ada@example.com", "positionId": "one",
            "agreement": true, "cvObjectKey": "k"
        }));
        assert!(matches!(wrong_type, Err(Error::BadRequest(_))));

        let bad_email = parse_body::<SubmitApplicationPayload>(json!({
            "fullName": "Ada", "email": "not-an-email", "positionId": 1,
            "agreement": true, "cvObjectKey": "k"
        }));
        assert!(matches!(bad_email, Err(Error::Validation(_))));
    }
}
