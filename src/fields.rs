use serde_json::{Map, Value};

use crate::error::AppError;

/// Copies only the allow-listed keys out of client input. Null values count
/// as absent. Nothing outside the list can reach a persistence write.
pub fn filter_allowed(input: &Map<String, Value>, allowed: &[&str]) -> Map<String, Value> {
    let mut filtered = Map::new();
    for &field in allowed {
        match input.get(field) {
            None | Some(Value::Null) => {}
            Some(value) => {
                filtered.insert(field.to_string(), value.clone());
            }
        }
    }
    filtered
}

/// Deep-copies client input minus the deny-listed keys.
pub fn strip_denied(input: &Map<String, Value>, denied: &[&str]) -> Map<String, Value> {
    input
        .iter()
        .filter(|(key, value)| !denied.contains(&key.as_str()) && !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

pub fn as_object(payload: Value) -> Result<Map<String, Value>, AppError> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Validation(
            "Invalid input data. Expected a JSON object.".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn allow_list_drops_everything_else() {
        let input = body(json!({
            "username": "jo",
            "email": "jo@example.com",
            "role": "admin",
            "active": false
        }));
        let filtered = filter_allowed(&input, &["username", "email"]);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.get("role").is_none());
        assert!(filtered.get("active").is_none());
    }

    #[test]
    fn allow_list_skips_null_and_missing() {
        let input = body(json!({ "username": null }));
        let filtered = filter_allowed(&input, &["username", "email"]);
        assert!(filtered.is_empty());
    }

    #[test]
    fn deny_list_keeps_the_rest() {
        let input = body(json!({
            "username": "jo",
            "role": "admin",
            "passwordChangedAt": "2024-01-01"
        }));
        let filtered = strip_denied(&input, &["role", "passwordChangedAt"]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered["username"], "jo");
    }

    #[test]
    fn deny_only_payload_filters_to_empty() {
        let input = body(json!({ "role": "admin", "active": false }));
        let filtered = strip_denied(&input, &["role", "active"]);
        assert!(filtered.is_empty());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = as_object(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
