use serde::Serialize;

/// Uniform success envelope. `totalResults` only appears on list responses,
/// `token` only on authentication responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(rename = "totalResults", skip_serializing_if = "Option::is_none")]
    pub total_results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            total_results: None,
            token: None,
            data,
        }
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total_results = Some(total);
        self
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_are_omitted() {
        let json = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert!(json.get("totalResults").is_none());
        assert!(json.get("token").is_none());
    }

    #[test]
    fn list_envelope_carries_total_results() {
        let json = serde_json::to_value(ApiResponse::success(vec!["a"]).with_total(1)).unwrap();
        assert_eq!(json["totalResults"], 1);
    }

    #[test]
    fn auth_envelope_carries_token() {
        let json = serde_json::to_value(
            ApiResponse::success(serde_json::json!({"id": 1})).with_token("abc".into()),
        )
        .unwrap();
        assert_eq!(json["token"], "abc");
    }
}
