use serde::Deserialize;

/// Login body. Both fields are optional on purpose: a missing email or
/// password must surface as the generic credentials error, not a parse
/// failure.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}
