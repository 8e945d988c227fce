use axum::{extract::State, http::StatusCode, Json};
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::{
    auth::guard::CurrentUser,
    error::AppError,
    fields,
    response::ApiResponse,
    state::AppState,
    users::model::{self, User},
};

/// Self-service routes bind the target id to the principal, never to a
/// client-supplied identifier.

#[instrument(skip(user))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<ApiResponse<User>> {
    Json(ApiResponse::success(user))
}

pub(crate) fn reject_password_keys(body: &Map<String, Value>) -> Result<(), AppError> {
    if body.contains_key("password") || body.contains_key("passwordConfirm") {
        return Err(AppError::Validation(
            "This route is not for password updates. \
             Please use the update-password route instead."
                .into(),
        ));
    }
    Ok(())
}

#[instrument(skip(state, user, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<Value>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let body = fields::as_object(payload)?;
    reject_password_keys(&body)?;

    let filtered = fields::filter_allowed(&body, model::SELF_UPDATABLE_FIELDS);
    let patch = model::validate_patch(&filtered)?;

    let updated = User::apply_patch(&state.db, user.id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("There is no document found with that ID.".into()))?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(ApiResponse::success(updated)))
}

#[instrument(skip(state, user))]
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    User::soft_delete(&state.db, user.id).await?;
    info!(user_id = %user.id, "account deactivated");
    Ok(StatusCode::NO_CONTENT)
}
