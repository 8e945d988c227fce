use axum::{
    extract::{FromRef, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{
    auth::{dto::LoginRequest, jwt::JwtKeys, password},
    error::AppError,
    factory::Resource,
    fields,
    response::ApiResponse,
    state::AppState,
    users::model::{self, User},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/signup", post(signup))
        .route("/users/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Response, AppError> {
    let body = fields::as_object(payload)?;
    // Only the signup allow-list may reach the insert; role in particular
    // always takes its schema default.
    let filtered = fields::filter_allowed(&body, model::SIGNUP_FIELDS);
    let user = <User as Resource>::insert(&state, filtered).await?;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    send_token(&state, user, StatusCode::CREATED)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    // Missing fields, unknown email and wrong password all answer with the
    // same 401 so nothing about account existence leaks.
    let (email, plain) = match (payload.email, payload.password) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
        _ => {
            warn!("login without email or password");
            return Err(AppError::InvalidCredentials);
        }
    };

    let email = model::normalize_email(&email);
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let hash = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(AppError::Internal)?;
    if !ok {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    send_token(&state, user, StatusCode::OK)
}

/// Issues a token for the user and delivers it both in the response body and
/// as an http-only cookie.
fn send_token(state: &AppState, user: User, status: StatusCode) -> Result<Response, AppError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user.id).map_err(AppError::Internal)?;

    let cookie = keys.auth_cookie(&token, state.config.env.is_production());
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|e| AppError::Internal(e.into()))?,
    );

    let body = ApiResponse::success(user).with_token(token);
    Ok((status, headers, Json(body)).into_response())
}
