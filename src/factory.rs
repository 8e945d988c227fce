use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{error::AppError, fields, response::ApiResponse, state::AppState};

/// Abstract document collection the generic handlers operate against.
/// Implementations own their validation and any projection or relationship
/// expansion their queries need.
#[async_trait]
pub trait Resource: Serialize + Sized + Send + Sync + 'static {
    const NAME: &'static str;

    /// Fields an update may never write, checked before any domain logic.
    const DENIED_UPDATE_FIELDS: &'static [&'static str];

    async fn find_all(state: &AppState) -> Result<Vec<Self>, AppError>;
    async fn find(state: &AppState, id: Uuid) -> Result<Option<Self>, AppError>;
    async fn insert(state: &AppState, payload: Map<String, Value>) -> Result<Self, AppError>;
    async fn update(
        state: &AppState,
        id: Uuid,
        payload: Map<String, Value>,
    ) -> Result<Option<Self>, AppError>;
    async fn delete(state: &AppState, id: Uuid) -> Result<bool, AppError>;
}

fn not_found() -> AppError {
    AppError::NotFound("There is no document found with that ID.".into())
}

// A malformed identifier reads the same as a missing record: the resource
// addressed by that path does not exist.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("Invalid id: {raw}")))
}

#[instrument(skip(state))]
pub async fn list_all<R: Resource>(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<R>>>, AppError> {
    let docs = R::find_all(&state).await?;
    debug!(resource = R::NAME, total = docs.len(), "listed");
    let total = docs.len();
    Ok(Json(ApiResponse::success(docs).with_total(total)))
}

#[instrument(skip(state, payload))]
pub async fn create_one<R: Resource>(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<R>>), AppError> {
    let payload = fields::as_object(payload)?;
    let doc = R::insert(&state, payload).await?;
    debug!(resource = R::NAME, "created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(doc))))
}

#[instrument(skip(state))]
pub async fn get_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<R>>, AppError> {
    let id = parse_id(&id)?;
    let doc = R::find(&state, id).await?.ok_or_else(not_found)?;
    Ok(Json(ApiResponse::success(doc)))
}

#[instrument(skip(state, payload))]
pub async fn update_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<ApiResponse<R>>, AppError> {
    let id = parse_id(&id)?;
    let payload = fields::as_object(payload)?;
    let filtered = fields::strip_denied(&payload, R::DENIED_UPDATE_FIELDS);
    if filtered.is_empty() {
        return Err(AppError::NoUpdatableFields);
    }
    let doc = R::update(&state, id, filtered).await?.ok_or_else(not_found)?;
    debug!(resource = R::NAME, %id, "updated");
    Ok(Json(ApiResponse::success(doc)))
}

#[instrument(skip(state))]
pub async fn delete_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    if !R::delete(&state, id).await? {
        return Err(not_found());
    }
    debug!(resource = R::NAME, %id, "deleted");
    Ok(StatusCode::NO_CONTENT)
}
