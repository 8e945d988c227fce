use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::password,
    error::AppError,
    factory::Resource,
    fields,
    state::AppState,
    users::model::{self, NewUser, User, UserPatch},
};

// Every default query carries `active = TRUE`: soft-deleted users are
// invisible to reads, logins and token resolution alike.

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, photo, role, active,
                   password_changed_at, password_reset_token, password_reset_expires, created_at
            FROM users
            WHERE id = $1 AND active = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, photo, role, active,
                   password_changed_at, password_reset_token, password_reset_expires, created_at
            FROM users
            WHERE email = $1 AND active = TRUE
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn all(db: &PgPool) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, photo, role, active,
                   password_changed_at, password_reset_token, password_reset_expires, created_at
            FROM users
            WHERE active = TRUE
            ORDER BY created_at
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Inserts a validated, already-hashed user. Role and photo take their
    /// schema defaults; neither is client-suppliable.
    pub async fn create(db: &PgPool, new: &NewUser, password_hash: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, photo, role, active,
                      password_changed_at, password_reset_token, password_reset_expires, created_at
            "#,
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Atomic find-and-update returning the post-update record. Untouched
    /// columns keep their value via COALESCE, so concurrent patches to the
    /// same user are serialized by the single statement.
    pub async fn apply_patch(
        db: &PgPool,
        id: Uuid,
        patch: &UserPatch,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                photo = COALESCE($4, photo)
            WHERE id = $1 AND active = TRUE
            RETURNING id, username, email, password_hash, photo, role, active,
                      password_changed_at, password_reset_token, password_reset_expires, created_at
            "#,
        )
        .bind(id)
        .bind(patch.username.as_deref())
        .bind(patch.email.as_deref())
        .bind(patch.photo.as_deref())
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Soft delete: the record stays in storage but disappears from every
    /// default query and from authentication.
    pub async fn soft_delete(db: &PgPool, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET active = FALSE WHERE id = $1 AND active = TRUE")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn hard_delete(db: &PgPool, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Resource for User {
    const NAME: &'static str = "user";

    const DENIED_UPDATE_FIELDS: &'static [&'static str] = &[
        "password",
        "passwordConfirm",
        "role",
        "active",
        "passwordChangedAt",
        "passwordResetToken",
        "passwordResetExpires",
        "id",
        "createdAt",
    ];

    async fn find_all(state: &AppState) -> Result<Vec<Self>, AppError> {
        User::all(&state.db).await
    }

    async fn find(state: &AppState, id: Uuid) -> Result<Option<Self>, AppError> {
        User::find_by_id(&state.db, id).await
    }

    async fn insert(state: &AppState, payload: Map<String, Value>) -> Result<Self, AppError> {
        // The allow-list guards mass assignment on the admin create path the
        // same way it does at signup.
        let filtered = fields::filter_allowed(&payload, model::SIGNUP_FIELDS);
        let new = model::validate_new(&filtered)?;

        let cost = state.config.hash_cost;
        let plain = new.password.clone();
        let hash = tokio::task::spawn_blocking(move || password::hash_password(&plain, cost))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;

        User::create(&state.db, &new, &hash).await
    }

    async fn update(
        state: &AppState,
        id: Uuid,
        payload: Map<String, Value>,
    ) -> Result<Option<Self>, AppError> {
        let patch = model::validate_patch(&payload)?;
        User::apply_patch(&state.db, id, &patch).await
    }

    async fn delete(state: &AppState, id: Uuid) -> Result<bool, AppError> {
        User::hard_delete(&state.db, id).await
    }
}
