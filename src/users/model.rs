use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

pub const MAX_USERNAME_LEN: usize = 15;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Fields a client may supply at signup. Everything else is dropped before
/// the record is built.
pub const SIGNUP_FIELDS: &[&str] = &["username", "email", "password", "passwordConfirm"];

/// Fields a user may change on their own profile.
pub const SELF_UPDATABLE_FIELDS: &[&str] = &["username", "email", "photo"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// User record. Only `id`, `username`, `email`, `photo` and `role` are ever
/// serialized; the hash, the soft-delete flag and the password metadata stay
/// internal on every path.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub photo: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub active: bool,
    #[serde(skip_serializing)]
    pub password_changed_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub created_at: OffsetDateTime,
}

/// Validated signup input, ready for hashing and insertion.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Validated self/admin profile patch. `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.photo.is_none()
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn string_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

fn aggregate(problems: Vec<&str>) -> AppError {
    AppError::Validation(format!("Invalid input data. {}", problems.join(" ")))
}

/// Before-insert hook: checks the schema rules from §signup, normalizes the
/// email and aggregates every violation into one message.
pub fn validate_new(fields: &Map<String, Value>) -> Result<NewUser, AppError> {
    let mut problems = Vec::new();

    let username = string_field(fields, "username").map(str::trim);
    match username {
        None | Some("") => problems.push("Username is required!"),
        Some(u) if u.chars().count() > MAX_USERNAME_LEN => {
            problems.push("Username cannot be longer than 15 characters!")
        }
        _ => {}
    }

    let email = string_field(fields, "email").map(normalize_email);
    match email.as_deref() {
        None | Some("") => problems.push("Email is required!"),
        Some(e) if !is_valid_email(e) => problems.push("Invalid email!"),
        _ => {}
    }

    let password = string_field(fields, "password");
    match password {
        None | Some("") => problems.push("Password is required!"),
        Some(p) if p.chars().count() < MIN_PASSWORD_LEN => {
            problems.push("Password must be at least 8 characters!")
        }
        _ => {}
    }

    match string_field(fields, "passwordConfirm") {
        None | Some("") => problems.push("Please confirm your password!"),
        Some(confirm) => {
            if password.is_some_and(|p| p != confirm) {
                problems.push("Password confirmation does not match");
            }
        }
    }

    if !problems.is_empty() {
        return Err(aggregate(problems));
    }

    Ok(NewUser {
        username: username.unwrap_or_default().to_string(),
        email: email.unwrap_or_default(),
        password: password.unwrap_or_default().to_string(),
    })
}

/// Before-update hook: re-runs the schema rules on whichever updatable
/// fields the (already filtered) payload carries.
pub fn validate_patch(fields: &Map<String, Value>) -> Result<UserPatch, AppError> {
    let mut problems = Vec::new();
    let mut patch = UserPatch::default();

    if fields.contains_key("username") {
        match string_field(fields, "username").map(str::trim) {
            None | Some("") => problems.push("Username is required!"),
            Some(u) if u.chars().count() > MAX_USERNAME_LEN => {
                problems.push("Username cannot be longer than 15 characters!")
            }
            Some(u) => patch.username = Some(u.to_string()),
        }
    }

    if fields.contains_key("email") {
        let email = string_field(fields, "email")
            .map(normalize_email)
            .filter(|e| !e.is_empty());
        match email {
            None => problems.push("Email is required!"),
            Some(e) if !is_valid_email(&e) => problems.push("Invalid email!"),
            Some(e) => patch.email = Some(e),
        }
    }

    if fields.contains_key("photo") {
        match string_field(fields, "photo") {
            None | Some("") => problems.push("Invalid photo!"),
            Some(p) => patch.photo = Some(p.to_string()),
        }
    }

    if !problems.is_empty() {
        return Err(aggregate(problems));
    }
    Ok(patch)
}
