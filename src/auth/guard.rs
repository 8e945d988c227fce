use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use time::OffsetDateTime;
use tracing::warn;

use crate::{
    error::{AppError, AuthFailure},
    state::AppState,
    users::model::{Role, User},
};

use super::jwt::JwtKeys;

/// Pulls the candidate token out of a request: the `Authorization: Bearer`
/// header wins, the `jwt` cookie is the fallback.
pub(crate) fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
        {
            return Some(token.trim().to_string());
        }
    }
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| {
            raw.split(';')
                .map(str::trim)
                .find_map(|pair| pair.strip_prefix("jwt="))
                .map(str::to_string)
        })
}

/// True when the password changed strictly after the token was issued,
/// which invalidates the token without any revocation list.
pub(crate) fn password_changed_after(
    changed_at: Option<OffsetDateTime>,
    token_iat: usize,
) -> bool {
    changed_at
        .map(|t| t.unix_timestamp() > token_iat as i64)
        .unwrap_or(false)
}

async fn resolve_principal(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = extract_token(headers).ok_or(AuthFailure::MissingToken)?;
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify(&token)?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(AuthFailure::UserGone)?;

    if password_changed_after(user.password_changed_at, claims.iat) {
        warn!(user_id = %user.id, "token predates password change");
        return Err(AuthFailure::StaleCredentials.into());
    }

    Ok(user)
}

/// Authentication middleware. Resolves the principal and attaches it to the
/// request for downstream handlers and role checks.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_principal(&state, req.headers()).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Stateless role check against a fixed set of permitted roles.
pub fn role_gate(user: &User, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        warn!(user_id = %user.id, role = ?user.role, "role not permitted");
        Err(AppError::Forbidden)
    }
}

/// Restricts a route subtree to admins. Must be layered after
/// [`authenticate`]; it never resolves identity on its own.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<User>()
        .ok_or(AuthFailure::MissingToken)?;
    role_gate(user, &[Role::Admin])?;
    Ok(next.run(req).await)
}

/// The authenticated principal, placed in request extensions by
/// [`authenticate`].
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AuthFailure::MissingToken.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use time::Duration;
    use uuid::Uuid;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_header_takes_precedence_over_cookie() {
        let map = headers(&[
            ("authorization", "Bearer header-token"),
            ("cookie", "jwt=cookie-token"),
        ]);
        assert_eq!(extract_token(&map).as_deref(), Some("header-token"));
    }

    #[test]
    fn jwt_cookie_is_found_among_others() {
        let map = headers(&[("cookie", "theme=dark; jwt=cookie-token; lang=en")]);
        assert_eq!(extract_token(&map).as_deref(), Some("cookie-token"));
    }

    #[test]
    fn no_token_yields_none() {
        assert!(extract_token(&HeaderMap::new()).is_none());
        let map = headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert!(extract_token(&map).is_none());
    }

    #[test]
    fn stale_check_is_strictly_after() {
        let issued = OffsetDateTime::now_utc();
        let iat = issued.unix_timestamp() as usize;

        // never changed
        assert!(!password_changed_after(None, iat));
        // changed before issuance
        assert!(!password_changed_after(Some(issued - Duration::hours(1)), iat));
        // changed in the same second: not stale
        assert!(!password_changed_after(Some(issued), iat));
        // changed after issuance: stale
        assert!(password_changed_after(Some(issued + Duration::seconds(1)), iat));
    }

    #[test]
    fn role_gate_checks_membership() {
        let user = User {
            id: Uuid::new_v4(),
            username: "jo".into(),
            email: "jo@example.com".into(),
            password_hash: "hash".into(),
            photo: "default.jpg".into(),
            role: Role::User,
            active: true,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: OffsetDateTime::now_utc(),
        };
        assert!(role_gate(&user, &[Role::User, Role::Admin]).is_ok());
        let err = role_gate(&user, &[Role::Admin]).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }
}
