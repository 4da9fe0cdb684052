use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, session::Sessions, state::AppState};

/// Session-cache key marking an admin session.
pub const ADMIN_SESSION_KEY: &str = "isLoggedIn";

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, AppError> {
    if credentials.email != state.config.admin_email
        || credentials.password != state.config.admin_password
    {
        return Err(AppError::Unauthorized);
    }

    let token = Uuid::new_v4().to_string();
    state.sessions.set(&token, ADMIN_SESSION_KEY, "true");

    info!("Admin logged in");
    Ok(Json(LoginResponse { token }))
}

pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    state.sessions.end_session(token);

    info!("Admin logged out");
    Ok(StatusCode::NO_CONTENT)
}

pub fn require_admin(sessions: &Sessions, headers: &HeaderMap) -> Result<(), AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;

    match sessions.get(token, ADMIN_SESSION_KEY) {
        Some(_) => Ok(()),
        None => Err(AppError::Unauthorized),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        headers
    }

    #[test]
    fn admin_guard_accepts_live_session() {
        let sessions = Sessions::new(Duration::from_secs(60));
        sessions.set("tok", ADMIN_SESSION_KEY, "true");

        assert!(require_admin(&sessions, &headers_with("tok")).is_ok());
    }

    #[test]
    fn admin_guard_rejects_unknown_token_and_missing_header() {
        let sessions = Sessions::new(Duration::from_secs(60));

        assert!(require_admin(&sessions, &headers_with("nope")).is_err());
        assert!(require_admin(&sessions, &HeaderMap::new()).is_err());
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "tok".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&headers_with("tok")), Some("tok"));
    }
}
