//! Authentication middleware and session endpoints

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
    Extension, Json,
};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::sessions::{self, Identity};
use crate::AppState;

/// Authenticated user stored in request extensions
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

/// The bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Result<String> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization format".to_string()))?;

    Ok(token.to_string())
}

/// Session middleware - resolves the bearer token to a user
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(request.headers())?;

    let user = sessions::resolve(state.store.as_ref(), &token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".to_string()))?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user, token });

    Ok(next.run(request).await)
}

/// Admin middleware - compares the bearer token with the configured admin token
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let expected = state
        .config
        .admin_token
        .as_deref()
        .ok_or_else(|| ApiError::Unauthorized("Admin access is disabled".to_string()))?;

    let token = bearer_token(request.headers())?;
    if token != expected {
        tracing::warn!(path = %request.uri().path(), "Rejected admin request");
        return Err(ApiError::Unauthorized("Invalid admin token".to_string()));
    }

    Ok(next.run(request).await)
}

/// POST /api/auth/dev-login
pub async fn dev_login(
    State(state): State<AppState>,
    payload: Option<Json<DevLoginRequest>>,
) -> Result<Json<LoginResponse>> {
    if !state.config.dev_mode {
        return Err(ApiError::Forbidden("Dev login is disabled".to_string()));
    }

    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let identity = Identity {
        email: request
            .email
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| state.config.dev_email.clone()),
        name: request.name.unwrap_or_else(|| "Dev User".to_string()),
        picture: None,
    };

    let issued = sessions::login(
        state.store.as_ref(),
        identity,
        state.config.dev_session_ttl,
        "dev_session_",
    )
    .await?;

    Ok(Json(LoginResponse {
        session_token: issued.token,
        expires_at: issued.expires_at,
        user: UserProfile::from(&issued.user),
    }))
}

/// GET /api/auth/me
pub async fn me(Extension(auth): Extension<AuthenticatedUser>) -> Json<UserProfile> {
    Json(UserProfile::from(&auth.user))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>> {
    let token = bearer_token(&headers)?;
    let logged_out = sessions::logout(state.store.as_ref(), &token).await?;
    Ok(Json(LogoutResponse { logged_out }))
}
