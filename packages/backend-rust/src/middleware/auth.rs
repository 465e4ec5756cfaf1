use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::{extract_token, verify_jwt, AuthError, AuthUser};
use crate::db::operations::progress;
use crate::response::AppError;
use crate::state::AppState;

/// Resolves the bearer token to a live account and attaches [`AuthUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_token(req.headers());

    match authenticate(&state, token).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

async fn authenticate(state: &AppState, token: Option<String>) -> Result<AuthUser, AppError> {
    let token = token.ok_or(AuthError::MissingToken)?;
    let secret = state
        .config()
        .jwt_secret
        .as_deref()
        .ok_or(AuthError::MissingSecret)?;
    let claims = verify_jwt(&token, secret)?;

    let mut conn = state.db().pool().acquire().await?;
    if !progress::user_exists(&mut conn, &claims.user_id).await? {
        return Err(AppError::unauthorized("User not found"));
    }

    Ok(AuthUser { id: claims.user_id })
}
