use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth::{
    extract_token, hash_password, sign_jwt_for_user, verify_jwt, verify_password, AuthError,
};
use crate::db::operations::{is_unique_violation, user as user_ops};
use crate::models::{Category, CefrLevel, UserView};
use crate::response::{AppError, FieldError};
use crate::state::AppState;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 20;
pub const PASSWORD_MIN_CHARS: usize = 6;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify", get(verify))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    date_of_birth: Option<String>,
    cefr_level: Option<String>,
    #[serde(default)]
    fields_of_interest: Vec<String>,
    #[serde(alias = "consentAI")]
    ai_data_consent: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct AuthResponse {
    success: bool,
    message: &'static str,
    token: String,
    user: UserView,
}

#[derive(Serialize)]
struct VerifyResponse {
    success: bool,
    user: UserView,
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let mut errors = Vec::new();

    let name = validate_name(payload.name.as_deref(), &mut errors);
    let email = validate_email(payload.email.as_deref(), &mut errors);
    let password = payload.password.unwrap_or_default();
    if password.chars().count() < PASSWORD_MIN_CHARS {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 6 characters",
        ));
    }

    let date_of_birth = match payload.date_of_birth.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date.format("%Y-%m-%d").to_string()),
            Err(_) => {
                errors.push(FieldError::new(
                    "dateOfBirth",
                    "Date of birth must be a valid date (YYYY-MM-DD)",
                ));
                None
            }
        },
    };

    let cefr_level = parse_level(payload.cefr_level.as_deref(), &mut errors).unwrap_or_default();
    let interests = parse_interests(&payload.fields_of_interest, &mut errors);

    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let secret = jwt_secret(&state)?;
    let cost = state.config().bcrypt_cost;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|err| AppError::internal(format!("hash task failed: {err}")))?
        .map_err(|err| AppError::internal(err.to_string()))?;

    let new_user = user_ops::NewUser {
        name,
        email,
        password_hash,
        date_of_birth,
        cefr_level,
        interests,
        ai_data_consent: payload.ai_data_consent.unwrap_or(false),
    };

    let user = match user_ops::insert_user(state.db().pool(), &new_user).await {
        Ok(user) => user,
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::conflict("User already exists with this email"));
        }
        Err(err) => return Err(err.into()),
    };

    let token = issue_token(&user.id, secret, &state.config().jwt_expires_in)?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "User registered successfully",
            token,
            user: UserView::from(&user),
        }),
    )
        .into_response())
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let mut errors = Vec::new();
    let email = validate_email(payload.email.as_deref(), &mut errors);
    let password = payload.password.unwrap_or_default();
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let secret = jwt_secret(&state)?;
    let Some(user) = user_ops::get_user_by_email(state.db().pool(), &email).await? else {
        return Err(AppError::unauthorized("Invalid credentials"));
    };

    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|err| AppError::internal(format!("verify task failed: {err}")))?;
    if !matches {
        tracing::debug!(user_id = %user.id, "login rejected");
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let token = issue_token(&user.id, secret, &state.config().jwt_expires_in)?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful",
        token,
        user: UserView::from(&user),
    })
    .into_response())
}

async fn verify(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let token = extract_token(&headers).ok_or(AuthError::MissingToken)?;
    let secret = jwt_secret(&state)?;
    let claims = verify_jwt(&token, secret)?;

    let user = user_ops::get_user_by_id(state.db().pool(), &claims.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    Ok(Json(VerifyResponse {
        success: true,
        user: UserView::from(&user),
    })
    .into_response())
}

fn jwt_secret(state: &AppState) -> Result<&str, AppError> {
    state.config().jwt_secret.as_deref().ok_or_else(|| {
        tracing::error!("JWT_SECRET is not configured");
        AppError::internal("JWT_SECRET is not configured")
    })
}

fn issue_token(user_id: &str, secret: &str, expires_in: &str) -> Result<String, AppError> {
    sign_jwt_for_user(user_id, secret, expires_in).map_err(|err| {
        tracing::error!(error = %err, "token signing failed");
        AppError::internal(err.to_string())
    })
}

pub(crate) fn validate_name(raw: Option<&str>, errors: &mut Vec<FieldError>) -> String {
    let name = raw.unwrap_or_default().trim().to_string();
    let len = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        errors.push(FieldError::new(
            "name",
            "Name must be between 2 and 20 characters",
        ));
    }
    name
}

pub(crate) fn validate_email(raw: Option<&str>, errors: &mut Vec<FieldError>) -> String {
    let email = raw.unwrap_or_default().trim().to_lowercase();
    if !is_valid_email(&email) {
        errors.push(FieldError::new("email", "Please provide a valid email"));
    }
    email
}

pub(crate) fn parse_level(raw: Option<&str>, errors: &mut Vec<FieldError>) -> Option<CefrLevel> {
    let raw = raw.map(str::trim).filter(|v| !v.is_empty())?;
    let level = CefrLevel::parse(raw);
    if level.is_none() {
        errors.push(FieldError::new("cefrLevel", "CEFR level must be B2, C1 or C2"));
    }
    level
}

pub(crate) fn parse_interests(raw: &[String], errors: &mut Vec<FieldError>) -> Vec<Category> {
    let mut interests = Vec::with_capacity(raw.len());
    for name in raw {
        match Category::parse(name.trim()) {
            Some(category) => interests.push(category),
            None => {
                errors.push(FieldError::new(
                    "fieldsOfInterest",
                    format!("Invalid field of interest: {name}"),
                ));
            }
        }
    }
    interests
}

fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.contains(' ') {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_is_checked() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example@x.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }

    #[test]
    fn name_length_counts_characters() {
        let mut errors = Vec::new();
        assert_eq!(validate_name(Some("  Zoë "), &mut errors), "Zoë");
        assert!(errors.is_empty());

        validate_name(Some("A"), &mut errors);
        validate_name(Some(&"x".repeat(21)), &mut errors);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn unknown_interest_is_reported() {
        let mut errors = Vec::new();
        let raw = vec!["Science".to_string(), "Gardening".to_string()];
        assert_eq!(parse_interests(&raw, &mut errors), vec![Category::Science]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "fieldsOfInterest");
    }

    #[test]
    fn missing_level_is_not_an_error() {
        let mut errors = Vec::new();
        assert_eq!(parse_level(None, &mut errors), None);
        assert_eq!(parse_level(Some("C1"), &mut errors), Some(CefrLevel::C1));
        assert_eq!(parse_level(Some("A1"), &mut errors), None);
        assert_eq!(errors.len(), 1);
    }
}
