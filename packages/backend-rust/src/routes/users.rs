use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::operations::{is_unique_violation, user as user_ops};
use crate::models::{
    CompletedMedia, LearnedWord, LevelProgress, MediaType, NewLearnedWord, ProgressCounters, User,
    UserView,
};
use crate::response::{AppError, FieldError};
use crate::routes::auth::{parse_interests, parse_level, validate_email, validate_name};
use crate::services::progress::{self, ProgressError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .route("/progress/word-learned", post(add_learned_word))
        .route("/progress/media-completed", post(complete_media))
        .route("/learned-word", post(add_learned_word).get(list_learned_words))
        .route("/completed-media", get(list_completed_media))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    name: Option<String>,
    email: Option<String>,
    cefr_level: Option<String>,
    fields_of_interest: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LearnedWordRequest {
    word: Option<String>,
    definition: Option<String>,
    part_of_speech: Option<String>,
    example: Option<String>,
    pronunciation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteMediaRequest {
    media_id: Option<String>,
    media_type: Option<String>,
}

#[derive(Serialize)]
struct UserResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    user: UserView,
}

#[derive(Serialize)]
struct MessageResponse {
    success: bool,
    message: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressResponse {
    success: bool,
    message: &'static str,
    progress: ProgressCounters,
    level_progress: LevelProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    word: Option<LearnedWord>,
}

#[derive(Serialize)]
struct LearnedWordsResponse {
    success: bool,
    count: usize,
    words: Vec<LearnedWord>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletedMediaResponse {
    success: bool,
    count: usize,
    completed_media: Vec<CompletedMedia>,
}

pub(crate) async fn load_user(state: &AppState, auth: &AuthUser) -> Result<User, AppError> {
    user_ops::get_user_by_id(state.db().pool(), &auth.id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let user = load_user(&state, &auth).await?;
    Ok(Json(UserResponse {
        success: true,
        message: None,
        user: UserView::from(&user),
    })
    .into_response())
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let mut errors = Vec::new();

    let name = payload
        .name
        .as_deref()
        .map(|raw| validate_name(Some(raw), &mut errors));
    let email = payload
        .email
        .as_deref()
        .map(|raw| validate_email(Some(raw), &mut errors));
    let cefr_level = parse_level(payload.cefr_level.as_deref(), &mut errors);
    let interests = payload
        .fields_of_interest
        .as_deref()
        .map(|raw| parse_interests(raw, &mut errors));

    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let pool = state.db().pool();
    if let Some(email) = &email {
        if user_ops::email_taken_by_other(pool, email, &auth.id).await? {
            return Err(AppError::conflict("Email is already taken"));
        }
    }

    let update = user_ops::ProfileUpdate {
        name,
        email,
        cefr_level,
        interests,
    };
    match user_ops::update_profile(pool, &auth.id, &update).await {
        Ok(true) => {}
        Ok(false) => return Err(AppError::unauthorized("User not found")),
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::conflict("Email is already taken"));
        }
        Err(err) => return Err(err.into()),
    }

    let user = load_user(&state, &auth).await?;
    Ok(Json(UserResponse {
        success: true,
        message: Some("Profile updated successfully"),
        user: UserView::from(&user),
    })
    .into_response())
}

async fn delete_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response, AppError> {
    if !user_ops::delete_user(state.db().pool(), &auth.id).await? {
        return Err(AppError::unauthorized("User not found"));
    }
    tracing::info!(user_id = %auth.id, "account deleted");

    Ok(Json(MessageResponse {
        success: true,
        message: "Account deleted successfully",
    })
    .into_response())
}

async fn add_learned_word(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<LearnedWordRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let mut errors = Vec::new();
    let word = required(payload.word, "word", "Word is required", &mut errors);
    let definition = required(
        payload.definition,
        "definition",
        "Definition is required",
        &mut errors,
    );
    let part_of_speech = required(
        payload.part_of_speech,
        "partOfSpeech",
        "Part of speech is required",
        &mut errors,
    );
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let new_word = NewLearnedWord {
        word,
        definition,
        part_of_speech,
        example: optional(payload.example),
        pronunciation: optional(payload.pronunciation),
    };

    let outcome = progress::record_word_learned(state.db(), &auth.id, new_word)
        .await
        .map_err(progress_error)?;
    let user = load_user(&state, &auth).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProgressResponse {
            success: true,
            message: "Word added to learned list",
            progress: outcome.counters,
            level_progress: user.level_progress(),
            word: Some(outcome.word),
        }),
    )
        .into_response())
}

async fn complete_media(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<CompleteMediaRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let mut errors = Vec::new();
    let media_id = required(payload.media_id, "mediaId", "Media ID is required", &mut errors);
    let media_type = payload.media_type.as_deref().and_then(MediaType::parse);
    if media_type.is_none() {
        errors.push(FieldError::new(
            "mediaType",
            "Media type must be article or video",
        ));
    }
    let (Some(media_type), true) = (media_type, errors.is_empty()) else {
        return Err(AppError::validation(errors));
    };

    let counters = progress::record_media_completed(state.db(), &auth.id, &media_id, media_type)
        .await
        .map_err(progress_error)?;
    let user = load_user(&state, &auth).await?;

    Ok(Json(ProgressResponse {
        success: true,
        message: "Progress updated successfully",
        progress: counters,
        level_progress: user.level_progress(),
        word: None,
    })
    .into_response())
}

async fn list_learned_words(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let words = user_ops::list_learned_words(state.db().pool(), &auth.id).await?;
    Ok(Json(LearnedWordsResponse {
        success: true,
        count: words.len(),
        words,
    })
    .into_response())
}

async fn list_completed_media(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let completed_media = user_ops::list_completed_media(state.db().pool(), &auth.id).await?;
    Ok(Json(CompletedMediaResponse {
        success: true,
        count: completed_media.len(),
        completed_media,
    })
    .into_response())
}

fn progress_error(err: ProgressError) -> AppError {
    match err {
        ProgressError::WordAlreadyLearned => AppError::conflict("Word already learned"),
        ProgressError::MediaAlreadyCompleted => AppError::conflict("Media already completed"),
        ProgressError::UserNotFound => AppError::unauthorized("User not found"),
        ProgressError::Database(err) => err.into(),
    }
}

fn required(
    value: Option<String>,
    field: &str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> String {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        errors.push(FieldError::new(field, message));
    }
    value
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
