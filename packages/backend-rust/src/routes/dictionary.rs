use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::models::DictionaryEntry;
use crate::response::AppError;
use crate::services::dictionary::{self, DictionaryError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:word", get(lookup))
}

#[derive(Serialize)]
struct LookupResponse {
    success: bool,
    cached: bool,
    entry: DictionaryEntry,
}

async fn lookup(
    State(state): State<AppState>,
    Path(word): Path<String>,
) -> Result<Response, AppError> {
    let provider = state.dictionary();
    let result = dictionary::lookup(state.db(), provider.as_ref(), &word).await;

    match result {
        Ok(found) => {
            let cached = found.is_cached();
            Ok(Json(LookupResponse {
                success: true,
                cached,
                entry: found.into_entry(),
            })
            .into_response())
        }
        Err(DictionaryError::EmptyWord) => Err(AppError::bad_request("Word is required")),
        Err(DictionaryError::Database(err)) => Err(err.into()),
        Err(err) => {
            tracing::info!(word = %word, error = %err, "dictionary lookup failed");
            Err(AppError::not_found("Definition not found"))
        }
    }
}
