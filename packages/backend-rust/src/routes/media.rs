use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::operations::{media as media_ops, vocabulary as vocabulary_ops};
use crate::models::{Category, Media, MediaType, MediaView, VocabularyWord};
use crate::response::{AppError, FieldError};
use crate::routes::users::load_user;
use crate::services::ingestion::{self, NewsError, NewsQuery, DEFAULT_FETCH_LIMIT};
use crate::services::recommendation::{
    self, parse_limit, ListingQuery, FEED_DEFAULT_LIMIT, RECOMMENDATION_DEFAULT_LIMIT,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recommendations", get(recommendations))
        .route("/feed", get(feed))
        .route("/search", get(search))
        .route("/category/:category", get(by_category))
        .route("/guardian/fetch", get(guardian_fetch))
        .route("/:id", get(get_media))
}

#[derive(Debug, Default, Deserialize)]
struct ListingParams {
    #[serde(rename = "type")]
    media_type: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    q: Option<String>,
    #[serde(rename = "type")]
    media_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FetchParams {
    category: Option<String>,
    limit: Option<String>,
}

#[derive(Serialize)]
struct RecommendationsResponse {
    success: bool,
    count: usize,
    recommendations: Vec<MediaView>,
}

#[derive(Serialize)]
struct FeedResponse {
    success: bool,
    count: usize,
    items: Vec<MediaView>,
}

#[derive(Serialize)]
struct SearchResponse {
    success: bool,
    count: usize,
    results: Vec<MediaView>,
}

#[derive(Serialize)]
struct CategoryResponse {
    success: bool,
    count: usize,
    category: Category,
    media: Vec<MediaView>,
}

#[derive(Serialize)]
struct FetchResponse {
    success: bool,
    count: usize,
    articles: Vec<MediaView>,
    message: &'static str,
}

#[derive(Serialize)]
struct MediaResponse {
    success: bool,
    media: MediaDetail,
}

#[derive(Serialize)]
struct MediaDetail {
    #[serde(flatten)]
    view: MediaView,
    vocabulary: Vec<VocabularyWord>,
}

fn views(items: &[Media]) -> Vec<MediaView> {
    items.iter().map(MediaView::from).collect()
}

fn listing_query(params: &ListingParams, default_limit: i64) -> Result<ListingQuery, AppError> {
    ListingQuery::parse(
        params.media_type.as_deref(),
        params.limit.as_deref(),
        default_limit,
    )
    .map_err(AppError::validation)
}

async fn recommendations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    params: Result<Query<ListingParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let query = listing_query(&params, RECOMMENDATION_DEFAULT_LIMIT)?;
    let user = load_user(&state, &auth).await?;
    let items = recommendation::recommendations(state.db(), &user, query).await?;

    Ok(Json(RecommendationsResponse {
        success: true,
        count: items.len(),
        recommendations: views(&items),
    })
    .into_response())
}

async fn feed(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    params: Result<Query<ListingParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let query = listing_query(&params, FEED_DEFAULT_LIMIT)?;
    let user = load_user(&state, &auth).await?;
    let items = recommendation::feed(state.db(), &user, query).await?;

    Ok(Json(FeedResponse {
        success: true,
        count: items.len(),
        items: views(&items),
    })
    .into_response())
}

async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let mut errors = Vec::new();
    let q = params.q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        errors.push(FieldError::new("q", "Search query is required"));
    }
    let media_type = match params.media_type.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let parsed = MediaType::parse(raw);
            if parsed.is_none() {
                errors.push(FieldError::new("type", "Type must be article or video"));
            }
            parsed
        }
    };
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let items = recommendation::search(state.db(), q, media_type).await?;
    Ok(Json(SearchResponse {
        success: true,
        count: items.len(),
        results: views(&items),
    })
    .into_response())
}

async fn by_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(raw): Path<String>,
) -> Result<Response, AppError> {
    let category = Category::parse(&raw).ok_or_else(|| {
        AppError::bad_request("Invalid category").with_valid_categories(Category::names())
    })?;
    let user = load_user(&state, &auth).await?;
    let items = recommendation::by_category(state.db(), &user, category).await?;

    Ok(Json(CategoryResponse {
        success: true,
        count: items.len(),
        category,
        media: views(&items),
    })
    .into_response())
}

async fn guardian_fetch(
    State(state): State<AppState>,
    params: Result<Query<FetchParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let mut errors = Vec::new();
    let category = match params.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let parsed = Category::parse(raw);
            if parsed.is_none() {
                errors.push(FieldError::new("category", "Invalid category"));
            }
            parsed
        }
    };
    let page_size = match params.limit.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_FETCH_LIMIT,
        Some(raw) => parse_limit(raw).unwrap_or_else(|| {
            errors.push(FieldError::new("limit", "Limit must be between 1 and 50"));
            DEFAULT_FETCH_LIMIT
        }),
    };
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let provider = state.news();
    let saved = ingestion::ingest_articles(
        state.db(),
        provider.as_ref(),
        NewsQuery {
            category,
            page_size,
        },
    )
    .await
    .map_err(news_error)?;

    Ok(Json(FetchResponse {
        success: true,
        count: saved.len(),
        articles: views(&saved),
        message: "New articles fetched from Guardian API and saved to database",
    })
    .into_response())
}

async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let media = media_ops::get_media_by_id(state.db().pool(), &id)
        .await?
        .ok_or_else(|| AppError::not_found("Media not found"))?;
    let vocabulary = vocabulary_ops::list_for_media(state.db().pool(), &media.id).await?;

    Ok(Json(MediaResponse {
        success: true,
        media: MediaDetail {
            view: MediaView::from(&media),
            vocabulary,
        },
    })
    .into_response())
}

fn news_error(err: NewsError) -> AppError {
    match err {
        NewsError::Database(err) => err.into(),
        other => {
            tracing::error!(error = %other, "article fetch failed");
            AppError::upstream("Error fetching articles from Guardian API")
        }
    }
}
