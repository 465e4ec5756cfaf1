#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use english_learning_backend::config::{Config, RateLimitSettings};
use english_learning_backend::db::operations::media as media_ops;
use english_learning_backend::db::Database;
use english_learning_backend::models::{
    Category, CefrLevel, DictionaryDefinition, DictionaryEntry, DictionaryMeaning,
    DictionaryPhonetic, Media, MediaContent, MediaType, NewMedia,
};
use english_learning_backend::services::dictionary::{DictionaryError, DictionaryProvider};
use english_learning_backend::services::ingestion::{NewsArticle, NewsError, NewsProvider, NewsQuery};
use english_learning_backend::state::AppState;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "secret123";

/// Dictionary provider answering from a fixed table and counting calls.
#[derive(Default)]
pub struct StubDictionary {
    entries: Mutex<HashMap<String, DictionaryEntry>>,
    calls: AtomicUsize,
}

impl StubDictionary {
    pub fn insert(&self, entry: DictionaryEntry) {
        self.entries.lock().insert(entry.word.clone(), entry);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DictionaryProvider for StubDictionary {
    fn name(&self) -> &str {
        "stub"
    }

    async fn fetch(&self, word: &str) -> Result<DictionaryEntry, DictionaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .get(word)
            .cloned()
            .ok_or_else(|| DictionaryError::NotFound(word.to_string()))
    }
}

/// News provider returning a preset batch of articles.
#[derive(Default)]
pub struct StubNews {
    articles: Mutex<Vec<NewsArticle>>,
    last_query: Mutex<Option<NewsQuery>>,
    fail: Mutex<bool>,
}

impl StubNews {
    pub fn set_articles(&self, articles: Vec<NewsArticle>) {
        *self.articles.lock() = articles;
    }

    pub fn fail_next(&self) {
        *self.fail.lock() = true;
    }

    pub fn last_query(&self) -> Option<NewsQuery> {
        *self.last_query.lock()
    }
}

#[async_trait]
impl NewsProvider for StubNews {
    fn name(&self) -> &str {
        "stub"
    }

    async fn fetch_articles(&self, query: &NewsQuery) -> Result<Vec<NewsArticle>, NewsError> {
        *self.last_query.lock() = Some(*query);
        if std::mem::take(&mut *self.fail.lock()) {
            return Err(NewsError::NotConfigured("GUARDIAN_API_KEY"));
        }
        Ok(self.articles.lock().clone())
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub dictionary: Arc<StubDictionary>,
    pub news: Arc<StubNews>,
    _dir: TempDir,
}

pub struct Registered {
    pub token: String,
    pub user_id: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_url = format!("sqlite:{}?mode=rwc", dir.path().join("test.db").display());
        let db = Database::connect(&db_url).await.expect("test database");

        let config = Config {
            database_url: db_url,
            jwt_secret: Some(TEST_SECRET.to_string()),
            bcrypt_cost: 4,
            rate_limit: RateLimitSettings {
                enabled: false,
                window_ms: 60_000,
                max: 100,
            },
            ..Config::default()
        };

        let dictionary = Arc::new(StubDictionary::default());
        let news = Arc::new(StubNews::default());
        let state = AppState::new(config, db, dictionary.clone(), news.clone());
        let app = english_learning_backend::create_app(state.clone());

        Self {
            app,
            state,
            dictionary,
            news,
            _dir: dir,
        }
    }

    pub fn db(&self) -> &Database {
        self.state.db()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn register(&self, email: &str, level: &str, interests: &[&str]) -> Registered {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": "Test User",
                    "email": email,
                    "password": TEST_PASSWORD,
                    "cefrLevel": level,
                    "fieldsOfInterest": interests,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

        Registered {
            token: body["token"].as_str().unwrap().to_string(),
            user_id: body["user"]["id"].as_str().unwrap().to_string(),
        }
    }

    pub async fn seed_media(
        &self,
        title: &str,
        media_type: MediaType,
        level: CefrLevel,
        categories: &[Category],
        created_at: i64,
    ) -> Media {
        let new_media = NewMedia {
            title: title.to_string(),
            media_type,
            url: format!("https://example.com/{}", title.to_lowercase().replace(' ', "-")),
            thumbnail_url: None,
            source: "Test".to_string(),
            description: Some(format!("<p>About {title}</p>")),
            cefr_level: level,
            categories: categories.to_vec(),
            duration: None,
            content: Some(MediaContent {
                content: Some(format!("Body of {title}")),
                video_url: None,
                transcript: None,
            }),
            created_at: Some(created_at),
            vocabulary: Vec::new(),
        };
        media_ops::insert_media(self.db().pool(), &new_media)
            .await
            .expect("seed media")
    }
}

pub fn sample_entry(word: &str) -> DictionaryEntry {
    DictionaryEntry {
        word: word.to_string(),
        phonetic: None,
        phonetics: vec![DictionaryPhonetic {
            text: Some(format!("/{word}/")),
            audio: None,
        }],
        origin: None,
        meanings: vec![DictionaryMeaning {
            part_of_speech: "noun".to_string(),
            definitions: vec![DictionaryDefinition {
                definition: format!("Meaning of {word}"),
                example: Some(format!("A sentence with {word}.")),
                synonyms: vec!["alias".to_string()],
                antonyms: Vec::new(),
            }],
        }],
    }
}

pub fn ids(items: &Value) -> Vec<String> {
    items
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|item| item["_id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
