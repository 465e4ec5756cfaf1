use axum::http::StatusCode;
use serde_json::json;

mod common;

use common::TestApp;
use english_learning_backend::db::operations::user as user_ops;
use english_learning_backend::models::{MediaType, NewLearnedWord};
use english_learning_backend::services::progress::{self, ProgressError};

#[tokio::test]
async fn test_word_learned_is_case_insensitive_and_counted_once() {
    let app = TestApp::new().await;
    let user = app.register("words@example.com", "B2", &[]).await;

    let (status, body) = app
        .post(
            "/api/users/progress/word-learned",
            &user.token,
            json!({
                "word": "Ecosystem",
                "definition": "A biological community of interacting organisms",
                "partOfSpeech": "noun",
                "example": "The reef is a fragile ecosystem."
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["progress"]["wordsLearned"], 1);
    assert_eq!(body["word"]["word"], "Ecosystem");
    assert_eq!(body["levelProgress"]["currentLevel"], "B2");

    let (status, body) = app
        .post(
            "/api/users/learned-word",
            &user.token,
            json!({
                "word": "  ecosystem ",
                "definition": "Again",
                "partOfSpeech": "noun"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Word already learned");

    let (_, body) = app.get("/api/users/profile", &user.token).await;
    assert_eq!(body["user"]["wordsLearned"], 1);
    assert_eq!(body["user"]["points"], 0);

    let (status, body) = app.get("/api/users/learned-word", &user.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["words"][0]["word"], "Ecosystem");
    assert_eq!(body["words"][0]["example"], "The reef is a fragile ecosystem.");
    assert!(body["words"][0].get("pronunciation").is_none());
}

#[tokio::test]
async fn test_learned_words_keep_insertion_order() {
    let app = TestApp::new().await;
    let user = app.register("order@example.com", "B2", &[]).await;

    for word in ["zeal", "abate", "mire"] {
        let (status, _) = app
            .post(
                "/api/users/learned-word",
                &user.token,
                json!({ "word": word, "definition": "d", "partOfSpeech": "noun" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = app.get("/api/users/learned-word", &user.token).await;
    let words: Vec<&str> = body["words"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["word"].as_str().unwrap())
        .collect();
    assert_eq!(words, vec!["zeal", "abate", "mire"]);
}

#[tokio::test]
async fn test_media_completion_awards_points_once() {
    let app = TestApp::new().await;
    let user = app.register("media@example.com", "B2", &[]).await;

    let (status, body) = app
        .post(
            "/api/users/progress/media-completed",
            &user.token,
            json!({ "mediaId": "article-1", "mediaType": "article" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"]["points"], 5);
    assert_eq!(body["progress"]["articlesRead"], 1);
    assert_eq!(body["progress"]["videosWatched"], 0);

    let (status, body) = app
        .post(
            "/api/users/progress/media-completed",
            &user.token,
            json!({ "mediaId": "article-1", "mediaType": "article" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Media already completed");

    let (status, body) = app
        .post(
            "/api/users/progress/media-completed",
            &user.token,
            json!({ "mediaId": "video-1", "mediaType": "video" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"]["points"], 10);
    assert_eq!(body["progress"]["articlesRead"], 1);
    assert_eq!(body["progress"]["videosWatched"], 1);

    let (_, body) = app.get("/api/users/profile", &user.token).await;
    assert_eq!(body["user"]["points"], 10);
    assert_eq!(body["user"]["levelProgress"]["points"], 10);

    let (status, body) = app.get("/api/users/completed-media", &user.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["completedMedia"][0]["mediaId"], "article-1");
    assert_eq!(body["completedMedia"][1]["mediaType"], "video");
}

#[tokio::test]
async fn test_progress_is_isolated_per_user() {
    let app = TestApp::new().await;
    let first = app.register("first-p@example.com", "B2", &[]).await;
    let second = app.register("second-p@example.com", "C1", &[]).await;

    let payload = json!({ "mediaId": "shared", "mediaType": "video" });
    let (status, _) = app
        .post("/api/users/progress/media-completed", &first.token, payload.clone())
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .post("/api/users/progress/media-completed", &second.token, payload)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"]["points"], 5);
}

#[tokio::test]
async fn test_progress_payloads_are_validated() {
    let app = TestApp::new().await;
    let user = app.register("invalid@example.com", "B2", &[]).await;

    let (status, body) = app
        .post(
            "/api/users/progress/word-learned",
            &user.token,
            json!({ "word": "  ", "partOfSpeech": "verb" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["word", "definition"]);

    let (status, body) = app
        .post(
            "/api/users/progress/media-completed",
            &user.token,
            json!({ "mediaId": "x", "mediaType": "podcast" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "mediaType");

    let (status, body) = app
        .post("/api/users/progress/media-completed", &user.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);

    let (_, body) = app.get("/api/users/profile", &user.token).await;
    assert_eq!(body["user"]["points"], 0);
    assert_eq!(body["user"]["wordsLearned"], 0);
}

#[tokio::test]
async fn test_deleted_account_cannot_record_progress() {
    let app = TestApp::new().await;
    let user = app.register("gone@example.com", "B2", &[]).await;

    let (status, _) = app
        .request(
            axum::http::Method::DELETE,
            "/api/users/profile",
            Some(&user.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(
            "/api/users/progress/media-completed",
            &user.token,
            json!({ "mediaId": "m", "mediaType": "article" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicates_record_once() {
    let app = TestApp::new().await;
    let user = app.register("race@example.com", "B2", &[]).await;

    let mut media_tasks = Vec::new();
    let mut word_tasks = Vec::new();
    for i in 0..8 {
        let db = app.db().clone();
        let user_id = user.user_id.clone();
        media_tasks.push(tokio::spawn(async move {
            progress::record_media_completed(&db, &user_id, "m1", MediaType::Article).await
        }));

        let db = app.db().clone();
        let user_id = user.user_id.clone();
        let word = if i % 2 == 0 { "Eco" } else { "eco" };
        word_tasks.push(tokio::spawn(async move {
            progress::record_word_learned(
                &db,
                &user_id,
                NewLearnedWord {
                    word: word.to_string(),
                    definition: "Short for ecology".to_string(),
                    part_of_speech: "noun".to_string(),
                    example: None,
                    pronunciation: None,
                },
            )
            .await
        }));
    }

    let (mut media_ok, mut media_dup) = (0, 0);
    for task in media_tasks {
        match task.await.unwrap() {
            Ok(_) => media_ok += 1,
            Err(ProgressError::MediaAlreadyCompleted) => media_dup += 1,
            Err(other) => panic!("unexpected media error: {other}"),
        }
    }
    let (mut word_ok, mut word_dup) = (0, 0);
    for task in word_tasks {
        match task.await.unwrap() {
            Ok(_) => word_ok += 1,
            Err(ProgressError::WordAlreadyLearned) => word_dup += 1,
            Err(other) => panic!("unexpected word error: {other}"),
        }
    }
    assert_eq!((media_ok, media_dup), (1, 7));
    assert_eq!((word_ok, word_dup), (1, 7));

    let stored = user_ops::get_user_by_id(app.db().pool(), &user.user_id)
        .await
        .unwrap()
        .expect("user exists");
    assert_eq!(stored.counters.points, 5);
    assert_eq!(stored.counters.articles_read, 1);
    assert_eq!(stored.counters.words_learned, 1);
    assert_eq!(
        user_ops::list_learned_words(app.db().pool(), &user.user_id)
            .await
            .unwrap()
            .len(),
        1
    );
}
