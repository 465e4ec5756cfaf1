//! Property tests for progress bookkeeping and recommendation filtering.
//!
//! - Replaying any sequence of word/media events keeps the counters equal to
//!   the number of distinct items recorded.
//! - Recommendations only contain unseen media at the user's level that
//!   overlap the user's interests.

use std::collections::HashSet;

use proptest::prelude::*;
use tempfile::TempDir;

use english_learning_backend::db::operations::{media as media_ops, user as user_ops};
use english_learning_backend::db::Database;
use english_learning_backend::models::{
    Category, CefrLevel, MediaType, NewLearnedWord, NewMedia, User,
};
use english_learning_backend::services::progress::{self, ProgressError, MEDIA_COMPLETION_POINTS};
use english_learning_backend::services::recommendation::{self, ListingQuery};

const WORDS: [&str; 5] = ["ephemeral", "lucid", "candor", "zeal", "mire"];
const LEVELS: [CefrLevel; 3] = [CefrLevel::B2, CefrLevel::C1, CefrLevel::C2];

#[derive(Debug, Clone)]
enum Event {
    Word { index: usize, shout: bool },
    Media { index: usize, video: bool },
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (0..WORDS.len(), any::<bool>()).prop_map(|(index, shout)| Event::Word { index, shout }),
        (0usize..4, any::<bool>()).prop_map(|(index, video)| Event::Media { index, video }),
    ]
}

fn arb_category() -> impl Strategy<Value = Category> {
    (0..Category::ALL.len()).prop_map(|i| Category::ALL[i])
}

#[derive(Debug, Clone)]
struct SeedItem {
    level: usize,
    video: bool,
    categories: Vec<Category>,
    completed: bool,
}

fn arb_seed_item() -> impl Strategy<Value = SeedItem> {
    (
        0..LEVELS.len(),
        any::<bool>(),
        proptest::collection::vec(arb_category(), 1..3),
        any::<bool>(),
    )
        .prop_map(|(level, video, categories, completed)| SeedItem {
            level,
            video,
            categories,
            completed,
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

async fn fresh_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("pbt.db").display());
    let db = Database::connect(&url).await.expect("database");
    (db, dir)
}

async fn create_user(db: &Database, level: CefrLevel, interests: Vec<Category>) -> User {
    user_ops::insert_user(
        db.pool(),
        &user_ops::NewUser {
            name: "Prop Tester".to_string(),
            email: "prop@example.com".to_string(),
            password_hash: "$2b$04$placeholderplaceholderplaceholde".to_string(),
            date_of_birth: None,
            cefr_level: level,
            interests,
            ai_data_consent: false,
        },
    )
    .await
    .expect("insert user")
}

fn media_type(video: bool) -> MediaType {
    if video {
        MediaType::Video
    } else {
        MediaType::Article
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_counters_match_distinct_events(events in proptest::collection::vec(arb_event(), 0..20)) {
        let rt = runtime();
        rt.block_on(async {
            let (db, _dir) = fresh_db().await;
            let user = create_user(&db, CefrLevel::B2, Vec::new()).await;

            let mut words = HashSet::new();
            let mut media = HashSet::new();

            for event in &events {
                match event {
                    Event::Word { index, shout } => {
                        let base = WORDS[*index];
                        let word = if *shout { base.to_uppercase() } else { base.to_string() };
                        let result = progress::record_word_learned(
                            &db,
                            &user.id,
                            NewLearnedWord {
                                word,
                                definition: "d".to_string(),
                                part_of_speech: "noun".to_string(),
                                example: None,
                                pronunciation: None,
                            },
                        )
                        .await;
                        if words.insert(base) {
                            assert!(result.is_ok(), "first learn of {base} failed: {result:?}");
                        } else {
                            assert!(matches!(result, Err(ProgressError::WordAlreadyLearned)));
                        }
                    }
                    Event::Media { index, video } => {
                        let kind = media_type(*video);
                        let id = format!("media-{index}");
                        let result = progress::record_media_completed(&db, &user.id, &id, kind).await;
                        if media.insert((id, *video)) {
                            assert!(result.is_ok(), "first completion failed: {result:?}");
                        } else {
                            assert!(matches!(result, Err(ProgressError::MediaAlreadyCompleted)));
                        }
                    }
                }
            }

            let stored = user_ops::get_user_by_id(db.pool(), &user.id)
                .await
                .unwrap()
                .expect("user exists");
            let videos = media.iter().filter(|(_, video)| *video).count() as i64;
            let articles = media.len() as i64 - videos;

            assert_eq!(stored.counters.words_learned, words.len() as i64);
            assert_eq!(stored.counters.articles_read, articles);
            assert_eq!(stored.counters.videos_watched, videos);
            assert_eq!(stored.counters.points, media.len() as i64 * MEDIA_COMPLETION_POINTS);

            let learned = user_ops::list_learned_words(db.pool(), &user.id).await.unwrap();
            assert_eq!(learned.len(), words.len());
            let completed = user_ops::list_completed_media(db.pool(), &user.id).await.unwrap();
            assert_eq!(completed.len(), media.len());
        });
    }

    #[test]
    fn prop_recommendations_respect_level_interests_and_history(
        user_level in 0..LEVELS.len(),
        interests in proptest::collection::vec(arb_category(), 0..3),
        items in proptest::collection::vec(arb_seed_item(), 0..12),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let (db, _dir) = fresh_db().await;
            let level = LEVELS[user_level];
            let user = create_user(&db, level, interests.clone()).await;

            let mut completed = HashSet::new();
            for (i, item) in items.iter().enumerate() {
                let saved = media_ops::insert_media(
                    db.pool(),
                    &NewMedia {
                        title: format!("Item {i}"),
                        media_type: media_type(item.video),
                        url: format!("https://example.com/item-{i}"),
                        thumbnail_url: None,
                        source: "Prop".to_string(),
                        description: None,
                        cefr_level: LEVELS[item.level],
                        categories: item.categories.clone(),
                        duration: None,
                        content: None,
                        created_at: Some(1_700_000_000_000 + i as i64),
                        vocabulary: Vec::new(),
                    },
                )
                .await
                .expect("insert media");

                if item.completed {
                    progress::record_media_completed(&db, &user.id, &saved.id, saved.media_type)
                        .await
                        .expect("complete media");
                    completed.insert(saved.id.clone());
                }
            }

            let user = user_ops::get_user_by_id(db.pool(), &user.id)
                .await
                .unwrap()
                .expect("user exists");
            let query = ListingQuery { media_type: None, limit: 50 };
            let picks = recommendation::recommendations(&db, &user, query).await.unwrap();

            let expected = items
                .iter()
                .enumerate()
                .filter(|(_, item)| LEVELS[item.level] == level && !item.completed)
                .filter(|(_, item)| {
                    user.interests.is_empty()
                        || item.categories.iter().any(|c| user.interests.contains(c))
                })
                .count();
            assert_eq!(picks.len(), expected);

            for pick in &picks {
                assert_eq!(pick.cefr_level, level);
                assert!(!completed.contains(&pick.id));
                if !user.interests.is_empty() {
                    assert!(pick.categories.iter().any(|c| user.interests.contains(c)));
                }
            }
            assert!(picks.windows(2).all(|pair| pair[0].created_at >= pair[1].created_at));
        });
    }
}
