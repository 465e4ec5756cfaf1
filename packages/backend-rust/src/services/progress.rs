use sqlx::SqliteConnection;
use thiserror::Error;

use crate::db::operations::progress;
use crate::db::Database;
use crate::models::{now_ms, LearnedWord, MediaType, NewLearnedWord, ProgressCounters};

pub const MEDIA_COMPLETION_POINTS: i64 = 5;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("word already learned")]
    WordAlreadyLearned,
    #[error("media already completed")]
    MediaAlreadyCompleted,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct WordLearnedOutcome {
    pub word: LearnedWord,
    pub counters: ProgressCounters,
}

/// Tells a duplicate apart from a missing user after a skipped insert.
async fn rejection(
    conn: &mut SqliteConnection,
    user_id: &str,
    duplicate: ProgressError,
) -> ProgressError {
    match progress::user_exists(conn, user_id).await {
        Ok(true) => duplicate,
        Ok(false) => ProgressError::UserNotFound,
        Err(err) => ProgressError::Database(err),
    }
}

/// Appends the word and bumps `wordsLearned` in one transaction. A word that
/// matches an existing entry case-insensitively is rejected with no change.
pub async fn record_word_learned(
    db: &Database,
    user_id: &str,
    word: NewLearnedWord,
) -> Result<WordLearnedOutcome, ProgressError> {
    let now = now_ms();
    let mut tx = db.pool().begin().await?;

    let inserted = progress::insert_learned_word_if_absent(&mut tx, user_id, &word, now).await?;
    if !inserted {
        return Err(rejection(&mut tx, user_id, ProgressError::WordAlreadyLearned).await);
    }

    progress::increment_words_learned(&mut tx, user_id, now).await?;
    let counters = progress::fetch_counters(&mut tx, user_id)
        .await?
        .ok_or(ProgressError::UserNotFound)?;
    tx.commit().await?;

    tracing::debug!(user_id, word = %word.word, "word learned");

    Ok(WordLearnedOutcome {
        word: LearnedWord {
            word: word.word,
            definition: word.definition,
            part_of_speech: word.part_of_speech,
            example: word.example,
            pronunciation: word.pronunciation,
            learned_at: now,
        },
        counters,
    })
}

/// Records the (media, type) pair once, bumping the matching counter and
/// awarding points. Repeats are rejected with no change.
pub async fn record_media_completed(
    db: &Database,
    user_id: &str,
    media_id: &str,
    media_type: MediaType,
) -> Result<ProgressCounters, ProgressError> {
    let now = now_ms();
    let mut tx = db.pool().begin().await?;

    let inserted =
        progress::insert_completed_media_if_absent(&mut tx, user_id, media_id, media_type, now)
            .await?;
    if !inserted {
        return Err(rejection(&mut tx, user_id, ProgressError::MediaAlreadyCompleted).await);
    }

    progress::increment_media_completed(&mut tx, user_id, media_type, MEDIA_COMPLETION_POINTS, now)
        .await?;
    let counters = progress::fetch_counters(&mut tx, user_id)
        .await?
        .ok_or(ProgressError::UserNotFound)?;
    tx.commit().await?;

    tracing::debug!(
        user_id,
        media_id,
        media_type = media_type.as_str(),
        points = counters.points,
        "media completed"
    );

    Ok(counters)
}
