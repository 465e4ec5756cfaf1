use sqlx::{Row, SqliteConnection};

use crate::models::{MediaType, NewLearnedWord, ProgressCounters};

/// Inserts the word unless the user already has it under the same key or the
/// user row is gone. Returns whether a row was written.
pub async fn insert_learned_word_if_absent(
    conn: &mut SqliteConnection,
    user_id: &str,
    word: &NewLearnedWord,
    learned_at: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO "learned_words" (
            "userId", "word", "wordKey", "definition", "partOfSpeech",
            "example", "pronunciation", "learnedAt"
        )
        SELECT $1, $2, $3, $4, $5, $6, $7, $8
        WHERE EXISTS (SELECT 1 FROM "users" WHERE "id" = $1)
        ON CONFLICT ("userId", "wordKey") DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(&word.word)
    .bind(word.key())
    .bind(&word.definition)
    .bind(&word.part_of_speech)
    .bind(&word.example)
    .bind(&word.pronunciation)
    .bind(learned_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn insert_completed_media_if_absent(
    conn: &mut SqliteConnection,
    user_id: &str,
    media_id: &str,
    media_type: MediaType,
    completed_at: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO "completed_media" ("userId", "mediaId", "mediaType", "completedAt")
        SELECT $1, $2, $3, $4
        WHERE EXISTS (SELECT 1 FROM "users" WHERE "id" = $1)
        ON CONFLICT ("userId", "mediaId", "mediaType") DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(media_id)
    .bind(media_type.as_str())
    .bind(completed_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn increment_words_learned(
    conn: &mut SqliteConnection,
    user_id: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE "users"
        SET "wordsLearned" = "wordsLearned" + 1, "updatedAt" = $2
        WHERE "id" = $1
        "#,
    )
    .bind(user_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn increment_media_completed(
    conn: &mut SqliteConnection,
    user_id: &str,
    media_type: MediaType,
    points: i64,
    now: i64,
) -> Result<(), sqlx::Error> {
    let sql = match media_type {
        MediaType::Article => {
            r#"
            UPDATE "users"
            SET "articlesRead" = "articlesRead" + 1, "points" = "points" + $2, "updatedAt" = $3
            WHERE "id" = $1
            "#
        }
        MediaType::Video => {
            r#"
            UPDATE "users"
            SET "videosWatched" = "videosWatched" + 1, "points" = "points" + $2, "updatedAt" = $3
            WHERE "id" = $1
            "#
        }
    };

    sqlx::query(sql)
        .bind(user_id)
        .bind(points)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn fetch_counters(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<ProgressCounters>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "points", "wordsLearned", "articlesRead", "videosWatched"
        FROM "users" WHERE "id" = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|row| {
        Ok(ProgressCounters {
            points: row.try_get("points")?,
            words_learned: row.try_get("wordsLearned")?,
            articles_read: row.try_get("articlesRead")?,
            videos_watched: row.try_get("videosWatched")?,
        })
    })
    .transpose()
}

pub async fn user_exists(conn: &mut SqliteConnection, user_id: &str) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(r#"SELECT 1 FROM "users" WHERE "id" = $1"#)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}
