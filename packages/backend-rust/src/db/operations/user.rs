use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::{
    now_ms, Category, CefrLevel, CompletedMedia, LearnedWord, MediaType, ProgressCounters, User,
};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub date_of_birth: Option<String>,
    pub cefr_level: CefrLevel,
    pub interests: Vec<Category>,
    pub ai_data_consent: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub cefr_level: Option<CefrLevel>,
    pub interests: Option<Vec<Category>>,
}

const USER_COLUMNS: &str = r#"
    "id", "name", "email", "passwordHash", "dateOfBirth", "cefrLevel", "aiDataConsent",
    "points", "wordsLearned", "articlesRead", "videosWatched", "createdAt", "updatedAt"
"#;

pub async fn insert_user(pool: &SqlitePool, new_user: &NewUser) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = now_ms();

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO "users" (
            "id", "name", "email", "passwordHash", "dateOfBirth", "cefrLevel",
            "aiDataConsent", "createdAt", "updatedAt"
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
        "#,
    )
    .bind(&id)
    .bind(&new_user.name)
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(&new_user.date_of_birth)
    .bind(new_user.cefr_level.as_str())
    .bind(new_user.ai_data_consent)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    replace_interests(&mut tx, &id, &new_user.interests).await?;
    tx.commit().await?;

    Ok(User {
        id,
        name: new_user.name.clone(),
        email: new_user.email.clone(),
        password_hash: new_user.password_hash.clone(),
        date_of_birth: new_user.date_of_birth.clone(),
        cefr_level: new_user.cefr_level,
        interests: dedup_categories(&new_user.interests),
        ai_data_consent: new_user.ai_data_consent,
        counters: ProgressCounters::default(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn get_user_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<User>, sqlx::Error> {
    let sql = format!(r#"SELECT {USER_COLUMNS} FROM "users" WHERE "id" = $1 LIMIT 1"#);
    let row = sqlx::query(&sql).bind(user_id).fetch_optional(pool).await?;
    match row {
        Some(row) => Ok(Some(hydrate_user(pool, &row).await?)),
        None => Ok(None),
    }
}

pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    let sql = format!(r#"SELECT {USER_COLUMNS} FROM "users" WHERE "email" = $1 LIMIT 1"#);
    let row = sqlx::query(&sql).bind(email).fetch_optional(pool).await?;
    match row {
        Some(row) => Ok(Some(hydrate_user(pool, &row).await?)),
        None => Ok(None),
    }
}

pub async fn email_taken_by_other(
    pool: &SqlitePool,
    email: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<String> =
        sqlx::query_scalar(r#"SELECT "id" FROM "users" WHERE "email" = $1 AND "id" != $2 LIMIT 1"#)
            .bind(email)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}

/// Applies the present fields only. Returns false when the user does not exist.
pub async fn update_profile(
    pool: &SqlitePool,
    user_id: &str,
    update: &ProfileUpdate,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"
        UPDATE "users" SET
            "name" = COALESCE($2, "name"),
            "email" = COALESCE($3, "email"),
            "cefrLevel" = COALESCE($4, "cefrLevel"),
            "updatedAt" = $5
        WHERE "id" = $1
        "#,
    )
    .bind(user_id)
    .bind(&update.name)
    .bind(&update.email)
    .bind(update.cefr_level.map(|l| l.as_str()))
    .bind(now_ms())
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    if let Some(interests) = &update.interests {
        replace_interests(&mut tx, user_id, interests).await?;
    }

    tx.commit().await?;
    Ok(true)
}

pub async fn delete_user(pool: &SqlitePool, user_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "users" WHERE "id" = $1"#)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_learned_words(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<LearnedWord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "word", "definition", "partOfSpeech", "example", "pronunciation", "learnedAt"
        FROM "learned_words"
        WHERE "userId" = $1
        ORDER BY "learnedAt", "id"
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(LearnedWord {
                word: row.try_get("word")?,
                definition: row.try_get("definition")?,
                part_of_speech: row.try_get("partOfSpeech")?,
                example: row.try_get("example")?,
                pronunciation: row.try_get("pronunciation")?,
                learned_at: row.try_get("learnedAt")?,
            })
        })
        .collect()
}

pub async fn list_completed_media(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<CompletedMedia>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "mediaId", "mediaType", "completedAt"
        FROM "completed_media"
        WHERE "userId" = $1
        ORDER BY "completedAt", "id"
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut completed = Vec::with_capacity(rows.len());
    for row in &rows {
        let raw_type: String = row.try_get("mediaType")?;
        let Some(media_type) = MediaType::parse(&raw_type) else {
            tracing::warn!(user_id, media_type = %raw_type, "skipping completed media with unknown type");
            continue;
        };
        completed.push(CompletedMedia {
            media_id: row.try_get("mediaId")?,
            media_type,
            completed_at: row.try_get("completedAt")?,
        });
    }
    Ok(completed)
}

async fn hydrate_user(pool: &SqlitePool, row: &SqliteRow) -> Result<User, sqlx::Error> {
    let id: String = row.try_get("id")?;
    let raw_level: String = row.try_get("cefrLevel")?;
    let interests = load_interests(pool, &id).await?;

    Ok(User {
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("passwordHash")?,
        date_of_birth: row.try_get("dateOfBirth")?,
        cefr_level: CefrLevel::parse(&raw_level).unwrap_or_default(),
        interests,
        ai_data_consent: row.try_get("aiDataConsent")?,
        counters: ProgressCounters {
            points: row.try_get("points")?,
            words_learned: row.try_get("wordsLearned")?,
            articles_read: row.try_get("articlesRead")?,
            videos_watched: row.try_get("videosWatched")?,
        },
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
        id,
    })
}

async fn load_interests(pool: &SqlitePool, user_id: &str) -> Result<Vec<Category>, sqlx::Error> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"SELECT "category" FROM "user_interests" WHERE "userId" = $1 ORDER BY "category""#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(names.iter().filter_map(|n| Category::parse(n)).collect())
}

async fn replace_interests(
    conn: &mut SqliteConnection,
    user_id: &str,
    interests: &[Category],
) -> Result<(), sqlx::Error> {
    sqlx::query(r#"DELETE FROM "user_interests" WHERE "userId" = $1"#)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    for category in dedup_categories(interests) {
        sqlx::query(r#"INSERT INTO "user_interests" ("userId", "category") VALUES ($1, $2)"#)
            .bind(user_id)
            .bind(category.as_str())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn dedup_categories(categories: &[Category]) -> Vec<Category> {
    let mut unique = categories.to_vec();
    unique.sort();
    unique.dedup();
    unique
}
