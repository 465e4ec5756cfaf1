use std::collections::{HashMap, HashSet};

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::db::operations::{like_contains_pattern, vocabulary};
use crate::models::{now_ms, Category, CefrLevel, Media, MediaContent, MediaType, NewMedia};

const MEDIA_COLUMNS: &str = r#"
    m."id", m."title", m."type", m."url", m."thumbnailUrl", m."source", m."description",
    m."cefrLevel", m."duration", m."content", m."videoUrl", m."transcript", m."createdAt"
"#;

/// Catalog filter shared by recommendations, the feed and category listings.
#[derive(Debug, Clone)]
pub struct MediaFilter {
    pub level: CefrLevel,
    pub media_type: Option<MediaType>,
    /// Empty matches every category.
    pub categories: Vec<Category>,
    /// Hide items this user has completed.
    pub exclude_completed_by: Option<String>,
    pub limit: i64,
}

pub async fn insert_media(pool: &SqlitePool, new_media: &NewMedia) -> Result<Media, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let created_at = new_media.created_at.unwrap_or_else(now_ms);
    let content = new_media.content.clone().filter(|c| !c.is_empty());

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO "media" (
            "id", "title", "type", "url", "thumbnailUrl", "source", "description",
            "cefrLevel", "duration", "content", "videoUrl", "transcript", "createdAt"
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(&id)
    .bind(&new_media.title)
    .bind(new_media.media_type.as_str())
    .bind(&new_media.url)
    .bind(&new_media.thumbnail_url)
    .bind(&new_media.source)
    .bind(&new_media.description)
    .bind(new_media.cefr_level.as_str())
    .bind(new_media.duration)
    .bind(content.as_ref().and_then(|c| c.content.clone()))
    .bind(content.as_ref().and_then(|c| c.video_url.clone()))
    .bind(content.as_ref().and_then(|c| c.transcript.clone()))
    .bind(created_at)
    .execute(&mut *tx)
    .await?;

    let mut categories = new_media.categories.clone();
    categories.sort();
    categories.dedup();
    for category in &categories {
        sqlx::query(r#"INSERT INTO "media_categories" ("mediaId", "category") VALUES ($1, $2)"#)
            .bind(&id)
            .bind(category.as_str())
            .execute(&mut *tx)
            .await?;
    }
    if !new_media.vocabulary.is_empty() {
        vocabulary::link_to_media(&mut *tx, &id, &new_media.vocabulary).await?;
    }
    tx.commit().await?;

    Ok(Media {
        id,
        title: new_media.title.clone(),
        media_type: new_media.media_type,
        url: new_media.url.clone(),
        thumbnail_url: new_media.thumbnail_url.clone(),
        source: new_media.source.clone(),
        description: new_media.description.clone(),
        cefr_level: new_media.cefr_level,
        categories,
        duration: new_media.duration,
        content,
        created_at,
    })
}

pub async fn get_media_by_id(pool: &SqlitePool, media_id: &str) -> Result<Option<Media>, sqlx::Error> {
    let sql = format!(r#"SELECT {MEDIA_COLUMNS} FROM "media" m WHERE m."id" = $1 LIMIT 1"#);
    let rows = sqlx::query(&sql).bind(media_id).fetch_all(pool).await?;
    Ok(hydrate_media(pool, &rows).await?.into_iter().next())
}

/// Of the given URLs, the ones already in the catalog.
pub async fn existing_urls(pool: &SqlitePool, urls: &[String]) -> Result<HashSet<String>, sqlx::Error> {
    if urls.is_empty() {
        return Ok(HashSet::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(r#"SELECT "url" FROM "media" WHERE "url" IN ("#);
    {
        let mut sep = qb.separated(", ");
        for url in urls {
            sep.push_bind(url);
        }
    }
    qb.push(")");

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(|row| row.try_get::<String, _>("url")).collect()
}

/// Newest first, ties broken by id so pages are stable.
pub async fn list_media(pool: &SqlitePool, filter: &MediaFilter) -> Result<Vec<Media>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        r#"SELECT {MEDIA_COLUMNS} FROM "media" m WHERE m."cefrLevel" = "#
    ));
    qb.push_bind(filter.level.as_str());

    if let Some(media_type) = filter.media_type {
        qb.push(r#" AND m."type" = "#);
        qb.push_bind(media_type.as_str());
    }

    if !filter.categories.is_empty() {
        qb.push(
            r#" AND EXISTS (SELECT 1 FROM "media_categories" mc WHERE mc."mediaId" = m."id" AND mc."category" IN ("#,
        );
        {
            let mut sep = qb.separated(", ");
            for category in &filter.categories {
                sep.push_bind(category.as_str());
            }
        }
        qb.push("))");
    }

    if let Some(user_id) = &filter.exclude_completed_by {
        qb.push(
            r#" AND NOT EXISTS (SELECT 1 FROM "completed_media" cm WHERE cm."mediaId" = m."id" AND cm."userId" = "#,
        );
        qb.push_bind(user_id.as_str());
        qb.push(")");
    }

    qb.push(r#" ORDER BY m."createdAt" DESC, m."id" DESC LIMIT "#);
    qb.push_bind(filter.limit);

    let rows = qb.build().fetch_all(pool).await?;
    hydrate_media(pool, &rows).await
}

/// Case-insensitive substring match on title, description or category name.
pub async fn search_media(
    pool: &SqlitePool,
    query: &str,
    media_type: Option<MediaType>,
    limit: i64,
) -> Result<Vec<Media>, sqlx::Error> {
    let pattern = like_contains_pattern(query);

    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        r#"SELECT {MEDIA_COLUMNS} FROM "media" m WHERE (m."title" LIKE "#
    ));
    qb.push_bind(pattern.clone());
    qb.push(r#" ESCAPE '\' OR m."description" LIKE "#);
    qb.push_bind(pattern.clone());
    qb.push(
        r#" ESCAPE '\' OR EXISTS (SELECT 1 FROM "media_categories" mc WHERE mc."mediaId" = m."id" AND mc."category" LIKE "#,
    );
    qb.push_bind(pattern);
    qb.push(r#" ESCAPE '\'))"#);

    if let Some(media_type) = media_type {
        qb.push(r#" AND m."type" = "#);
        qb.push_bind(media_type.as_str());
    }

    qb.push(r#" ORDER BY m."createdAt" DESC, m."id" DESC LIMIT "#);
    qb.push_bind(limit);

    let rows = qb.build().fetch_all(pool).await?;
    hydrate_media(pool, &rows).await
}

async fn hydrate_media(pool: &SqlitePool, rows: &[SqliteRow]) -> Result<Vec<Media>, sqlx::Error> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = rows
        .iter()
        .map(|row| row.try_get::<String, _>("id"))
        .collect::<Result<_, _>>()?;
    let mut categories = load_categories(pool, &ids).await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let id: String = row.try_get("id")?;
        let raw_type: String = row.try_get("type")?;
        let Some(media_type) = MediaType::parse(&raw_type) else {
            tracing::warn!(media_id = %id, media_type = %raw_type, "skipping media with unknown type");
            continue;
        };
        let raw_level: String = row.try_get("cefrLevel")?;

        let content = MediaContent {
            content: row.try_get("content")?,
            video_url: row.try_get("videoUrl")?,
            transcript: row.try_get("transcript")?,
        };

        out.push(Media {
            categories: categories.remove(&id).unwrap_or_default(),
            title: row.try_get("title")?,
            media_type,
            url: row.try_get("url")?,
            thumbnail_url: row.try_get("thumbnailUrl")?,
            source: row.try_get("source")?,
            description: row.try_get("description")?,
            cefr_level: CefrLevel::parse(&raw_level).unwrap_or_default(),
            duration: row.try_get("duration")?,
            content: (!content.is_empty()).then_some(content),
            created_at: row.try_get("createdAt")?,
            id,
        });
    }
    Ok(out)
}

async fn load_categories(
    pool: &SqlitePool,
    media_ids: &[String],
) -> Result<HashMap<String, Vec<Category>>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        r#"SELECT "mediaId", "category" FROM "media_categories" WHERE "mediaId" IN ("#,
    );
    {
        let mut sep = qb.separated(", ");
        for id in media_ids {
            sep.push_bind(id);
        }
    }
    qb.push(r#") ORDER BY "category""#);

    let rows = qb.build().fetch_all(pool).await?;
    let mut out: HashMap<String, Vec<Category>> = HashMap::with_capacity(media_ids.len());
    for row in &rows {
        let media_id: String = row.try_get("mediaId")?;
        let raw: String = row.try_get("category")?;
        if let Some(category) = Category::parse(&raw) {
            out.entry(media_id).or_default().push(category);
        }
    }
    Ok(out)
}
