use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::{now_ms, word_key, CefrLevel, VocabularyWord};

const WORD_COLUMNS: &str = r#"v."id", v."word", v."definition", v."phonetic", v."cefrLevel",
    v."partOfSpeech", v."exampleSentences", v."synonyms", v."antonyms", v."createdAt""#;

pub async fn find_word(pool: &SqlitePool, word: &str) -> Result<Option<VocabularyWord>, sqlx::Error> {
    let sql = format!(r#"SELECT {WORD_COLUMNS} FROM "vocabulary_words" v WHERE v."word" = $1 LIMIT 1"#);
    let row = sqlx::query(&sql).bind(word).fetch_optional(pool).await?;
    row.as_ref().map(hydrate_word).transpose()
}

/// Words linked to a media item, in link order.
pub async fn list_for_media(
    pool: &SqlitePool,
    media_id: &str,
) -> Result<Vec<VocabularyWord>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {WORD_COLUMNS}
        FROM "media_vocabulary" mv
        JOIN "vocabulary_words" v ON v."id" = mv."wordId"
        WHERE mv."mediaId" = $1
        ORDER BY mv."position", v."word"
        "#
    );
    let rows = sqlx::query(&sql).bind(media_id).fetch_all(pool).await?;
    rows.iter().map(hydrate_word).collect()
}

/// Links cached words to a media item. Words missing from the cache are
/// skipped. Returns how many links were written.
pub async fn link_to_media(
    conn: &mut SqliteConnection,
    media_id: &str,
    words: &[String],
) -> Result<u64, sqlx::Error> {
    let mut linked = 0;
    for (position, word) in words.iter().enumerate() {
        let result = sqlx::query(
            r#"
            INSERT INTO "media_vocabulary" ("mediaId", "wordId", "position")
            SELECT $1, "id", $2 FROM "vocabulary_words" WHERE "word" = $3
            ON CONFLICT ("mediaId", "wordId") DO NOTHING
            "#,
        )
        .bind(media_id)
        .bind(position as i64)
        .bind(word_key(word))
        .execute(&mut *conn)
        .await?;
        linked += result.rows_affected();
    }
    Ok(linked)
}

fn hydrate_word(row: &SqliteRow) -> Result<VocabularyWord, sqlx::Error> {
    let raw_level: String = row.try_get("cefrLevel")?;
    let examples: String = row.try_get("exampleSentences")?;
    let synonyms: String = row.try_get("synonyms")?;
    let antonyms: String = row.try_get("antonyms")?;

    Ok(VocabularyWord {
        id: row.try_get("id")?,
        word: row.try_get("word")?,
        definition: row.try_get("definition")?,
        phonetic: row.try_get("phonetic")?,
        cefr_level: CefrLevel::parse(&raw_level).unwrap_or_default(),
        part_of_speech: row.try_get("partOfSpeech")?,
        example_sentences: parse_string_list(&examples),
        synonyms: parse_string_list(&synonyms),
        antonyms: parse_string_list(&antonyms),
        created_at: row.try_get("createdAt")?,
    })
}

/// Fields of a cache row before it has an id.
#[derive(Debug, Clone)]
pub struct NewVocabularyWord {
    pub word: String,
    pub definition: String,
    pub phonetic: Option<String>,
    pub cefr_level: CefrLevel,
    pub part_of_speech: String,
    pub example_sentences: Vec<String>,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
}

/// Returns false when another request cached the same word first.
pub async fn insert_word(pool: &SqlitePool, word: &NewVocabularyWord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO "vocabulary_words" (
            "id", "word", "definition", "phonetic", "cefrLevel", "partOfSpeech",
            "exampleSentences", "synonyms", "antonyms", "createdAt"
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT ("word") DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&word.word)
    .bind(&word.definition)
    .bind(&word.phonetic)
    .bind(word.cefr_level.as_str())
    .bind(&word.part_of_speech)
    .bind(encode_string_list(&word.example_sentences))
    .bind(encode_string_list(&word.synonyms))
    .bind(encode_string_list(&word.antonyms))
    .bind(now_ms())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn parse_string_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn encode_string_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}
