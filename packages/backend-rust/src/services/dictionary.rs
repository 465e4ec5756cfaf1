use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::db::operations::vocabulary::{self, NewVocabularyWord};
use crate::db::Database;
use crate::models::{
    CefrLevel, DictionaryDefinition, DictionaryEntry, DictionaryMeaning, DictionaryPhonetic,
    VocabularyWord,
};

const NO_DEFINITION: &str = "No definition available";
const UNKNOWN_PART_OF_SPEECH: &str = "unknown";

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("word is required")]
    EmptyWord,
    #[error("no entry for '{0}'")]
    NotFound(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    HttpStatus(u16),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// External source of dictionary entries, consulted on a cache miss.
#[async_trait]
pub trait DictionaryProvider: Send + Sync {
    fn name(&self) -> &str;

    /// First entry the provider knows for an already-normalized word.
    async fn fetch(&self, word: &str) -> Result<DictionaryEntry, DictionaryError>;
}

/// Client for the free dictionaryapi.dev service.
pub struct FreeDictionaryClient {
    client: Client,
    base_url: String,
}

impl FreeDictionaryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DictionaryProvider for FreeDictionaryClient {
    fn name(&self) -> &str {
        "dictionaryapi.dev"
    }

    async fn fetch(&self, word: &str) -> Result<DictionaryEntry, DictionaryError> {
        let url = format!("{}/entries/en/{}", self.base_url, urlencoding::encode(word));
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DictionaryError::NotFound(word.to_string()));
        }
        if !status.is_success() {
            return Err(DictionaryError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        parse_entries(&body)?
            .into_iter()
            .next()
            .ok_or_else(|| DictionaryError::NotFound(word.to_string()))
    }
}

/// Where a lookup was answered from.
#[derive(Debug, Clone)]
pub enum DictionaryLookup {
    Cached(VocabularyWord),
    Fetched(DictionaryEntry),
}

impl DictionaryLookup {
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    pub fn into_entry(self) -> DictionaryEntry {
        match self {
            Self::Cached(word) => DictionaryEntry::from(&word),
            Self::Fetched(entry) => entry,
        }
    }
}

pub fn normalize_word(raw: &str) -> Option<String> {
    let word = raw.trim().to_lowercase();
    (!word.is_empty()).then_some(word)
}

/// Cache first, provider on a miss. A fetched entry is written to the cache
/// best-effort; a failed write is logged and the entry still returned.
pub async fn lookup(
    db: &Database,
    provider: &dyn DictionaryProvider,
    raw_word: &str,
) -> Result<DictionaryLookup, DictionaryError> {
    let word = normalize_word(raw_word).ok_or(DictionaryError::EmptyWord)?;

    if let Some(cached) = vocabulary::find_word(db.pool(), &word).await? {
        tracing::debug!(word = %word, "dictionary cache hit");
        return Ok(DictionaryLookup::Cached(cached));
    }

    let entry = provider.fetch(&word).await?;
    tracing::debug!(word = %word, provider = provider.name(), "dictionary entry fetched");

    let row = cache_row(&word, &entry);
    match vocabulary::insert_word(db.pool(), &row).await {
        Ok(true) => {}
        Ok(false) => tracing::debug!(word = %word, "dictionary word cached concurrently"),
        Err(err) => tracing::warn!(word = %word, error = %err, "could not cache dictionary word"),
    }

    Ok(DictionaryLookup::Fetched(entry))
}

/// Flattens the first meaning and first definition into a cache row.
pub fn cache_row(word: &str, entry: &DictionaryEntry) -> NewVocabularyWord {
    let meaning = entry.meanings.first();
    let definition = meaning.and_then(|m| m.definitions.first());

    NewVocabularyWord {
        word: word.to_string(),
        definition: definition
            .map(|d| d.definition.trim())
            .filter(|d| !d.is_empty())
            .unwrap_or(NO_DEFINITION)
            .to_string(),
        phonetic: entry
            .phonetic
            .clone()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| entry.phonetics.iter().find_map(|p| p.text.clone())),
        cefr_level: CefrLevel::B2,
        part_of_speech: meaning
            .map(|m| m.part_of_speech.trim())
            .filter(|p| !p.is_empty())
            .unwrap_or(UNKNOWN_PART_OF_SPEECH)
            .to_string(),
        example_sentences: definition.and_then(|d| d.example.clone()).into_iter().collect(),
        synonyms: definition.map(|d| d.synonyms.clone()).unwrap_or_default(),
        antonyms: definition.map(|d| d.antonyms.clone()).unwrap_or_default(),
    }
}

#[derive(Debug, Deserialize)]
struct UpstreamEntry {
    #[serde(default)]
    word: String,
    #[serde(default)]
    phonetic: Option<String>,
    #[serde(default)]
    phonetics: Vec<UpstreamPhonetic>,
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    meanings: Vec<UpstreamMeaning>,
}

#[derive(Debug, Deserialize)]
struct UpstreamPhonetic {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    audio: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamMeaning {
    #[serde(default)]
    part_of_speech: Option<String>,
    #[serde(default)]
    definitions: Vec<UpstreamDefinition>,
}

#[derive(Debug, Deserialize)]
struct UpstreamDefinition {
    #[serde(default)]
    definition: Option<String>,
    #[serde(default)]
    example: Option<String>,
    #[serde(default)]
    synonyms: Vec<String>,
    #[serde(default)]
    antonyms: Vec<String>,
}

impl From<UpstreamEntry> for DictionaryEntry {
    fn from(raw: UpstreamEntry) -> Self {
        Self {
            word: raw.word,
            phonetic: raw.phonetic.filter(|p| !p.is_empty()),
            phonetics: raw
                .phonetics
                .into_iter()
                .map(|p| DictionaryPhonetic {
                    text: p.text.filter(|t| !t.is_empty()),
                    audio: p.audio.filter(|a| !a.is_empty()),
                })
                .filter(|p| p.text.is_some() || p.audio.is_some())
                .collect(),
            origin: raw.origin.filter(|o| !o.is_empty()),
            meanings: raw
                .meanings
                .into_iter()
                .map(|m| DictionaryMeaning {
                    part_of_speech: m
                        .part_of_speech
                        .filter(|p| !p.is_empty())
                        .unwrap_or_else(|| UNKNOWN_PART_OF_SPEECH.to_string()),
                    definitions: m
                        .definitions
                        .into_iter()
                        .map(|d| DictionaryDefinition {
                            definition: d.definition.unwrap_or_default(),
                            example: d.example.filter(|e| !e.is_empty()),
                            synonyms: d.synonyms,
                            antonyms: d.antonyms,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Parses the provider's JSON array into canonical entries.
pub fn parse_entries(body: &str) -> Result<Vec<DictionaryEntry>, DictionaryError> {
    let raw: Vec<UpstreamEntry> =
        serde_json::from_str(body).map_err(|e| DictionaryError::Malformed(e.to_string()))?;
    Ok(raw.into_iter().map(DictionaryEntry::from).collect())
}
