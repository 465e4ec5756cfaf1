pub mod dictionary;
pub mod media;
pub mod user;

use serde::{Deserialize, Serialize};

pub use dictionary::{DictionaryDefinition, DictionaryEntry, DictionaryMeaning, DictionaryPhonetic, VocabularyWord};
pub use media::{strip_html, Media, MediaContent, MediaView, NewMedia};
pub use user::{word_key, CompletedMedia, LearnedWord, LevelProgress, NewLearnedWord, ProgressCounters, User, UserView};

pub const POINTS_PER_LEVEL: i64 = 200;

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Serializes Unix milliseconds as an ISO-8601 string with millisecond precision.
pub mod iso_millis {
    use chrono::{SecondsFormat, TimeZone, Utc};
    use serde::Serializer;

    pub fn format(value: i64) -> String {
        Utc.timestamp_millis_opt(value)
            .single()
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| value.to_string())
    }

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum CefrLevel {
    #[default]
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub const ALL: [CefrLevel; 3] = [CefrLevel::B2, CefrLevel::C1, CefrLevel::C2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "B2" => Some(Self::B2),
            "C1" => Some(Self::C1),
            "C2" => Some(Self::C2),
            _ => None,
        }
    }

    pub fn next(&self) -> Option<Self> {
        match self {
            Self::B2 => Some(Self::C1),
            Self::C1 => Some(Self::C2),
            Self::C2 => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Article,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "article" => Some(Self::Article),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Politics,
    Geography,
    Fauna,
    Flora,
    History,
    Cinema,
    Literature,
    Sports,
    Technology,
    Science,
    Art,
    Music,
    Food,
    Travel,
    Health,
    Culture,
}

impl Category {
    pub const ALL: [Category; 16] = [
        Category::Politics,
        Category::Geography,
        Category::Fauna,
        Category::Flora,
        Category::History,
        Category::Cinema,
        Category::Literature,
        Category::Sports,
        Category::Technology,
        Category::Science,
        Category::Art,
        Category::Music,
        Category::Food,
        Category::Travel,
        Category::Health,
        Category::Culture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Politics => "Politics",
            Self::Geography => "Geography",
            Self::Fauna => "Fauna",
            Self::Flora => "Flora",
            Self::History => "History",
            Self::Cinema => "Cinema",
            Self::Literature => "Literature",
            Self::Sports => "Sports",
            Self::Technology => "Technology",
            Self::Science => "Science",
            Self::Art => "Art",
            Self::Music => "Music",
            Self::Food => "Food",
            Self::Travel => "Travel",
            Self::Health => "Health",
            Self::Culture => "Culture",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == value)
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cefr_levels_chain_upwards() {
        assert_eq!(CefrLevel::B2.next(), Some(CefrLevel::C1));
        assert_eq!(CefrLevel::C1.next(), Some(CefrLevel::C2));
        assert_eq!(CefrLevel::C2.next(), None);
    }

    #[test]
    fn category_parse_is_case_sensitive() {
        assert_eq!(Category::parse("Science"), Some(Category::Science));
        assert_eq!(Category::parse("science"), None);
        assert_eq!(Category::parse("General"), None);
    }

    #[test]
    fn iso_millis_formats_utc() {
        assert_eq!(iso_millis::format(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(iso_millis::format(1_700_000_000_123), "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn media_type_serializes_lowercase() {
        let json = serde_json::to_string(&MediaType::Video).unwrap();
        assert_eq!(json, "\"video\"");
        assert_eq!(MediaType::parse("article"), Some(MediaType::Article));
        assert_eq!(MediaType::parse("podcast"), None);
    }
}
