use serde::{Deserialize, Serialize};

use super::{iso_millis, CefrLevel};

/// Cached dictionary row. One meaning, one definition; the lists hold what
/// the first definition of the upstream entry carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyWord {
    pub id: String,
    pub word: String,
    pub definition: String,
    pub phonetic: Option<String>,
    pub cefr_level: CefrLevel,
    pub part_of_speech: String,
    pub example_sentences: Vec<String>,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
    #[serde(serialize_with = "iso_millis::serialize")]
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryEntry {
    pub word: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    pub phonetics: Vec<DictionaryPhonetic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub meanings: Vec<DictionaryMeaning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryPhonetic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryMeaning {
    pub part_of_speech: String,
    pub definitions: Vec<DictionaryDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryDefinition {
    pub definition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
}

impl From<&VocabularyWord> for DictionaryEntry {
    fn from(cached: &VocabularyWord) -> Self {
        let part_of_speech = if cached.part_of_speech.trim().is_empty() {
            "unknown".to_string()
        } else {
            cached.part_of_speech.clone()
        };

        Self {
            word: cached.word.clone(),
            phonetic: cached.phonetic.clone(),
            phonetics: cached
                .phonetic
                .iter()
                .map(|text| DictionaryPhonetic {
                    text: Some(text.clone()),
                    audio: None,
                })
                .collect(),
            origin: None,
            meanings: vec![DictionaryMeaning {
                part_of_speech,
                definitions: vec![DictionaryDefinition {
                    definition: cached.definition.clone(),
                    example: cached.example_sentences.first().cloned(),
                    synonyms: cached.synonyms.clone(),
                    antonyms: cached.antonyms.clone(),
                }],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_word_becomes_single_meaning_entry() {
        let cached = VocabularyWord {
            id: "v1".to_string(),
            word: "ecosystem".to_string(),
            definition: "A community of organisms".to_string(),
            phonetic: Some("/ˈiːkəʊsɪstəm/".to_string()),
            cefr_level: CefrLevel::B2,
            part_of_speech: "noun".to_string(),
            example_sentences: vec!["The reef ecosystem".to_string(), "Another".to_string()],
            synonyms: vec!["biome".to_string()],
            antonyms: Vec::new(),
            created_at: 0,
        };

        let entry = DictionaryEntry::from(&cached);
        assert_eq!(entry.phonetics.len(), 1);
        assert_eq!(entry.meanings.len(), 1);
        let definition = &entry.meanings[0].definitions[0];
        assert_eq!(definition.example.as_deref(), Some("The reef ecosystem"));
        assert_eq!(definition.synonyms, vec!["biome".to_string()]);
    }
}
