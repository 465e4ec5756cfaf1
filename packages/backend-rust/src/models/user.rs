use serde::{Deserialize, Serialize};

use super::{iso_millis, CefrLevel, Category, MediaType, POINTS_PER_LEVEL};

/// Account row plus its interest set. Learned words and completed media are
/// loaded separately since most requests only need the counters.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub date_of_birth: Option<String>,
    pub cefr_level: CefrLevel,
    pub interests: Vec<Category>,
    pub ai_data_consent: bool,
    pub counters: ProgressCounters,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn level_progress(&self) -> LevelProgress {
        LevelProgress::new(self.cefr_level, self.counters.points)
    }
}

/// Account as returned to the client. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    pub cefr_level: CefrLevel,
    pub fields_of_interest: Vec<Category>,
    pub ai_data_consent: bool,
    #[serde(flatten)]
    pub counters: ProgressCounters,
    pub level_progress: LevelProgress,
    #[serde(serialize_with = "iso_millis::serialize")]
    pub created_at: i64,
    #[serde(serialize_with = "iso_millis::serialize")]
    pub updated_at: i64,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            date_of_birth: user.date_of_birth.clone(),
            cefr_level: user.cefr_level,
            fields_of_interest: user.interests.clone(),
            ai_data_consent: user.ai_data_consent,
            counters: user.counters,
            level_progress: user.level_progress(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCounters {
    pub points: i64,
    pub words_learned: i64,
    pub articles_read: i64,
    pub videos_watched: i64,
}

/// Display-only view of the points toward the next CEFR tier. Nothing on the
/// server promotes a user when the threshold is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub current_level: CefrLevel,
    pub next_level: Option<CefrLevel>,
    pub points: i64,
    pub points_needed: i64,
    pub percentage: f64,
}

impl LevelProgress {
    pub fn new(level: CefrLevel, points: i64) -> Self {
        let points = points.max(0);
        let next_level = level.next();
        let percentage = if next_level.is_some() {
            (points as f64 / POINTS_PER_LEVEL as f64 * 100.0).min(100.0)
        } else {
            100.0
        };
        Self {
            current_level: level,
            next_level,
            points,
            points_needed: POINTS_PER_LEVEL,
            percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnedWord {
    pub word: String,
    pub definition: String,
    pub part_of_speech: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    #[serde(serialize_with = "iso_millis::serialize")]
    pub learned_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLearnedWord {
    pub word: String,
    pub definition: String,
    pub part_of_speech: String,
    pub example: Option<String>,
    pub pronunciation: Option<String>,
}

impl NewLearnedWord {
    /// Case-insensitive identity of the word within a user's list.
    pub fn key(&self) -> String {
        word_key(&self.word)
    }
}

pub fn word_key(word: &str) -> String {
    word.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedMedia {
    pub media_id: String,
    pub media_type: MediaType,
    #[serde(serialize_with = "iso_millis::serialize")]
    pub completed_at: i64,
}
