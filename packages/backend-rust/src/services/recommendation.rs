use crate::db::operations::media::{self, MediaFilter};
use crate::db::Database;
use crate::models::{Category, Media, MediaType, User};
use crate::response::FieldError;

pub const RECOMMENDATION_DEFAULT_LIMIT: i64 = 20;
pub const FEED_DEFAULT_LIMIT: i64 = 12;
pub const CATEGORY_LIMIT: i64 = 20;
pub const SEARCH_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 50;

/// Validated `type` / `limit` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingQuery {
    pub media_type: Option<MediaType>,
    pub limit: i64,
}

impl ListingQuery {
    /// Collects every problem with the raw parameters instead of stopping at
    /// the first one.
    pub fn parse(
        raw_type: Option<&str>,
        raw_limit: Option<&str>,
        default_limit: i64,
    ) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();

        let media_type = match raw_type.map(str::trim).filter(|v| !v.is_empty()) {
            None => None,
            Some(value) => match MediaType::parse(value) {
                Some(media_type) => Some(media_type),
                None => {
                    errors.push(FieldError::new("type", "Type must be article or video"));
                    None
                }
            },
        };

        let limit = match raw_limit.map(str::trim).filter(|v| !v.is_empty()) {
            None => default_limit,
            Some(value) => match parse_limit(value) {
                Some(limit) => limit,
                None => {
                    errors.push(FieldError::new("limit", "Limit must be between 1 and 50"));
                    default_limit
                }
            },
        };

        if errors.is_empty() {
            Ok(Self { media_type, limit })
        } else {
            Err(errors)
        }
    }
}

pub fn parse_limit(value: &str) -> Option<i64> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|limit| (1..=MAX_LIMIT).contains(limit))
}

/// Unseen media at the user's level, narrowed to their interests when they
/// have any.
pub async fn recommendations(
    db: &Database,
    user: &User,
    query: ListingQuery,
) -> Result<Vec<Media>, sqlx::Error> {
    let filter = MediaFilter {
        level: user.cefr_level,
        media_type: query.media_type,
        categories: user.interests.clone(),
        exclude_completed_by: Some(user.id.clone()),
        limit: query.limit,
    };
    media::list_media(db.pool(), &filter).await
}

/// Same selection as recommendations, completed items included.
pub async fn feed(db: &Database, user: &User, query: ListingQuery) -> Result<Vec<Media>, sqlx::Error> {
    let filter = MediaFilter {
        level: user.cefr_level,
        media_type: query.media_type,
        categories: user.interests.clone(),
        exclude_completed_by: None,
        limit: query.limit,
    };
    media::list_media(db.pool(), &filter).await
}

pub async fn by_category(
    db: &Database,
    user: &User,
    category: Category,
) -> Result<Vec<Media>, sqlx::Error> {
    let filter = MediaFilter {
        level: user.cefr_level,
        media_type: None,
        categories: vec![category],
        exclude_completed_by: None,
        limit: CATEGORY_LIMIT,
    };
    media::list_media(db.pool(), &filter).await
}

pub async fn search(
    db: &Database,
    query: &str,
    media_type: Option<MediaType>,
) -> Result<Vec<Media>, sqlx::Error> {
    media::search_media(db.pool(), query, media_type, SEARCH_LIMIT).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_params_absent() {
        let query = ListingQuery::parse(None, None, FEED_DEFAULT_LIMIT).unwrap();
        assert_eq!(query.media_type, None);
        assert_eq!(query.limit, 12);
    }

    #[test]
    fn bad_type_and_limit_are_both_reported() {
        let errors = ListingQuery::parse(Some("podcast"), Some("0"), 20).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["type", "limit"]);
    }

    #[test]
    fn limit_bounds_are_inclusive() {
        assert_eq!(parse_limit("1"), Some(1));
        assert_eq!(parse_limit("50"), Some(50));
        assert_eq!(parse_limit("51"), None);
        assert_eq!(parse_limit("ten"), None);
        assert_eq!(parse_limit("-3"), None);
    }

    #[test]
    fn video_type_is_accepted() {
        let query = ListingQuery::parse(Some("video"), Some("5"), 20).unwrap();
        assert_eq!(query.media_type, Some(MediaType::Video));
        assert_eq!(query.limit, 5);
    }
}
