use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::{iso_millis, CefrLevel, Category, MediaType};

#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub id: String,
    pub title: String,
    pub media_type: MediaType,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub source: String,
    pub description: Option<String>,
    pub cefr_level: CefrLevel,
    pub categories: Vec<Category>,
    pub duration: Option<i64>,
    pub content: Option<MediaContent>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

impl MediaContent {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.video_url.is_none() && self.transcript.is_none()
    }
}

/// Insert payload for the catalog. `created_at` defaults to now when absent.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub title: String,
    pub media_type: MediaType,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub source: String,
    pub description: Option<String>,
    pub cefr_level: CefrLevel,
    pub categories: Vec<Category>,
    pub duration: Option<i64>,
    pub content: Option<MediaContent>,
    pub created_at: Option<i64>,
    /// Cached dictionary words to link, in display order.
    pub vocabulary: Vec<String>,
}

/// Shape returned to the client: HTML stripped from description and
/// transcript, `imageUrl` mirroring the thumbnail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaView {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
    pub source: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub cefr_level: CefrLevel,
    pub categories: Vec<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(serialize_with = "iso_millis::serialize")]
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MediaContent>,
}

impl From<&Media> for MediaView {
    fn from(media: &Media) -> Self {
        let content = media
            .content
            .as_ref()
            .filter(|c| !c.is_empty())
            .map(|c| MediaContent {
                content: c.content.clone(),
                video_url: c.video_url.clone(),
                transcript: c.transcript.as_deref().map(strip_html),
            });

        Self {
            id: media.id.clone(),
            title: media.title.clone(),
            media_type: media.media_type,
            url: media.url.clone(),
            source: media.source.clone(),
            description: strip_html(media.description.as_deref().unwrap_or_default()),
            image_url: media.thumbnail_url.clone(),
            thumbnail_url: media.thumbnail_url.clone(),
            cefr_level: media.cefr_level,
            categories: media.categories.clone(),
            duration: media.duration,
            created_at: media.created_at,
            content,
        }
    }
}

pub fn strip_html(html: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"));
    tag.replace_all(html, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Media {
        Media {
            id: "m1".to_string(),
            title: "Rivers".to_string(),
            media_type: MediaType::Video,
            url: "https://example.com/rivers".to_string(),
            thumbnail_url: Some("https://example.com/t.jpg".to_string()),
            source: "Example".to_string(),
            description: Some("<p>Flowing <b>water</b></p>".to_string()),
            cefr_level: CefrLevel::C1,
            categories: vec![Category::Geography],
            duration: Some(300),
            content: Some(MediaContent {
                content: None,
                video_url: Some("https://example.com/v.mp4".to_string()),
                transcript: Some("<i>Hello</i> rivers".to_string()),
            }),
            created_at: 0,
        }
    }

    #[test]
    fn view_strips_markup_and_mirrors_thumbnail() {
        let view = MediaView::from(&sample());
        assert_eq!(view.description, "Flowing water");
        assert_eq!(view.image_url.as_deref(), Some("https://example.com/t.jpg"));
        let content = view.content.expect("content kept");
        assert_eq!(content.transcript.as_deref(), Some("Hello rivers"));
    }

    #[test]
    fn empty_content_is_omitted() {
        let mut media = sample();
        media.content = Some(MediaContent::default());
        let view = MediaView::from(&media);
        assert!(view.content.is_none());
    }
}
