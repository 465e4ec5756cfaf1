use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::db::operations::media;
use crate::db::Database;
use crate::models::{strip_html, Category, CefrLevel, Media, MediaContent, MediaType, NewMedia};

pub const GUARDIAN_SOURCE: &str = "The Guardian";
pub const MIN_BODY_CHARS: usize = 1200;
pub const DEFAULT_FETCH_LIMIT: i64 = 10;
const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 1000;
const SHOW_FIELDS: &str = "headline,trailText,thumbnail,body,bodyText,wordcount";

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("news provider not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("provider reported status '{0}'")]
    Api(String),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// An article as returned by the provider, body already converted to markdown.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub description: String,
    pub content: String,
    pub categories: Vec<Category>,
    pub word_count: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewsQuery {
    pub category: Option<Category>,
    pub page_size: i64,
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_articles(&self, query: &NewsQuery) -> Result<Vec<NewsArticle>, NewsError>;
}

pub struct GuardianClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GuardianClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("GUARDIAN_API_KEY not set, article ingestion disabled");
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl NewsProvider for GuardianClient {
    fn name(&self) -> &str {
        "guardian"
    }

    async fn fetch_articles(&self, query: &NewsQuery) -> Result<Vec<NewsArticle>, NewsError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(NewsError::NotConfigured("GUARDIAN_API_KEY"))?;

        let page_size = query.page_size.to_string();
        let mut params = vec![
            ("api-key", api_key.to_string()),
            ("show-fields", SHOW_FIELDS.to_string()),
            ("page-size", page_size),
            ("page", "1".to_string()),
            ("order-by", "newest".to_string()),
        ];
        if let Some(category) = query.category {
            params.push(("q", search_terms(category)));
        }

        let url = format!("{}/search", self.base_url);
        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(NewsError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        parse_search_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct GuardianEnvelope {
    response: GuardianResponse,
}

#[derive(Debug, Deserialize)]
struct GuardianResponse {
    status: String,
    #[serde(default)]
    results: Vec<GuardianResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuardianResult {
    #[serde(default)]
    section_id: String,
    #[serde(default)]
    web_title: String,
    web_url: String,
    #[serde(default)]
    fields: Option<GuardianFields>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuardianFields {
    headline: Option<String>,
    trail_text: Option<String>,
    thumbnail: Option<String>,
    body: Option<String>,
    body_text: Option<String>,
    wordcount: Option<String>,
}

/// Keeps results that carry a body, converting HTML bodies to markdown.
pub fn parse_search_response(body: &str) -> Result<Vec<NewsArticle>, NewsError> {
    let envelope: GuardianEnvelope =
        serde_json::from_str(body).map_err(|e| NewsError::Malformed(e.to_string()))?;
    if envelope.response.status != "ok" {
        return Err(NewsError::Api(envelope.response.status));
    }

    Ok(envelope
        .response
        .results
        .into_iter()
        .filter_map(|result| {
            let fields = result.fields.unwrap_or_default();
            let content = match (fields.body.filter(|b| !b.is_empty()), fields.body_text) {
                (Some(html), _) => html_to_markdown(&html),
                (None, Some(text)) if !text.is_empty() => text,
                _ => return None,
            };

            Some(NewsArticle {
                title: fields
                    .headline
                    .filter(|h| !h.trim().is_empty())
                    .unwrap_or(result.web_title),
                url: result.web_url,
                thumbnail_url: fields.thumbnail.filter(|t| !t.is_empty()),
                description: fields.trail_text.unwrap_or_default(),
                content,
                categories: section_categories(&result.section_id),
                word_count: fields.wordcount.and_then(|w| w.trim().parse().ok()),
            })
        })
        .collect())
}

/// Fetches from the provider and saves the new, long-enough articles. Items
/// already in the catalog (by URL) are skipped; a failed save is logged and
/// the rest continue.
pub async fn ingest_articles(
    db: &Database,
    provider: &dyn NewsProvider,
    query: NewsQuery,
) -> Result<Vec<Media>, NewsError> {
    let articles = provider.fetch_articles(&query).await?;
    let fetched = articles.len();

    let urls: Vec<String> = articles
        .iter()
        .map(|a| a.url.clone())
        .filter(|u| !u.is_empty())
        .collect();
    let mut known = media::existing_urls(db.pool(), &urls).await?;

    let mut saved = Vec::new();
    for article in articles {
        if article.url.is_empty() || known.contains(&article.url) {
            continue;
        }
        if strip_html(&article.content).chars().count() < MIN_BODY_CHARS {
            tracing::debug!(url = %article.url, "skipping short article");
            continue;
        }

        let new_media = NewMedia {
            title: truncate_chars(&article.title, MAX_TITLE_CHARS),
            media_type: MediaType::Article,
            url: article.url.clone(),
            thumbnail_url: article.thumbnail_url,
            source: GUARDIAN_SOURCE.to_string(),
            description: Some(truncate_chars(&article.description, MAX_DESCRIPTION_CHARS)),
            cefr_level: CefrLevel::B2,
            categories: article.categories,
            duration: None,
            content: Some(MediaContent {
                content: Some(article.content),
                video_url: None,
                transcript: None,
            }),
            created_at: None,
            vocabulary: Vec::new(),
        };

        match media::insert_media(db.pool(), &new_media).await {
            Ok(media) => {
                known.insert(article.url);
                saved.push(media);
            }
            Err(err) => {
                tracing::error!(url = %article.url, error = %err, "failed to save article");
            }
        }
    }

    tracing::info!(
        provider = provider.name(),
        fetched,
        saved = saved.len(),
        "article ingestion finished"
    );

    Ok(saved)
}

/// Provider section id to catalog categories. Unknown sections map to none.
pub fn section_categories(section: &str) -> Vec<Category> {
    use Category::*;

    match section.to_lowercase().as_str() {
        "politics" => vec![Politics],
        "world" | "australia-news" | "uk-news" | "us-news" => vec![Geography, Politics],
        "science" => vec![Science],
        "environment" | "global-development" => vec![Geography],
        "technology" => vec![Technology, Science],
        "sport" | "football" => vec![Sports],
        "culture" => vec![Culture, Cinema, Literature],
        "film" => vec![Cinema, Culture],
        "books" => vec![Literature, Culture],
        "music" => vec![Culture],
        "travel" => vec![Geography, Culture],
        "law" => vec![Politics],
        "media" => vec![Technology],
        _ => Vec::new(),
    }
}

/// Query expansion used when fetching for a category.
pub fn search_terms(category: Category) -> String {
    let terms = match category {
        Category::Politics => "politics OR government OR election",
        Category::Geography => "world OR international OR global",
        Category::Science => "science OR research OR discovery",
        Category::Technology => "technology OR digital OR innovation",
        Category::Sports => "sport OR football OR tennis OR olympics",
        Category::Culture => "culture OR arts OR entertainment",
        Category::Cinema => "film OR cinema OR movies",
        Category::Literature => "books OR literature OR writing",
        Category::History => "history OR heritage",
        Category::Health => "health OR medicine OR wellness",
        other => return other.as_str().to_lowercase(),
    };
    terms.to_string()
}

struct MarkdownRules {
    paragraph: Regex,
    line_break: Regex,
    h1: Regex,
    h2: Regex,
    h3: Regex,
    bold: Regex,
    italic: Regex,
    tag: Regex,
    blank_lines: Regex,
    empty_emphasis: Regex,
}

fn markdown_rules() -> &'static MarkdownRules {
    static RULES: OnceLock<MarkdownRules> = OnceLock::new();
    RULES.get_or_init(|| {
        let re = |pattern: &str| Regex::new(pattern).expect("static regex");
        MarkdownRules {
            paragraph: re(r"(?i)</?p[^>]*>"),
            line_break: re(r"(?i)<br\s*/?>\s*"),
            h1: re(r"(?i)<h1[^>]*>(.*?)</h1>"),
            h2: re(r"(?i)<h2[^>]*>(.*?)</h2>"),
            h3: re(r"(?i)<h3[^>]*>(.*?)</h3>"),
            bold: re(r"(?i)<(?:strong|b)(?:\s[^>]*)?>(.*?)</(?:strong|b)>"),
            italic: re(r"(?i)<(?:em|i)(?:\s[^>]*)?>(.*?)</(?:em|i)>"),
            tag: re(r"<[^>]+>"),
            blank_lines: re(r"\n{3,}"),
            empty_emphasis: re(r"(?i)<(?:strong|b|em|i)(?:\s[^>]*)?>\s*</(?:strong|b|em|i)>"),
        }
    })
}

/// Reduces article HTML to paragraphs, headings and emphasis.
pub fn html_to_markdown(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let rules = markdown_rules();
    let text = html.replace("\r\n", "\n").replace('\r', "\n");
    let text = rules.paragraph.replace_all(&text, "\n\n");
    let text = rules.line_break.replace_all(&text, "\n");
    let text = rules.h1.replace_all(&text, "\n# $1\n");
    let text = rules.h2.replace_all(&text, "\n## $1\n");
    let text = rules.h3.replace_all(&text, "\n### $1\n");
    let text = rules.empty_emphasis.replace_all(&text, "");
    let text = rules.bold.replace_all(&text, "**$1**");
    let text = rules.italic.replace_all(&text, "*$1*");
    let text = rules.tag.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let text = rules.blank_lines.replace_all(&text, "\n\n");

    text.trim().to_string()
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_keeps_structure_and_drops_tags() {
        let html = "<h2>Storm</h2><p>The <strong>river</strong> rose.<br/>Roads <em>closed</em>.</p><p><a href=\"x\">More</a> &amp; more</p>";
        let md = html_to_markdown(html);
        assert_eq!(md, "## Storm\n\nThe **river** rose.\nRoads *closed*.\n\nMore & more");
    }

    #[test]
    fn empty_emphasis_leaves_no_markers() {
        assert_eq!(html_to_markdown("<p>Calm<strong> </strong> seas</p>"), "Calm seas");
    }

    #[test]
    fn markdown_collapses_blank_runs() {
        let md = html_to_markdown("<p>One</p>\n\n\n<p>Two</p>");
        assert!(!md.contains("\n\n\n"));
        assert!(md.starts_with("One"));
        assert!(md.ends_with("Two"));
    }

    #[test]
    fn sections_map_only_to_known_categories() {
        assert_eq!(section_categories("film"), vec![Category::Cinema, Category::Culture]);
        assert_eq!(section_categories("World"), vec![Category::Geography, Category::Politics]);
        assert!(section_categories("lifeandstyle").is_empty());
        assert!(section_categories("business").is_empty());
    }

    #[test]
    fn categories_without_terms_use_their_name() {
        assert_eq!(search_terms(Category::Fauna), "fauna");
        assert_eq!(search_terms(Category::Cinema), "film OR cinema OR movies");
    }

    #[test]
    fn results_without_body_are_dropped() {
        let body = r#"{"response": {"status": "ok", "total": 2, "results": [
            {"id": "a", "sectionId": "science", "webTitle": "Fallback title",
             "webUrl": "https://example.com/a",
             "fields": {"trailText": "Teaser", "body": "<p>Text</p>", "wordcount": "812"}},
            {"id": "b", "sectionId": "sport", "webTitle": "No body",
             "webUrl": "https://example.com/b", "fields": {"headline": "Nothing"}}
        ]}}"#;

        let articles = parse_search_response(body).unwrap();
        assert_eq!(articles.len(), 1);
        let article = &articles[0];
        assert_eq!(article.title, "Fallback title");
        assert_eq!(article.content, "Text");
        assert_eq!(article.categories, vec![Category::Science]);
        assert_eq!(article.word_count, Some(812));
    }

    #[test]
    fn provider_error_status_is_reported() {
        let body = r#"{"response": {"status": "error", "message": "Invalid key"}}"#;
        assert!(matches!(parse_search_response(body), Err(NewsError::Api(_))));
    }
}
