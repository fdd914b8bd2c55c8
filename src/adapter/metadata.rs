//! Source-article analysis.
//!
//! Fetches article HTML and scans it for the signals that decide narration
//! fitness: the share of main content inside code blocks, embedded-video
//! markers, and the best available title and description. Scanning is plain
//! string matching over the fetched document.

use super::MetadataClassifier;
use crate::error::MetadataError;
use crate::podcast::{ArticleMetadata, ContentType};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

const ARTICLE_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ARTICLE_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Classifier that fetches article HTML and scans it for fitness signals.
pub struct ArticleAnalyzer {
    client: Client,
}

impl ArticleAnalyzer {
    pub fn new() -> Result<Self, MetadataError> {
        let client = Client::builder()
            .connect_timeout(ARTICLE_HTTP_CONNECT_TIMEOUT)
            .timeout(ARTICLE_HTTP_REQUEST_TIMEOUT)
            .user_agent(concat!("articast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MetadataError::ClientSetup(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl MetadataClassifier for ArticleAnalyzer {
    async fn extract_metadata_from_url(&self, url: &str) -> Result<ArticleMetadata, MetadataError> {
        debug!(url, "Fetching article for analysis");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MetadataError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(MetadataError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let html = response.text().await.map_err(|e| MetadataError::FetchFailed {
            url: url.to_string(),
            reason: format!("Failed to read body: {e}"),
        })?;

        let metadata = analyze_document(url, &html);
        info!(
            url,
            content_type = %metadata.content_type,
            code_percentage = metadata.code_percentage,
            text_length = metadata.text_length,
            has_video = metadata.has_video,
            "Analyzed article"
        );
        Ok(metadata)
    }
}

/// Analyze a fetched document. The URL stands in as the title of last resort.
fn analyze_document(url: &str, html: &str) -> ArticleMetadata {
    let main = main_content(html);
    let (code_percentage, text_length) = code_metrics(main);
    let has_video = detect_video(main);

    ArticleMetadata {
        title: extract_title(html).unwrap_or_else(|| url.to_string()),
        description: extract_description(html).unwrap_or_default(),
        content_type: if has_video {
            ContentType::Video
        } else {
            ContentType::Article
        },
        code_percentage,
        has_video,
        text_length,
    }
}

/// The section of the document that carries the article text.
///
/// `<article>` is the most specific marker, `<main>` the next, and `<body>`
/// the catch-all. A document with none of them is analyzed whole.
fn main_content(html: &str) -> &str {
    for tag in ["article", "main", "body"] {
        if let Some(section) = tag_sections(html, tag).into_iter().next() {
            return section;
        }
    }
    html
}

/// Code share and total text length of the main content.
///
/// Only `<pre>` blocks count as code. Inline `<code>` spans are prose-sized
/// snippets and would overstate how code-heavy an article reads.
fn code_metrics(main: &str) -> (f64, usize) {
    let text_length = strip_tags(main).chars().count();
    if text_length == 0 {
        return (0.0, 0);
    }

    let code_chars: usize = tag_sections(main, "pre")
        .iter()
        .map(|block| strip_tags(block).chars().count())
        .sum();

    let percentage = code_chars as f64 / text_length as f64 * 100.0;
    ((percentage * 1000.0).round() / 1000.0, text_length)
}

/// Whether the main content centers on embedded video.
fn detect_video(main: &str) -> bool {
    if !opening_tags(main, "video").is_empty() {
        return true;
    }

    let embedded = opening_tags(main, "iframe").iter().any(|tag| {
        attr_value(tag, "src").is_some_and(|src| {
            let src = src.to_ascii_lowercase();
            src.contains("youtube") || src.contains("vimeo")
        })
    });
    if embedded {
        return true;
    }

    strip_tags(main).to_lowercase().contains("watch the video")
}

fn extract_title(html: &str) -> Option<String> {
    meta_content(html, "og:title")
        .or_else(|| meta_content(html, "twitter:title"))
        .or_else(|| meta_content(html, "title"))
        .or_else(|| title_element_text(html))
}

fn extract_description(html: &str) -> Option<String> {
    meta_content(html, "og:description")
        .or_else(|| meta_content(html, "twitter:description"))
        .or_else(|| meta_content(html, "description"))
}

fn title_element_text(html: &str) -> Option<String> {
    let text = tag_sections(html, "title").into_iter().next()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Content of the first meta tag whose `property` or `name` equals `key`.
fn meta_content(html: &str, key: &str) -> Option<String> {
    for tag in opening_tags(html, "meta") {
        let matches_key = [attr_value(tag, "property"), attr_value(tag, "name")]
            .into_iter()
            .flatten()
            .any(|value| value.eq_ignore_ascii_case(key));
        if !matches_key {
            continue;
        }
        if let Some(content) = attr_value(tag, "content") {
            let content = content.trim();
            if !content.is_empty() {
                return Some(content.to_string());
            }
        }
    }
    None
}

/// Bodies of every `<tag ...>...</tag>` pair, in document order.
///
/// Tag names are ASCII, so lowercasing the document preserves byte offsets
/// and slices can come from the original text.
fn tag_sections<'a>(html: &'a str, tag: &str) -> Vec<&'a str> {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}");
    let mut sections = Vec::new();
    let mut pos = 0;

    while let Some(start) = lower[pos..].find(&open).map(|i| i + pos) {
        let after = start + open.len();
        if !is_name_boundary(lower.as_bytes().get(after).copied()) {
            pos = after;
            continue;
        }
        let Some(body_start) = lower[after..].find('>').map(|i| i + after + 1) else {
            break;
        };
        let Some(body_end) = lower[body_start..].find(&close).map(|i| i + body_start) else {
            break;
        };
        sections.push(&html[body_start..body_end]);
        pos = lower[body_end..]
            .find('>')
            .map(|i| i + body_end + 1)
            .unwrap_or(lower.len());
    }

    sections
}

/// Attribute text of every `<tag ...>` opening tag, in document order.
fn opening_tags<'a>(html: &'a str, tag: &str) -> Vec<&'a str> {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let mut tags = Vec::new();
    let mut pos = 0;

    while let Some(start) = lower[pos..].find(&open).map(|i| i + pos) {
        let after = start + open.len();
        if !is_name_boundary(lower.as_bytes().get(after).copied()) {
            pos = after;
            continue;
        }
        let Some(end) = lower[after..].find('>').map(|i| i + after) else {
            break;
        };
        tags.push(&html[after..end]);
        pos = end + 1;
    }

    tags
}

fn is_name_boundary(byte: Option<u8>) -> bool {
    matches!(
        byte,
        Some(b'>') | Some(b'/') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')
    )
}

/// Value of an attribute inside an opening tag's attribute text.
///
/// Handles double-quoted, single-quoted and unquoted values. The attribute
/// name must stand alone, so `src` does not match inside `data-src`.
fn attr_value(tag: &str, name: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut pos = 0;

    while let Some(start) = lower[pos..].find(name).map(|i| i + pos) {
        pos = start + name.len();
        let preceded_ok = start == 0 || bytes[start - 1].is_ascii_whitespace();

        let mut cursor = start + name.len();
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if !preceded_ok || bytes.get(cursor) != Some(&b'=') {
            continue;
        }
        cursor += 1;
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }

        match bytes.get(cursor) {
            Some(b'"') | Some(b'\'') => {
                let quote = bytes[cursor] as char;
                let value_start = cursor + 1;
                let end = lower[value_start..].find(quote).map(|i| i + value_start)?;
                return Some(tag[value_start..end].to_string());
            }
            Some(_) => {
                let end = lower[cursor..]
                    .find(|c: char| c.is_ascii_whitespace())
                    .map(|i| i + cursor)
                    .unwrap_or(lower.len());
                return Some(tag[cursor..end].to_string());
            }
            None => return None,
        }
    }

    None
}

/// Text of an HTML fragment with tags removed.
///
/// Script and style blocks are dropped whole first, so their contents never
/// count as article text.
fn strip_tags(html: &str) -> String {
    let cleaned = remove_blocks(&remove_blocks(html, "script"), "style");

    let mut text = String::with_capacity(cleaned.len());
    let mut in_tag = false;
    for ch in cleaned.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text
}

/// Remove every `<tag ...>...</tag>` block, contents included.
fn remove_blocks(html: &str, tag: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}");
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some(start) = lower[pos..].find(&open).map(|i| i + pos) {
        let after = start + open.len();
        if !is_name_boundary(lower.as_bytes().get(after).copied()) {
            out.push_str(&html[pos..after]);
            pos = after;
            continue;
        }
        out.push_str(&html[pos..start]);
        let Some(end) = lower[start..].find(&close).map(|i| i + start) else {
            // Unterminated block swallows the rest of the fragment.
            return out;
        };
        pos = lower[end..]
            .find('>')
            .map(|i| i + end + 1)
            .unwrap_or(lower.len());
    }

    out.push_str(&html[pos..]);
    out
}
