//! Podcast episode model.
//!
//! Episodes move through three stages, each adding the artifact that stage
//! produced: generation yields a raw audio file, transcoding yields an MP3,
//! and upload yields the hosted episode URL. The stage types nest so a later
//! stage always carries the full history of the earlier ones.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A freshly generated episode, before transcoding.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPodcast {
    /// Board item this episode was generated for
    pub item_id: String,

    /// Episode title reported by the generation service
    pub title: String,

    /// Article the episode was generated from
    pub source_url: String,

    /// Generation-service resource holding this episode
    pub notebook_url: String,

    /// Downloaded audio file
    pub audio_path: PathBuf,

    /// Episode description reported by the generation service
    pub description: String,

    /// Source-article analysis, when available
    pub metadata: Option<ArticleMetadata>,
}

impl GeneratedPodcast {
    /// Title and description pair as the generation service reported them.
    pub fn details(&self) -> PodcastDetails {
        PodcastDetails {
            title: self.title.clone(),
            description: self.description.clone(),
        }
    }
}

/// An episode transcoded to MP3.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedPodcast {
    pub generated: GeneratedPodcast,

    /// Transcoded MP3 file
    pub mp3_path: PathBuf,
}

/// An episode live on the hosting platform.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedPodcast {
    pub converted: ConvertedPodcast,

    /// Final title used on the hosting platform
    pub final_title: String,

    /// Public URL of the hosted episode
    pub episode_url: String,
}

/// Title and description as reported by the generation service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodcastDetails {
    pub title: String,
    pub description: String,
}

/// Broad classification of a source article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Article,
    Video,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Article => write!(f, "Article"),
            ContentType::Video => write!(f, "Video"),
        }
    }
}

/// Analysis of a source article's fitness for audio narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    /// Page title, best available
    pub title: String,

    /// Page description, best available
    pub description: String,

    pub content_type: ContentType,

    /// Share of main-content characters inside code blocks, in percent
    pub code_percentage: f64,

    /// Whether the page centers on embedded video
    pub has_video: bool,

    /// Character count of the main content
    pub text_length: usize,
}

impl ArticleMetadata {
    /// Code-heavy or video-centric pages narrate poorly.
    pub fn is_non_podcastable(&self) -> bool {
        self.has_video || self.code_percentage > CODE_PERCENTAGE_CUTOFF
    }
}

/// Above this share of code characters an article is considered unfit
/// for narration.
pub const CODE_PERCENTAGE_CUTOFF: f64 = 8.0;

/// Compose the final title and description for publishing.
///
/// The description appends an analysis footer to the generation service's
/// own description so listeners can judge how code-heavy the source was.
pub fn finalize_podcast_details(
    details: &PodcastDetails,
    metadata: Option<&ArticleMetadata>,
) -> (String, String) {
    let description = match metadata {
        Some(meta) => format!(
            "{}\n\n==============\n\nCode content percentage: {}%\nTotal text length: {} characters",
            details.description, meta.code_percentage, meta.text_length
        ),
        None => details.description.clone(),
    };
    (details.title.clone(), description)
}
