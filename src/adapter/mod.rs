//! External Collaborator Interfaces
//!
//! The pipeline core never talks to the outside world directly; it goes
//! through these capability traits. Each trait carries exactly the
//! operations the phase runners need, so the core can run against
//! in-memory fakes in tests and against the real adapters in production.

use crate::candidate::Candidate;
use crate::error::{BoardError, GenerationError, MetadataError, PublishError, TranscodeError};
use crate::podcast::{ArticleMetadata, ConvertedPodcast, PodcastDetails};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod board;
mod command;
pub mod generation;
pub mod metadata;
pub mod publish;
pub mod transcode;

#[cfg(test)]
pub mod mock;

/// Reference to a generation-service notebook holding an in-progress or
/// finished episode.
#[derive(Debug, Clone, PartialEq)]
pub struct NotebookHandle {
    /// Stable URL of the notebook
    pub notebook_url: String,

    /// Episode title the service chose
    pub title: String,
}

/// Drives the external content-generation service.
///
/// Implementations hold one session and one "current notebook" at a time;
/// `download_audio` and `get_podcast_details` operate on whichever notebook
/// the last create/open call selected.
#[async_trait]
pub trait GenerationAdapter: Send + Sync {
    /// Establish the session. Called once per batch, before any other call.
    async fn initialize(&self) -> Result<(), GenerationError>;

    /// Reset to a neutral context. Idempotent; safe to call at any point.
    async fn navigate_to_main_page(&self) -> Result<(), GenerationError>;

    /// Create a notebook for `source_url` and trigger audio generation.
    ///
    /// Returns once generation has observably started. A structured
    /// `InvalidResource` error means the service rejected the source
    /// outright; retrying would waste quota.
    async fn create_notebook_and_generate_audio(
        &self,
        source_url: &str,
    ) -> Result<NotebookHandle, GenerationError>;

    /// Select an existing notebook, typically one started by a prior run.
    async fn open_existing_notebook(&self, notebook_url: &str) -> Result<(), GenerationError>;

    /// Download the current notebook's audio artifact, waiting for
    /// generation to finish if it is still running.
    async fn download_audio(&self) -> Result<PathBuf, GenerationError>;

    /// Title and description of the current notebook's episode.
    async fn get_podcast_details(&self) -> Result<PodcastDetails, GenerationError>;
}

/// Options for one transcoding run.
#[derive(Debug, Clone)]
pub struct TranscodeOptions {
    /// Directory the MP3 is written to
    pub output_dir: PathBuf,
}

/// Result of a transcoding run.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeOutput {
    /// Produced MP3 file
    pub output_path: PathBuf,

    /// Size of the source audio in bytes
    pub input_bytes: u64,

    /// Size of the produced MP3 in bytes
    pub output_bytes: u64,
}

/// Converts generated audio into the publishing format.
#[async_trait]
pub trait AudioTranscoder: Send + Sync {
    /// Produce an MP3 from `input` in the options' output directory.
    /// Input that is already MP3 passes through as a copy.
    async fn convert(
        &self,
        input: &Path,
        options: &TranscodeOptions,
    ) -> Result<TranscodeOutput, TranscodeError>;
}

/// Receipt for a published episode.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    /// Public URL of the hosted episode
    pub episode_url: String,
}

/// Publishes episodes to the hosting platform.
///
/// One adapter instance spans the whole batch, reusing its session across
/// items. Each `upload_episode` call is self-contained; a failed upload
/// leaves no state behind that could affect the next one.
#[async_trait]
pub trait PublishAdapter: Send + Sync {
    async fn upload_episode(
        &self,
        podcast: &ConvertedPodcast,
        title: &str,
        description: &str,
    ) -> Result<UploadReceipt, PublishError>;
}

/// The work-item board: source of candidates, sink for results.
#[async_trait]
pub trait BoardService: Send + Sync {
    /// Fetch up to `max_items` candidates ready for processing.
    async fn get_podcast_candidates(&self, max_items: usize)
        -> Result<Vec<Candidate>, BoardError>;

    /// Write the published episode URL back to the item.
    async fn update_item_with_generated_podcast_url(
        &self,
        item_id: &str,
        podcast_url: &str,
    ) -> Result<(), BoardError>;

    /// Flag the item as unfit for narration.
    async fn mark_item_as_non_podcastable(&self, item_id: &str) -> Result<(), BoardError>;

    /// Persist the in-progress notebook reference and title to the item.
    /// This write happens before the audio download, so a crash mid-batch
    /// never loses the link between item and started generation.
    async fn update_item_with_notebook_audio_link_and_title(
        &self,
        item_id: &str,
        notebook_url: &str,
        title: &str,
    ) -> Result<(), BoardError>;
}

/// Scores whether a URL's content is suitable for narration.
#[async_trait]
pub trait MetadataClassifier: Send + Sync {
    async fn extract_metadata_from_url(&self, url: &str)
        -> Result<ArticleMetadata, MetadataError>;
}
