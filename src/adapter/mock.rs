//! In-memory fakes for the capability traits, shared by the pipeline tests.
//!
//! Every fake records the calls it receives so tests can assert ordering
//! and side effects, and each can be told to fail for specific inputs.

use super::{
    AudioTranscoder, BoardService, GenerationAdapter, MetadataClassifier, NotebookHandle,
    PublishAdapter, TranscodeOptions, TranscodeOutput, UploadReceipt,
};
use crate::candidate::Candidate;
use crate::error::{BoardError, GenerationError, MetadataError, PublishError, TranscodeError};
use crate::podcast::{ArticleMetadata, ContentType, ConvertedPodcast, PodcastDetails};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// How a fake should fail for a given input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Structured upstream rejection of the source
    InvalidResource,
    /// Any other adapter fault
    Generic,
}

impl MockFailure {
    fn to_generation_error(self) -> GenerationError {
        match self {
            MockFailure::InvalidResource => GenerationError::InvalidResource {
                reason: "source rejected by service".to_string(),
            },
            MockFailure::Generic => GenerationError::Adapter("simulated failure".to_string()),
        }
    }
}

/// Fake generation service with a scripted per-URL behavior table.
#[derive(Default)]
pub struct MockGenerationAdapter {
    /// Ordered log of every call received
    pub calls: Mutex<Vec<String>>,
    /// URLs that should fail at the create step
    failures: Mutex<HashMap<String, MockFailure>>,
    /// Notebook selected by the last create/open call
    current: Mutex<Option<NotebookHandle>>,
}

impl MockGenerationAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, source_url: &str, failure: MockFailure) {
        self.failures.lock().insert(source_url.to_string(), failure);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl GenerationAdapter for MockGenerationAdapter {
    async fn initialize(&self) -> Result<(), GenerationError> {
        self.record("initialize".to_string());
        Ok(())
    }

    async fn navigate_to_main_page(&self) -> Result<(), GenerationError> {
        self.record("navigate".to_string());
        Ok(())
    }

    async fn create_notebook_and_generate_audio(
        &self,
        source_url: &str,
    ) -> Result<NotebookHandle, GenerationError> {
        self.record(format!("create:{source_url}"));
        if let Some(failure) = self.failures.lock().get(source_url) {
            return Err(failure.to_generation_error());
        }

        let handle = NotebookHandle {
            notebook_url: format!("https://notebooks.example/{}", self.call_count("create:")),
            title: format!("Episode for {source_url}"),
        };
        *self.current.lock() = Some(handle.clone());
        Ok(handle)
    }

    async fn open_existing_notebook(&self, notebook_url: &str) -> Result<(), GenerationError> {
        self.record(format!("open:{notebook_url}"));
        *self.current.lock() = Some(NotebookHandle {
            notebook_url: notebook_url.to_string(),
            title: "Resumed Episode".to_string(),
        });
        Ok(())
    }

    async fn download_audio(&self) -> Result<PathBuf, GenerationError> {
        self.record("download".to_string());
        let current = self.current.lock();
        let handle = current
            .as_ref()
            .ok_or_else(|| GenerationError::Adapter("no notebook selected".to_string()))?;
        Ok(PathBuf::from(format!(
            "downloads/{}.wav",
            handle.title.replace(' ', "-")
        )))
    }

    async fn get_podcast_details(&self) -> Result<PodcastDetails, GenerationError> {
        self.record("details".to_string());
        let current = self.current.lock();
        let handle = current
            .as_ref()
            .ok_or_else(|| GenerationError::Adapter("no notebook selected".to_string()))?;
        Ok(PodcastDetails {
            title: handle.title.clone(),
            description: format!("Narrated episode from {}", handle.notebook_url),
        })
    }
}

/// Fake board with preloaded candidates and recorded writes.
#[derive(Default)]
pub struct MockBoardService {
    candidates: Mutex<Vec<Candidate>>,
    pub podcast_url_updates: Mutex<Vec<(String, String)>>,
    pub non_podcastable_marks: Mutex<Vec<String>>,
    pub notebook_link_updates: Mutex<Vec<(String, String, String)>>,
    fail_fetch: Mutex<bool>,
    fail_marks: Mutex<bool>,
    fail_url_updates_for: Mutex<HashSet<String>>,
}

impl MockBoardService {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates: Mutex::new(candidates),
            ..Self::default()
        }
    }

    pub fn fail_fetch(&self) {
        *self.fail_fetch.lock() = true;
    }

    pub fn fail_marks(&self) {
        *self.fail_marks.lock() = true;
    }

    pub fn fail_url_update_for(&self, item_id: &str) {
        self.fail_url_updates_for.lock().insert(item_id.to_string());
    }

    pub fn marks(&self) -> Vec<String> {
        self.non_podcastable_marks.lock().clone()
    }

    pub fn url_updates(&self) -> Vec<(String, String)> {
        self.podcast_url_updates.lock().clone()
    }

    pub fn notebook_updates(&self) -> Vec<(String, String, String)> {
        self.notebook_link_updates.lock().clone()
    }
}

#[async_trait]
impl BoardService for MockBoardService {
    async fn get_podcast_candidates(
        &self,
        max_items: usize,
    ) -> Result<Vec<Candidate>, BoardError> {
        if *self.fail_fetch.lock() {
            return Err(BoardError::RequestFailed("simulated outage".to_string()));
        }
        let candidates = self.candidates.lock();
        Ok(candidates.iter().take(max_items).cloned().collect())
    }

    async fn update_item_with_generated_podcast_url(
        &self,
        item_id: &str,
        podcast_url: &str,
    ) -> Result<(), BoardError> {
        if self.fail_url_updates_for.lock().contains(item_id) {
            return Err(BoardError::RequestFailed(format!(
                "simulated update failure for {item_id}"
            )));
        }
        self.podcast_url_updates
            .lock()
            .push((item_id.to_string(), podcast_url.to_string()));
        Ok(())
    }

    async fn mark_item_as_non_podcastable(&self, item_id: &str) -> Result<(), BoardError> {
        if *self.fail_marks.lock() {
            return Err(BoardError::RequestFailed(
                "simulated marking failure".to_string(),
            ));
        }
        self.non_podcastable_marks.lock().push(item_id.to_string());
        Ok(())
    }

    async fn update_item_with_notebook_audio_link_and_title(
        &self,
        item_id: &str,
        notebook_url: &str,
        title: &str,
    ) -> Result<(), BoardError> {
        self.notebook_link_updates.lock().push((
            item_id.to_string(),
            notebook_url.to_string(),
            title.to_string(),
        ));
        Ok(())
    }
}

/// Fake classifier returning plain-article metadata for every URL.
#[derive(Default)]
pub struct MockMetadataClassifier {
    pub requests: Mutex<Vec<String>>,
    fail_for: Mutex<HashSet<String>>,
}

impl MockMetadataClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, url: &str) {
        self.fail_for.lock().insert(url.to_string());
    }
}

#[async_trait]
impl MetadataClassifier for MockMetadataClassifier {
    async fn extract_metadata_from_url(
        &self,
        url: &str,
    ) -> Result<ArticleMetadata, MetadataError> {
        self.requests.lock().push(url.to_string());
        if self.fail_for.lock().contains(url) {
            return Err(MetadataError::FetchFailed {
                url: url.to_string(),
                reason: "simulated fetch failure".to_string(),
            });
        }
        Ok(ArticleMetadata {
            title: format!("Title for {url}"),
            description: format!("Description for {url}"),
            content_type: ContentType::Article,
            code_percentage: 1.5,
            has_video: false,
            text_length: 5000,
        })
    }
}

/// Fake transcoder that renames the input to .mp3 without touching disk.
#[derive(Default)]
pub struct MockTranscoder {
    pub conversions: Mutex<Vec<PathBuf>>,
    fail_for: Mutex<HashSet<PathBuf>>,
}

impl MockTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, input: &Path) {
        self.fail_for.lock().insert(input.to_path_buf());
    }
}

#[async_trait]
impl AudioTranscoder for MockTranscoder {
    async fn convert(
        &self,
        input: &Path,
        options: &TranscodeOptions,
    ) -> Result<TranscodeOutput, TranscodeError> {
        self.conversions.lock().push(input.to_path_buf());
        if self.fail_for.lock().contains(input) {
            return Err(TranscodeError::Io {
                path: input.to_path_buf(),
                reason: "simulated conversion failure".to_string(),
            });
        }
        let file_name = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "episode".to_string());
        Ok(TranscodeOutput {
            output_path: options.output_dir.join(format!("{file_name}.mp3")),
            input_bytes: 1_000_000,
            output_bytes: 800_000,
        })
    }
}

/// One recorded upload.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub title: String,
    pub description: String,
    pub mp3_path: PathBuf,
}

/// Fake hosting platform recording every upload.
#[derive(Default)]
pub struct MockPublishAdapter {
    pub uploads: Mutex<Vec<RecordedUpload>>,
    fail_for_titles: Mutex<HashSet<String>>,
}

impl MockPublishAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for_title(&self, title: &str) {
        self.fail_for_titles.lock().insert(title.to_string());
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl PublishAdapter for MockPublishAdapter {
    async fn upload_episode(
        &self,
        podcast: &ConvertedPodcast,
        title: &str,
        description: &str,
    ) -> Result<UploadReceipt, PublishError> {
        if self.fail_for_titles.lock().contains(title) {
            return Err(PublishError::RequestFailed(
                "simulated upload failure".to_string(),
            ));
        }
        let mut uploads = self.uploads.lock();
        uploads.push(RecordedUpload {
            title: title.to_string(),
            description: description.to_string(),
            mp3_path: podcast.mp3_path.clone(),
        });
        Ok(UploadReceipt {
            episode_url: format!("https://episodes.example/{}", uploads.len()),
        })
    }
}
