//! Publish Phase
//!
//! Converts and uploads every successfully generated episode, writing the
//! public URL back to the board. One adapter session spans the whole
//! phase. A failing item is recorded and skipped; it never stops the rest
//! of the batch.

use crate::adapter::{AudioTranscoder, BoardService, PublishAdapter, TranscodeOptions};
use crate::batch::outcome::{ProcessingError, ProcessingPhase};
use crate::error::PublishError;
use crate::podcast::{finalize_podcast_details, ConvertedPodcast, GeneratedPodcast, UploadedPodcast};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sequences conversion, upload and board write-back for one batch.
pub struct PublishRunner {
    publisher: Arc<dyn PublishAdapter>,
    transcoder: Arc<dyn AudioTranscoder>,
    board: Arc<dyn BoardService>,

    /// Directory converted MP3s are written to
    output_dir: PathBuf,
}

impl PublishRunner {
    pub fn new(
        publisher: Arc<dyn PublishAdapter>,
        transcoder: Arc<dyn AudioTranscoder>,
        board: Arc<dyn BoardService>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            publisher,
            transcoder,
            board,
            output_dir,
        }
    }

    /// Publish every episode, collecting per-item failures.
    ///
    /// Infallible as a phase: the worst case is one error entry per input.
    pub async fn run(&self, podcasts: Vec<GeneratedPodcast>) -> Vec<ProcessingError> {
        if podcasts.is_empty() {
            info!("No successful generations to upload");
            return Vec::new();
        }

        info!(episodes = podcasts.len(), "Starting upload phase");
        let mut errors = Vec::new();
        let total = podcasts.len();

        for (index, podcast) in podcasts.iter().enumerate() {
            info!(
                item = index + 1,
                total,
                url = %podcast.source_url,
                "Uploading episode"
            );
            match self.publish(podcast).await {
                Ok(uploaded) => {
                    info!(
                        title = %uploaded.final_title,
                        episode_url = %uploaded.episode_url,
                        "Episode published"
                    );
                }
                Err(error) => {
                    warn!(url = %podcast.source_url, %error, "Upload failed");
                    errors.push(ProcessingError::new(
                        &podcast.source_url,
                        ProcessingPhase::Upload,
                        error.to_string(),
                    ));
                }
            }
        }

        errors
    }

    /// Publish a single episode: finalize metadata, convert, upload, then
    /// write the public URL back to the board item.
    pub async fn publish(&self, podcast: &GeneratedPodcast) -> Result<UploadedPodcast, PublishError> {
        let (title, description) =
            finalize_podcast_details(&podcast.details(), podcast.metadata.as_ref());

        let converted_audio = self
            .transcoder
            .convert(
                &podcast.audio_path,
                &TranscodeOptions {
                    output_dir: self.output_dir.clone(),
                },
            )
            .await?;
        debug!(
            input_bytes = converted_audio.input_bytes,
            output_bytes = converted_audio.output_bytes,
            "Audio converted"
        );

        let converted = ConvertedPodcast {
            generated: podcast.clone(),
            mp3_path: converted_audio.output_path,
        };

        let receipt = self
            .publisher
            .upload_episode(&converted, &title, &description)
            .await?;

        self.board
            .update_item_with_generated_podcast_url(&converted.generated.item_id, &receipt.episode_url)
            .await?;

        Ok(UploadedPodcast {
            converted,
            final_title: title,
            episode_url: receipt.episode_url,
        })
    }
}
