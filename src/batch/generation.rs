//! Generation Phase
//!
//! Walks the partitioned candidates in order, resumable items first, and
//! drives the generation adapter through one attempt per candidate. Each
//! attempt's result becomes a typed outcome; only tracker and session
//! failures abort the phase.

use crate::adapter::{BoardService, GenerationAdapter, MetadataClassifier};
use crate::batch::outcome::{CandidateOutcome, GenerationOutcome};
use crate::candidate::Candidate;
use crate::error::{BatchError, GenerationError};
use crate::partition::PartitionedCandidates;
use crate::podcast::GeneratedPodcast;
use crate::tracker::RateLimitTracker;
use futures::future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sequences generation attempts for one batch.
pub struct GenerationRunner {
    adapter: Arc<dyn GenerationAdapter>,
    board: Arc<dyn BoardService>,
    classifier: Arc<dyn MetadataClassifier>,
    tracker: Arc<RateLimitTracker>,

    /// Pause between consecutive new generations. Resumable items are not
    /// paced; their expensive step already happened upstream.
    cooldown: Duration,
}

impl GenerationRunner {
    pub fn new(
        adapter: Arc<dyn GenerationAdapter>,
        board: Arc<dyn BoardService>,
        classifier: Arc<dyn MetadataClassifier>,
        tracker: Arc<RateLimitTracker>,
        cooldown: Duration,
    ) -> Self {
        Self {
            adapter,
            board,
            classifier,
            tracker,
            cooldown,
        }
    }

    /// Process every candidate in the partition, resumable first.
    ///
    /// Returns one outcome per candidate in processing order. `Err` means
    /// the whole batch must stop: the session could not be established or
    /// the rate-limit log failed.
    pub async fn run(
        &self,
        partition: PartitionedCandidates,
    ) -> Result<Vec<CandidateOutcome>, BatchError> {
        if partition.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            resumable = partition.to_resume.len(),
            new = partition.to_start.len(),
            "Starting generation phase"
        );
        self.adapter
            .initialize()
            .await
            .map_err(BatchError::SessionInit)?;

        let mut outcomes = Vec::with_capacity(partition.total());

        let resumable_total = partition.to_resume.len();
        for (index, candidate) in partition.to_resume.into_iter().enumerate() {
            info!(
                item = index + 1,
                total = resumable_total,
                url = %candidate.source_url,
                "Processing resumable candidate"
            );
            let outcome = self.attempt(&candidate).await?;
            outcomes.push(CandidateOutcome { candidate, outcome });
        }

        let new_total = partition.to_start.len();
        for (index, candidate) in partition.to_start.into_iter().enumerate() {
            info!(
                item = index + 1,
                total = new_total,
                url = %candidate.source_url,
                "Processing new generation candidate"
            );
            let outcome = self.attempt(&candidate).await?;
            outcomes.push(CandidateOutcome { candidate, outcome });

            // Pace consecutive new generations, but not after the last one.
            if index + 1 < new_total {
                debug!(
                    seconds = self.cooldown.as_secs(),
                    "Cooling down before next generation"
                );
                tokio::time::sleep(self.cooldown).await;
            }
        }

        Ok(outcomes)
    }

    /// One candidate's attempt, folded into an outcome.
    ///
    /// Tracker failures escalate; everything else is caught here so the
    /// phase keeps going.
    async fn attempt(&self, candidate: &Candidate) -> Result<GenerationOutcome, BatchError> {
        match self.process(candidate).await {
            Ok(podcast) => {
                info!(url = %candidate.source_url, title = %podcast.title, "Generation succeeded");
                Ok(GenerationOutcome::Success { podcast })
            }
            Err(GenerationError::Tracker(error)) => Err(BatchError::Tracker(error)),
            Err(error) => {
                if matches!(error, GenerationError::InvalidResource { .. }) {
                    // Best-effort annotation; the rejection itself is still
                    // reported even if this write fails.
                    if let Err(mark_error) = self
                        .board
                        .mark_item_as_non_podcastable(&candidate.id)
                        .await
                    {
                        warn!(
                            item_id = %candidate.id,
                            error = %mark_error,
                            "Failed to mark item as non-podcastable"
                        );
                    }
                }
                warn!(url = %candidate.source_url, error = %error, "Generation failed");
                Ok(GenerationOutcome::from_error(error))
            }
        }
    }

    async fn process(&self, candidate: &Candidate) -> Result<GeneratedPodcast, GenerationError> {
        // Known-neutral state before every item, even resumable ones.
        self.adapter.navigate_to_main_page().await?;

        let notebook_url = match &candidate.generation_url {
            Some(existing) => {
                self.adapter.open_existing_notebook(existing).await?;
                existing.clone()
            }
            None => {
                let remaining = self.tracker.validate_rate_limit()?;
                if remaining == 0 {
                    return Err(GenerationError::RateLimited);
                }

                let handle = self
                    .adapter
                    .create_notebook_and_generate_audio(&candidate.source_url)
                    .await?;

                // Persist the linkage before downloading: a crash from here
                // on must not orphan the started generation.
                self.board
                    .update_item_with_notebook_audio_link_and_title(
                        &candidate.id,
                        &handle.notebook_url,
                        &handle.title,
                    )
                    .await?;
                self.tracker
                    .record_audio_generation(&candidate.source_url)?;

                handle.notebook_url
            }
        };

        let audio_path = self.adapter.download_audio().await?;

        let (details, metadata) = future::join(
            self.adapter.get_podcast_details(),
            self.classifier
                .extract_metadata_from_url(&candidate.source_url),
        )
        .await;
        let details = details?;
        let metadata = match metadata {
            Ok(meta) => Some(meta),
            Err(error) => {
                warn!(
                    url = %candidate.source_url,
                    %error,
                    "Metadata extraction failed; continuing without analysis"
                );
                None
            }
        };

        Ok(GeneratedPodcast {
            item_id: candidate.id.clone(),
            title: details.title,
            source_url: candidate.source_url.clone(),
            notebook_url,
            audio_path,
            description: details.description,
            metadata,
        })
    }
}
