//! Batch Orchestration
//!
//! One orchestration run: fetch candidates, check quota, partition, run
//! the generation phase, run the publish phase over its successes, and
//! fold everything into a single accounting. Partial failure never aborts
//! a batch; only candidate fetch, session setup and rate-log faults do.

use crate::adapter::{
    AudioTranscoder, BoardService, GenerationAdapter, MetadataClassifier, PublishAdapter,
};
use crate::batch::generation::GenerationRunner;
use crate::batch::outcome::{BatchResult, CandidateOutcome, GenerationOutcome, ProcessingError};
use crate::batch::publish::PublishRunner;
use crate::config::Config;
use crate::error::BatchError;
use crate::partition::partition_candidates;
use crate::tracker::RateLimitTracker;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// External collaborators for one batch run.
pub struct BatchContext {
    pub board: Arc<dyn BoardService>,
    pub generation: Arc<dyn GenerationAdapter>,
    pub publisher: Arc<dyn PublishAdapter>,
    pub transcoder: Arc<dyn AudioTranscoder>,
    pub classifier: Arc<dyn MetadataClassifier>,
    pub tracker: Arc<RateLimitTracker>,
}

/// Drives the two-phase pipeline over one set of board candidates.
pub struct BatchOrchestrator {
    context: BatchContext,
    max_items: usize,
    cooldown: Duration,
    output_dir: PathBuf,
}

impl BatchOrchestrator {
    pub fn new(context: BatchContext, config: &Config) -> Self {
        Self {
            context,
            max_items: config.board.max_items,
            cooldown: config.limits.cooldown(),
            output_dir: config.paths.downloads_dir.clone(),
        }
    }

    /// Run one full batch and report the outcome.
    ///
    /// Early exits return an empty result without touching any external
    /// session: session setup is the expensive step, and a batch with
    /// nothing to process should not pay for it.
    pub async fn run(&self) -> Result<BatchResult, BatchError> {
        let run_id = self.context.tracker.run_id().to_string();

        info!(run_id = %run_id, "Fetching podcast candidates");
        let candidates = self
            .context
            .board
            .get_podcast_candidates(self.max_items)
            .await?;
        info!(count = candidates.len(), "Found podcast candidates");

        if candidates.is_empty() {
            info!("No podcast candidates found; nothing to do");
            return Ok(BatchResult::empty(run_id));
        }

        let remaining_slots = self.context.tracker.validate_rate_limit()?;
        let fetched = candidates.len();
        let partition = partition_candidates(candidates, remaining_slots);

        let deferred = fetched - partition.total();
        if deferred > 0 {
            info!(
                deferred,
                remaining_slots, "Rate limit defers new candidates to a later run"
            );
        }

        if partition.is_empty() {
            info!("No candidates to process after rate limiting");
            return Ok(BatchResult::empty(run_id));
        }

        let total_candidates = partition.total();
        info!(
            total = total_candidates,
            resumable = partition.to_resume.len(),
            new = partition.to_start.len(),
            cooldown_secs = self.cooldown.as_secs(),
            "Starting batch processing"
        );

        let generation_runner = GenerationRunner::new(
            self.context.generation.clone(),
            self.context.board.clone(),
            self.context.classifier.clone(),
            self.context.tracker.clone(),
            self.cooldown,
        );
        let outcomes = generation_runner.run(partition).await?;

        let mut errors = Vec::new();
        let mut podcasts = Vec::new();
        for CandidateOutcome { candidate, outcome } in outcomes {
            match outcome {
                GenerationOutcome::Success { podcast } => podcasts.push(podcast),
                GenerationOutcome::Failure { reason, error } => {
                    errors.push(ProcessingError::new(
                        &candidate.source_url,
                        reason.into(),
                        error.to_string(),
                    ));
                }
            }
        }
        let successful_generations = podcasts.len();

        let publish_runner = PublishRunner::new(
            self.context.publisher.clone(),
            self.context.transcoder.clone(),
            self.context.board.clone(),
            self.output_dir.clone(),
        );
        let upload_errors = publish_runner.run(podcasts).await;
        let successful_uploads = successful_generations - upload_errors.len();
        errors.extend(upload_errors);

        Ok(BatchResult {
            run_id,
            total_candidates,
            successful_generations,
            successful_uploads,
            errors,
        })
    }
}
