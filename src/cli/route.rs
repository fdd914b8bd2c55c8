//! CLI route: single route table and run context. Dispatches to the batch
//! orchestrator and the single-article pipeline, returning the text to print.

use crate::adapter::board::BoardClient;
use crate::adapter::generation::NotebookCliAdapter;
use crate::adapter::metadata::ArticleAnalyzer;
use crate::adapter::publish::HostingApiPublisher;
use crate::adapter::transcode::FfmpegTranscoder;
use crate::adapter::{MetadataClassifier, TranscodeOptions};
use crate::batch::report::{
    format_batch_report_text, format_quota_status_text, format_section_heading, QuotaStatus,
};
use crate::batch::{BatchContext, BatchOrchestrator};
use crate::cli::parse::Commands;
use crate::config::Config;
use crate::error::{AppError, GenerationError};
use crate::podcast::{finalize_podcast_details, ConvertedPodcast, GeneratedPodcast};
use crate::tracker::RateLimitTracker;
use futures::future;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Inputs for the single-article generation path.
struct GenerateRequest<'a> {
    url: &'a str,
    item_id: Option<&'a str>,
    notebook_url: Option<&'a str>,
    upload: bool,
    assume_yes: bool,
}

/// Runtime context for CLI execution: loaded configuration and the adapter
/// wiring built from it.
pub struct RunContext {
    config: Config,
}

impl RunContext {
    /// Create a run context from an optional config file path.
    pub fn new(config_path: Option<&Path>) -> Result<Self, AppError> {
        let config = Config::load(config_path)?;
        Ok(Self { config })
    }

    /// Create a run context from an already-loaded configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Execute a parsed command and return its output text.
    pub async fn execute(&self, command: &Commands) -> Result<String, AppError> {
        match command {
            Commands::Run { max_items } => self.handle_run(*max_items).await,
            Commands::Generate {
                url,
                item_id,
                notebook_url,
                no_upload,
                yes,
            } => {
                self.handle_generate(GenerateRequest {
                    url,
                    item_id: item_id.as_deref(),
                    notebook_url: notebook_url.as_deref(),
                    upload: !no_upload,
                    assume_yes: *yes,
                })
                .await
            }
            Commands::Score { url } => self.handle_score(url).await,
            Commands::Quota => self.handle_quota(),
        }
    }

    /// Full batch: fetch candidates, generate, publish, report.
    async fn handle_run(&self, max_items: Option<usize>) -> Result<String, AppError> {
        let mut config = self.config.clone();
        if let Some(limit) = max_items {
            config.board.max_items = limit;
            config.validate()?;
        }

        let context = build_batch_context(&config)?;
        let orchestrator = BatchOrchestrator::new(context, &config);
        let result = orchestrator.run().await?;
        Ok(format_batch_report_text(&result))
    }

    /// Generate one episode from a URL, outside the batch flow.
    ///
    /// Runs the same steps as the batch generation phase, but the board is
    /// only written when an item id is supplied, and upload asks for
    /// confirmation unless `--yes` was passed.
    async fn handle_generate(&self, request: GenerateRequest<'_>) -> Result<String, AppError> {
        let context = build_batch_context(&self.config)?;

        context.generation.initialize().await?;
        context.generation.navigate_to_main_page().await?;

        let notebook_url = match request.notebook_url {
            Some(existing) => {
                info!(notebook_url = %existing, "Resuming existing notebook");
                context.generation.open_existing_notebook(existing).await?;
                existing.to_string()
            }
            None => {
                let remaining = context.tracker.validate_rate_limit()?;
                if remaining == 0 {
                    return Err(GenerationError::RateLimited.into());
                }
                info!(url = %request.url, remaining, "Starting audio generation");

                let handle = context
                    .generation
                    .create_notebook_and_generate_audio(request.url)
                    .await?;

                // Same ordering as the batch phase: the notebook link lands
                // on the board before the quota slot is consumed.
                if let Some(item_id) = request.item_id {
                    context
                        .board
                        .update_item_with_notebook_audio_link_and_title(
                            item_id,
                            &handle.notebook_url,
                            &handle.title,
                        )
                        .await?;
                }
                context.tracker.record_audio_generation(request.url)?;
                handle.notebook_url
            }
        };

        let audio_path = context.generation.download_audio().await?;

        let (details, metadata) = future::join(
            context.generation.get_podcast_details(),
            context.classifier.extract_metadata_from_url(request.url),
        )
        .await;
        let details = details?;
        let metadata = match metadata {
            Ok(meta) => Some(meta),
            Err(error) => {
                warn!(
                    url = %request.url,
                    %error,
                    "Metadata extraction failed; continuing without analysis"
                );
                None
            }
        };

        let podcast = GeneratedPodcast {
            item_id: request.item_id.unwrap_or_default().to_string(),
            title: details.title,
            source_url: request.url.to_string(),
            notebook_url,
            audio_path,
            description: details.description,
            metadata,
        };

        let (title, description) =
            finalize_podcast_details(&podcast.details(), podcast.metadata.as_ref());

        let converted_audio = context
            .transcoder
            .convert(
                &podcast.audio_path,
                &TranscodeOptions {
                    output_dir: self.config.paths.downloads_dir.clone(),
                },
            )
            .await?;
        let converted = ConvertedPodcast {
            generated: podcast,
            mp3_path: converted_audio.output_path,
        };

        if !request.upload {
            return Ok(format!(
                "Episode generated: {}\nNotebook: {}\nMP3: {}\nUpload skipped",
                title,
                converted.generated.notebook_url,
                converted.mp3_path.display()
            ));
        }

        if !request.assume_yes {
            use dialoguer::Confirm;
            let confirmed = Confirm::new()
                .with_prompt(format!("Upload \"{}\" to the hosting platform?", title))
                .interact()
                .map_err(|e| AppError::Input(format!("Failed to get user input: {}", e)))?;

            if !confirmed {
                return Ok(format!(
                    "Upload cancelled\nMP3 kept at: {}",
                    converted.mp3_path.display()
                ));
            }
        }

        let receipt = context
            .publisher
            .upload_episode(&converted, &title, &description)
            .await?;

        if request.item_id.is_some() {
            context
                .board
                .update_item_with_generated_podcast_url(
                    &converted.generated.item_id,
                    &receipt.episode_url,
                )
                .await?;
        }

        Ok(format!(
            "Episode published: {}\nTitle: {}\nNotebook: {}\nMP3: {}",
            receipt.episode_url,
            title,
            converted.generated.notebook_url,
            converted.mp3_path.display()
        ))
    }

    /// Analyze a URL and report whether its content suits narration.
    async fn handle_score(&self, url: &str) -> Result<String, AppError> {
        let analyzer = ArticleAnalyzer::new()?;
        let metadata = analyzer.extract_metadata_from_url(url).await?;

        let verdict = if metadata.is_non_podcastable() {
            "not podcastable"
        } else {
            "podcastable"
        };
        Ok(format!(
            "{}\n\n  URL: {}\n  Type: {}\n  Code content: {:.1}%\n  Text length: {} characters\n  Video: {}\n  Verdict: {}\n",
            format_section_heading("Article Analysis"),
            url,
            metadata.content_type,
            metadata.code_percentage,
            metadata.text_length,
            if metadata.has_video { "yes" } else { "no" },
            verdict,
        ))
    }

    /// Report quota usage in the current rolling window.
    fn handle_quota(&self) -> Result<String, AppError> {
        let tracker = RateLimitTracker::new(
            self.config.paths.rate_log.clone(),
            self.config.limits.clone(),
        );
        let remaining = tracker.validate_rate_limit()?;
        let entries = tracker.window_entries()?;

        let status = QuotaStatus {
            limit: self.config.limits.count,
            used: entries.len(),
            remaining,
            window_hours: self.config.limits.window_hours,
            entries,
        };
        Ok(format_quota_status_text(&status))
    }
}

/// Wire the production adapters into a batch context.
///
/// Both the batch and single-article paths go through this, so they always
/// run on identical components.
fn build_batch_context(config: &Config) -> Result<BatchContext, AppError> {
    let tracker = Arc::new(RateLimitTracker::new(
        config.paths.rate_log.clone(),
        config.limits.clone(),
    ));
    let board = Arc::new(BoardClient::new(&config.board)?);
    let generation = Arc::new(NotebookCliAdapter::new(
        config.generation.clone(),
        config.paths.downloads_dir.clone(),
    ));
    let publisher = Arc::new(HostingApiPublisher::new(&config.publish)?);
    let transcoder = Arc::new(FfmpegTranscoder::new(config.transcode.clone()));
    let classifier = Arc::new(ArticleAnalyzer::new()?);

    Ok(BatchContext {
        board,
        generation,
        publisher,
        transcoder,
        classifier,
        tracker,
    })
}
