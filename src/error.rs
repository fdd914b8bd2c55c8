//! Error types for the podcast generation and publishing pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the rate-limit tracker's persisted log.
///
/// Any failure other than a missing log file is fatal to the batch: treating
/// unreadable state as empty would under-count usage and break the rate
/// limit.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Rate-limit log at {path} is corrupt: {reason}")]
    CorruptLog { path: PathBuf, reason: String },

    #[error("Failed to read rate-limit log at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write rate-limit log at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors from the work-item board service.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Board request failed: {0}")]
    RequestFailed(String),

    #[error("Board authentication failed: {0}")]
    AuthFailed(String),

    #[error("Board query returned errors: {0}")]
    QueryErrors(String),

    #[error("Board {board_id} returned a full page of {limit} items; narrow the board or add pagination")]
    PaginationRequired { board_id: String, limit: usize },

    #[error("Unexpected board response shape: {0}")]
    InvalidResponse(String),
}

/// Errors from the article metadata classifier.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Failed to create HTTP client: {0}")]
    ClientSetup(String),

    #[error("Failed to fetch article {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Article fetch for {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },
}

/// Errors from running an external command (ffmpeg, the automation CLI).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command not found: {command}")]
    Missing { command: String },

    #[error("Command {command} exited with status {status}: {stderr_tail}")]
    Failed {
        command: String,
        status: i32,
        stderr_tail: String,
    },

    #[error("Command {command} timed out after {timeout_ms} ms")]
    TimedOut { command: String, timeout_ms: u64 },
}

/// Errors from the audio generation adapter.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The upstream service explicitly rejected the source resource. This is
    /// a data-quality verdict, not a transient fault: the candidate gets
    /// marked non-podcastable and retrying it would waste quota.
    #[error("Source rejected by the generation service: {reason}")]
    InvalidResource { reason: String },

    #[error("No generation slots remaining in the current window")]
    RateLimited,

    #[error("Generation did not start after {attempts} attempts")]
    StartTimedOut { attempts: u32 },

    #[error("Audio download failed: {0}")]
    DownloadFailed(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Board update failed: {0}")]
    Board(#[from] BoardError),

    #[error("Metadata extraction failed: {0}")]
    Metadata(#[from] MetadataError),

    /// Tracker failures surface here so the phase runner can escalate them;
    /// they abort the batch rather than counting as a per-item failure.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("Generation adapter error: {0}")]
    Adapter(String),
}

/// Errors from the audio transcoder.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Audio file error at {path}: {reason}")]
    Io { path: PathBuf, reason: String },
}

/// Errors from the publish phase: the upload adapter itself plus the
/// conversion and board-write steps around it.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Publish request failed: {0}")]
    RequestFailed(String),

    #[error("Publish authentication failed: {0}")]
    AuthFailed(String),

    #[error("Upload rejected with HTTP {status}: {message}")]
    UploadRejected { status: u16, message: String },

    #[error("Unexpected publish response shape: {0}")]
    InvalidResponse(String),

    #[error("Audio file error at {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Audio conversion failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("Board update failed: {0}")]
    Board(#[from] BoardError),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Fatal orchestration errors. Everything else is caught at the per-item
/// boundary and reported in the batch result instead of propagating.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("Failed to fetch candidates: {0}")]
    CandidateFetch(#[from] BoardError),

    #[error("Generation session initialization failed: {0}")]
    SessionInit(#[source] GenerationError),
}

/// Top-level error for CLI command execution.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Invalid input: {0}")]
    Input(String),
}
