//! Configuration System
//!
//! Layered configuration: built-in defaults, then an optional `articast.toml`
//! file, then `ARTICAST_*` environment overrides (section separator `__`, e.g.
//! `ARTICAST_BOARD__API_TOKEN`). Policy constants for the rate limiter and
//! phase pacing live here so deployments can tune them without code changes.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use config::{Config as RawConfig, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Rate-limit and pacing policy
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Work-item board service
    #[serde(default)]
    pub board: BoardConfig,

    /// Audio generation adapter
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Audio transcoding
    #[serde(default)]
    pub transcode: TranscodeConfig,

    /// Episode hosting platform
    #[serde(default)]
    pub publish: PublishConfig,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rate-limit and pacing policy.
///
/// The defaults encode the upstream service's informal limits: at most three
/// new generations per rolling 24-hour window, a 7-day log retention, and a
/// 10-second cooldown between consecutive new generations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Generation triggers allowed per rolling window
    #[serde(default = "default_limit_count")]
    pub count: u32,

    /// Rolling window for quota counting, in hours
    #[serde(default = "default_window_hours")]
    pub window_hours: u64,

    /// Retention of rate-log entries, in days
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,

    /// Cooldown between consecutive new generations, in seconds
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_limit_count() -> u32 {
    3
}

fn default_window_hours() -> u64 {
    24
}

fn default_retention_days() -> u64 {
    7
}

fn default_cooldown_secs() -> u64 {
    10
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            count: default_limit_count(),
            window_hours: default_window_hours(),
            retention_days: default_retention_days(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl LimitsConfig {
    /// Quota counting window.
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.window_hours as i64)
    }

    /// Log retention window.
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days as i64)
    }

    /// Cooldown between new generations.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Work-item board configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// GraphQL endpoint
    #[serde(default = "default_board_endpoint")]
    pub endpoint: String,

    /// API token (bearer auth)
    #[serde(default)]
    pub api_token: String,

    /// Board identifier
    #[serde(default)]
    pub board_id: String,

    /// Maximum candidates fetched per batch
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Column identifiers on the board
    #[serde(default)]
    pub columns: BoardColumns,
}

fn default_board_endpoint() -> String {
    "https://api.monday.com/v2".to_string()
}

fn default_max_items() -> usize {
    3
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            endpoint: default_board_endpoint(),
            api_token: String::new(),
            board_id: String::new(),
            max_items: default_max_items(),
            columns: BoardColumns::default(),
        }
    }
}

/// Board column identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardColumns {
    /// Link column holding the article source URL
    #[serde(default = "default_source_url_column")]
    pub source_url: String,

    /// Link column receiving the published podcast URL
    #[serde(default = "default_podcast_link_column")]
    pub podcast_link: String,

    /// Link column holding the in-progress generation reference
    #[serde(default = "default_audio_link_column")]
    pub audio_link: String,

    /// Formula column scoring podcast fitness
    #[serde(default = "default_fitness_column")]
    pub fitness: String,

    /// Checkbox column flagging rejected resources
    #[serde(default = "default_non_podcastable_column")]
    pub non_podcastable: String,
}

fn default_source_url_column() -> String {
    "link".to_string()
}

fn default_podcast_link_column() -> String {
    "podcast_link".to_string()
}

fn default_audio_link_column() -> String {
    "notebook_link".to_string()
}

fn default_fitness_column() -> String {
    "podcast_fitness".to_string()
}

fn default_non_podcastable_column() -> String {
    "non_podcastable".to_string()
}

impl Default for BoardColumns {
    fn default() -> Self {
        Self {
            source_url: default_source_url_column(),
            podcast_link: default_podcast_link_column(),
            audio_link: default_audio_link_column(),
            fitness: default_fitness_column(),
            non_podcastable: default_non_podcastable_column(),
        }
    }
}

/// Audio generation adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Automation CLI binary
    #[serde(default = "default_generation_command")]
    pub command: String,

    /// Output language passed to the service
    #[serde(default = "default_language")]
    pub language: String,

    /// Timeout for ordinary CLI operations, in seconds
    #[serde(default = "default_generation_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Timeout for source-side processing, in seconds
    #[serde(default = "default_source_timeout_secs")]
    pub source_timeout_secs: u64,

    /// Timeout for audio generation, in seconds
    #[serde(default = "default_audio_timeout_secs")]
    pub audio_timeout_secs: u64,

    /// Timeout for artifact download, in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Attempts to confirm source readiness (backoff doubles between tries)
    #[serde(default = "default_source_retries")]
    pub source_retries: u32,

    /// Attempts to trigger generation before giving up
    #[serde(default = "default_generation_retries")]
    pub generation_retries: u32,

    /// Pause between generation-trigger attempts, in seconds
    #[serde(default = "default_retry_pause_secs")]
    pub retry_pause_secs: u64,
}

fn default_generation_command() -> String {
    "notebooklm".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_source_timeout_secs() -> u64 {
    120
}

fn default_audio_timeout_secs() -> u64 {
    900
}

fn default_download_timeout_secs() -> u64 {
    300
}

fn default_source_retries() -> u32 {
    4
}

fn default_generation_retries() -> u32 {
    3
}

fn default_retry_pause_secs() -> u64 {
    5
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            command: default_generation_command(),
            language: default_language(),
            default_timeout_secs: default_generation_timeout_secs(),
            source_timeout_secs: default_source_timeout_secs(),
            audio_timeout_secs: default_audio_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            source_retries: default_source_retries(),
            generation_retries: default_generation_retries(),
            retry_pause_secs: default_retry_pause_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn audio_timeout(&self) -> Duration {
        Duration::from_secs(self.audio_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_secs(self.retry_pause_secs)
    }
}

/// Audio transcoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// Encoder binary
    #[serde(default = "default_transcode_command")]
    pub command: String,

    /// Target bitrate
    #[serde(default = "default_bitrate")]
    pub bitrate: String,

    /// VBR quality (0 = best)
    #[serde(default)]
    pub quality: u32,

    /// Output sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Output channel count
    #[serde(default = "default_channels")]
    pub channels: u32,

    /// Conversion timeout, in seconds
    #[serde(default = "default_transcode_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_transcode_command() -> String {
    "ffmpeg".to_string()
}

fn default_bitrate() -> String {
    "320k".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_channels() -> u32 {
    2
}

fn default_transcode_timeout_secs() -> u64 {
    300
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            command: default_transcode_command(),
            bitrate: default_bitrate(),
            quality: 0,
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            timeout_secs: default_transcode_timeout_secs(),
        }
    }
}

impl TranscodeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Hosting platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Hosting API base URL
    #[serde(default)]
    pub endpoint: String,

    /// API token (bearer auth)
    #[serde(default)]
    pub api_token: String,

    /// Upload timeout, in seconds
    #[serde(default = "default_publish_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_publish_timeout_secs() -> u64 {
    600
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_token: String::new(),
            timeout_secs: default_publish_timeout_secs(),
        }
    }
}

impl PublishConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Rate-limit log file
    #[serde(default = "default_rate_log")]
    pub rate_log: PathBuf,

    /// Directory for downloaded and converted audio
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
}

fn default_rate_log() -> PathBuf {
    PathBuf::from("logs/audio-generation.json")
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("downloads")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            rate_log: default_rate_log(),
            downloads_dir: default_downloads_dir(),
        }
    }
}

impl Config {
    /// Load configuration with the standard layering.
    ///
    /// When `config_file` is given it must exist; otherwise `articast.toml`
    /// in the working directory is used if present.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = RawConfig::builder();

        match config_file {
            Some(path) => {
                let name = path.to_str().ok_or_else(|| {
                    ConfigError::Invalid(format!("Non-UTF8 config path: {}", path.display()))
                })?;
                builder = builder.add_source(File::with_name(name).required(true));
            }
            None => {
                builder = builder.add_source(File::with_name("articast").required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("ARTICAST")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.window_hours == 0 {
            return Err(ConfigError::Invalid(
                "limits.window_hours must be at least 1".to_string(),
            ));
        }

        // Retention must cover the counting window, or pruning on write
        // would delete entries that still count against the quota.
        if self.limits.retention() < self.limits.window() {
            return Err(ConfigError::Invalid(format!(
                "limits.retention_days ({} days) must cover limits.window_hours ({} hours)",
                self.limits.retention_days, self.limits.window_hours
            )));
        }

        if self.board.max_items == 0 {
            return Err(ConfigError::Invalid(
                "board.max_items must be at least 1".to_string(),
            ));
        }

        if self.transcode.sample_rate == 0 || self.transcode.channels == 0 {
            return Err(ConfigError::Invalid(
                "transcode.sample_rate and transcode.channels must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
