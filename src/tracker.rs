//! Rate Limit Tracking
//!
//! Persistent, append-only log of generation triggers, used to enforce the
//! upstream service's rolling quota across process restarts. Every write
//! prunes entries past the retention window, so the log stays a bounded
//! audit trail rather than growing forever.

use crate::config::LimitsConfig;
use crate::error::TrackerError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One recorded generation trigger.
///
/// Field names stay camelCase on disk so logs written by earlier tooling
/// keep counting against the quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationEntry {
    /// When the generation was triggered
    pub timestamp: DateTime<Utc>,

    /// Run that triggered it
    #[serde(rename = "runId")]
    pub run_id: String,

    /// Article the generation was for
    #[serde(rename = "resourceUrl")]
    pub resource_url: String,
}

/// On-disk log shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GenerationLog {
    entries: Vec<GenerationEntry>,
}

/// Tracks generation triggers against a rolling quota.
///
/// A missing log file means no generations have been recorded; an unreadable
/// or corrupt file is an error, since guessing at the count could blow the
/// upstream limit.
pub struct RateLimitTracker {
    log_path: PathBuf,
    limits: LimitsConfig,
    run_id: String,
}

impl RateLimitTracker {
    /// Create a tracker over the log at `log_path`.
    ///
    /// The run identifier is derived once from the current time, so every
    /// entry recorded through this instance shares it.
    pub fn new(log_path: impl Into<PathBuf>, limits: LimitsConfig) -> Self {
        let run_id = Utc::now()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        Self {
            log_path: log_path.into(),
            limits,
            run_id,
        }
    }

    /// Identifier shared by all entries this instance records.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Path of the underlying log file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Remaining new generations in the current rolling window.
    ///
    /// An exhausted quota is a normal outcome and returns zero; only an
    /// unreadable or corrupt log is an error.
    pub fn validate_rate_limit(&self) -> Result<u32, TrackerError> {
        let log = self.read_log()?;
        let cutoff = Utc::now() - self.limits.window();
        let used = log
            .entries
            .iter()
            .filter(|entry| entry.timestamp > cutoff)
            .count() as u32;
        let remaining = self.limits.count.saturating_sub(used);

        debug!(
            used,
            remaining,
            window_hours = self.limits.window_hours,
            "Rate limit check"
        );
        Ok(remaining)
    }

    /// Entries inside the current rolling window, oldest first.
    pub fn window_entries(&self) -> Result<Vec<GenerationEntry>, TrackerError> {
        let log = self.read_log()?;
        let cutoff = Utc::now() - self.limits.window();
        Ok(log
            .entries
            .into_iter()
            .filter(|entry| entry.timestamp > cutoff)
            .collect())
    }

    /// Record a generation trigger for `resource_url`.
    ///
    /// Appends an entry stamped with the current time and this run's
    /// identifier, prunes entries past the retention window, and persists.
    /// A failed write is an error: losing the record would let later runs
    /// overrun the quota.
    pub fn record_audio_generation(&self, resource_url: &str) -> Result<(), TrackerError> {
        let mut log = self.read_log()?;
        let now = Utc::now();

        log.entries.push(GenerationEntry {
            timestamp: now,
            run_id: self.run_id.clone(),
            resource_url: resource_url.to_string(),
        });

        let cutoff = now - self.limits.retention();
        log.entries.retain(|entry| entry.timestamp > cutoff);

        self.write_log(&log)?;
        info!(
            resource_url,
            run_id = %self.run_id,
            entries = log.entries.len(),
            "Recorded audio generation"
        );
        Ok(())
    }

    fn read_log(&self) -> Result<GenerationLog, TrackerError> {
        if !self.log_path.exists() {
            return Ok(GenerationLog::default());
        }

        let raw = fs::read_to_string(&self.log_path).map_err(|e| TrackerError::ReadFailed {
            path: self.log_path.clone(),
            source: e,
        })?;

        serde_json::from_str(&raw).map_err(|e| TrackerError::CorruptLog {
            path: self.log_path.clone(),
            reason: e.to_string(),
        })
    }

    fn write_log(&self, log: &GenerationLog) -> Result<(), TrackerError> {
        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent).map_err(|e| TrackerError::WriteFailed {
                path: self.log_path.clone(),
                source: e,
            })?;
        }

        let serialized = serde_json::to_string_pretty(log).map_err(|e| {
            TrackerError::WriteFailed {
                path: self.log_path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            }
        })?;

        // Temp file + rename keeps the log intact if the write dies midway.
        let temp_path = self.log_path.with_extension("json.tmp");
        fs::write(&temp_path, serialized).map_err(|e| TrackerError::WriteFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, &self.log_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            TrackerError::WriteFailed {
                path: self.log_path.clone(),
                source: e,
            }
        })?;

        Ok(())
    }
}
