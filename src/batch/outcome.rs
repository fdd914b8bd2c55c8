//! Typed results for batch processing.
//!
//! The phase runners report through these types instead of ad hoc shapes,
//! so every caller has to handle each failure class explicitly.

use crate::candidate::Candidate;
use crate::error::GenerationError;
use crate::podcast::GeneratedPodcast;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a generation attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The upstream service rejected the source itself. A data-quality
    /// verdict: the item gets flagged and never retried.
    InvalidResource,

    /// Any other fault. Reported, but the item stays eligible for a
    /// future run.
    GenericError,
}

/// Result of one candidate's generation attempt.
#[derive(Debug)]
pub enum GenerationOutcome {
    Success {
        podcast: GeneratedPodcast,
    },
    Failure {
        reason: FailureReason,
        error: GenerationError,
    },
}

impl GenerationOutcome {
    /// Classify an error into an outcome. Only the structured
    /// invalid-resource variant maps to `InvalidResource`; everything else
    /// is generic.
    pub fn from_error(error: GenerationError) -> Self {
        let reason = match &error {
            GenerationError::InvalidResource { .. } => FailureReason::InvalidResource,
            _ => FailureReason::GenericError,
        };
        GenerationOutcome::Failure { reason, error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success { .. })
    }
}

/// A candidate paired with what the generation phase made of it.
#[derive(Debug)]
pub struct CandidateOutcome {
    pub candidate: Candidate,
    pub outcome: GenerationOutcome,
}

/// Which part of the pipeline an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingPhase {
    Generation,
    Upload,
    InvalidResource,
}

impl From<FailureReason> for ProcessingPhase {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::InvalidResource => ProcessingPhase::InvalidResource,
            FailureReason::GenericError => ProcessingPhase::Generation,
        }
    }
}

impl fmt::Display for ProcessingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingPhase::Generation => write!(f, "generation"),
            ProcessingPhase::Upload => write!(f, "upload"),
            ProcessingPhase::InvalidResource => write!(f, "invalid_resource"),
        }
    }
}

/// One per-item failure in the batch report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingError {
    /// Source URL of the affected candidate
    pub url: String,
    pub phase: ProcessingPhase,
    pub message: String,
}

impl ProcessingError {
    pub fn new(url: impl Into<String>, phase: ProcessingPhase, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            phase,
            message: message.into(),
        }
    }
}

/// Full accounting of one batch run. Built incrementally across both
/// phases; immutable once handed to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Run identifier shared with the rate-limit log
    pub run_id: String,

    /// Candidates actually processed this run (quota-deferred ones are
    /// not counted and not reported)
    pub total_candidates: usize,

    pub successful_generations: usize,
    pub successful_uploads: usize,

    /// Per-item failures in processing order: generation phase first,
    /// then upload phase
    pub errors: Vec<ProcessingError>,
}

impl BatchResult {
    pub fn empty(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Self::default()
        }
    }

    pub fn generation_errors(&self) -> Vec<&ProcessingError> {
        self.errors_in_phase(ProcessingPhase::Generation)
    }

    pub fn upload_errors(&self) -> Vec<&ProcessingError> {
        self.errors_in_phase(ProcessingPhase::Upload)
    }

    pub fn invalid_resources(&self) -> Vec<&ProcessingError> {
        self.errors_in_phase(ProcessingPhase::InvalidResource)
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn errors_in_phase(&self, phase: ProcessingPhase) -> Vec<&ProcessingError> {
        self.errors
            .iter()
            .filter(|error| error.phase == phase)
            .collect()
    }
}
