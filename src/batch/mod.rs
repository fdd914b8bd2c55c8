//! Batch Pipeline
//!
//! Turns board candidates into published podcast episodes in two phases:
//! audio generation against the notebook service, then conversion and
//! upload to the hosting platform. The orchestrator ties the phases
//! together and folds their outcomes into one reconciled result.

pub mod generation;
pub mod orchestrator;
pub mod outcome;
pub mod publish;
pub mod report;

pub use generation::GenerationRunner;
pub use orchestrator::{BatchContext, BatchOrchestrator};
pub use outcome::{
    BatchResult, CandidateOutcome, FailureReason, GenerationOutcome, ProcessingError,
    ProcessingPhase,
};
pub use publish::PublishRunner;
