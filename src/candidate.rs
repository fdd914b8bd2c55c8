//! Article candidates pulled from the work-item board.

use serde::{Deserialize, Serialize};

/// An article selected for podcast generation.
///
/// A candidate is resumable when the board already holds a reference to an
/// in-progress generation for it, meaning a quota slot was spent in an
/// earlier run and the remaining steps can finish without spending another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Board item identifier
    pub id: String,

    /// Board item name
    pub name: String,

    /// Article URL to generate from
    pub source_url: String,

    /// Reference to an in-progress generation, when one exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_url: Option<String>,

    /// Podcast-fitness score from the board, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness: Option<f64>,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_url: source_url.into(),
            generation_url: None,
            fitness: None,
        }
    }

    pub fn with_generation_url(mut self, url: impl Into<String>) -> Self {
        self.generation_url = Some(url.into());
        self
    }

    pub fn with_fitness(mut self, fitness: f64) -> Self {
        self.fitness = Some(fitness);
        self
    }

    /// Whether this candidate can resume an earlier generation instead of
    /// starting a new one.
    pub fn is_resumable(&self) -> bool {
        self.generation_url
            .as_deref()
            .map_or(false, |url| !url.trim().is_empty())
    }
}
