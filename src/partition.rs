//! Candidate Partitioning
//!
//! Splits fetched candidates into work that resumes an earlier generation
//! and work that starts a new one, with the new starts capped by the
//! remaining quota. Pure: no clock, no filesystem, no network.

use crate::candidate::Candidate;

/// Result of splitting a batch of candidates against the quota.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionedCandidates {
    /// Candidates with an in-progress generation to pick up. These spent
    /// their quota slot in an earlier run, so they always pass through.
    pub to_resume: Vec<Candidate>,

    /// Candidates starting a new generation, capped at the remaining slots.
    pub to_start: Vec<Candidate>,
}

impl PartitionedCandidates {
    pub fn is_empty(&self) -> bool {
        self.to_resume.is_empty() && self.to_start.is_empty()
    }

    pub fn total(&self) -> usize {
        self.to_resume.len() + self.to_start.len()
    }
}

/// Partition `candidates`, keeping at most `remaining_slots` new starts.
///
/// Relative order is preserved within each group. Candidates beyond the
/// quota are dropped without an error; they stay on the board for a later
/// run to pick up.
pub fn partition_candidates(
    candidates: Vec<Candidate>,
    remaining_slots: u32,
) -> PartitionedCandidates {
    let mut to_resume = Vec::new();
    let mut to_start = Vec::new();

    for candidate in candidates {
        if candidate.is_resumable() {
            to_resume.push(candidate);
        } else if to_start.len() < remaining_slots as usize {
            to_start.push(candidate);
        }
    }

    PartitionedCandidates {
        to_resume,
        to_start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(id: &str) -> Candidate {
        Candidate::new(id, format!("Item {id}"), format!("https://example.com/{id}"))
    }

    fn resumable(id: &str) -> Candidate {
        fresh(id).with_generation_url(format!("https://notebooklm.google.com/notebook/{id}"))
    }

    #[test]
    fn test_mixed_candidates_split_by_reference() {
        let partition = partition_candidates(
            vec![fresh("1"), resumable("2"), fresh("3"), resumable("4")],
            5,
        );

        let resume_ids: Vec<&str> = partition.to_resume.iter().map(|c| c.id.as_str()).collect();
        let start_ids: Vec<&str> = partition.to_start.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(resume_ids, vec!["2", "4"]);
        assert_eq!(start_ids, vec!["1", "3"]);
    }

    #[test]
    fn test_new_starts_capped_by_slots() {
        let partition =
            partition_candidates(vec![fresh("1"), fresh("2"), fresh("3"), fresh("4")], 2);

        assert_eq!(partition.to_start.len(), 2);
        let start_ids: Vec<&str> = partition.to_start.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(start_ids, vec!["1", "2"]);
    }

    #[test]
    fn test_zero_slots_still_passes_resumable() {
        let partition = partition_candidates(vec![fresh("1"), resumable("2"), fresh("3")], 0);

        assert!(partition.to_start.is_empty());
        assert_eq!(partition.to_resume.len(), 1);
        assert_eq!(partition.to_resume[0].id, "2");
    }

    #[test]
    fn test_resumable_never_counts_against_slots() {
        let partition = partition_candidates(
            vec![resumable("1"), resumable("2"), fresh("3"), fresh("4")],
            1,
        );

        assert_eq!(partition.to_resume.len(), 2);
        assert_eq!(partition.to_start.len(), 1);
        assert_eq!(partition.to_start[0].id, "3");
    }

    #[test]
    fn test_empty_input_yields_empty_partition() {
        let partition = partition_candidates(vec![], 3);
        assert!(partition.is_empty());
        assert_eq!(partition.total(), 0);
    }
}
