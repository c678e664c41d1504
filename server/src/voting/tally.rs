use chrono::{DateTime, Utc};
use serde::Serialize;

use super::candidate::Candidate;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateTally {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub vote_count: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    pub evaluated_at: DateTime<Utc>,
    pub candidates: Vec<CandidateTally>,
    pub total_votes: i64,
}

impl Results {
    /// Builds the results from live per-candidate counts.
    ///
    /// Candidates are ordered by vote count descending, then by id ascending so that
    /// equal counts always come back in the same order.
    pub fn evaluate(counts: Vec<(Candidate, i64)>) -> Results {
        let mut candidates: Vec<CandidateTally> = counts
            .into_iter()
            .map(|(candidate, vote_count)| CandidateTally { candidate, vote_count })
            .collect();
        candidates.sort_by(|a, b| {
            b.vote_count
                .cmp(&a.vote_count)
                .then(a.candidate.id.cmp(&b.candidate.id))
        });

        let total_votes = candidates.iter().map(|c| c.vote_count).sum();

        Results {
            evaluated_at: Utc::now(),
            candidates,
            total_votes,
        }
    }

    #[cfg(test)]
    pub fn count_for(&self, name: &str) -> Option<i64> {
        self.candidates
            .iter()
            .find(|c| c.candidate.name == name)
            .map(|c| c.vote_count)
    }
}
