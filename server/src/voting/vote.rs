use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::{CandidateId, UserId, VoteId};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Vote {
    pub id: VoteId,
    #[serde(rename = "user_id")]
    pub voter_id: UserId,
    pub candidate_id: CandidateId,
    pub voted_at: DateTime<Utc>,
}

impl Display for Vote {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "(voter {} -> candidate {})", self.voter_id, self.candidate_id)
    }
}

/// A voter's ballot joined with the name of the candidate it went to.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordedVote {
    #[serde(flatten)]
    pub vote: Vote,
    pub candidate_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub has_voted: bool,
    pub vote: Option<RecordedVote>,
}

impl From<Option<RecordedVote>> for VoteStatus {
    fn from(vote: Option<RecordedVote>) -> Self {
        VoteStatus {
            has_voted: vote.is_some(),
            vote,
        }
    }
}
