use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::photos;
use crate::voting::{Candidate, CandidateId, CandidateTally, Results, User, UserId};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub user_id: UserId,
    pub candidate_id: CandidateId,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct Success {
    pub success: bool,
}

impl Success {
    pub const fn ok() -> Success {
        Success { success: true }
    }
}

#[derive(Serialize)]
pub struct CandidateView {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub photo_url: String,
}

impl From<Candidate> for CandidateView {
    fn from(candidate: Candidate) -> Self {
        let photo_url = photos::url(candidate.photo_path.as_deref());
        CandidateView { candidate, photo_url }
    }
}

#[derive(Serialize)]
pub struct CandidateCreated {
    pub success: bool,
    pub candidate: CandidateView,
}

#[derive(Serialize)]
pub struct LoggedIn {
    pub success: bool,
    pub user: User,
}

#[derive(Serialize)]
pub struct UsersCount {
    pub count: i64,
}

#[derive(Serialize)]
pub struct TallyView {
    #[serde(flatten)]
    pub tally: CandidateTally,
    pub photo_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsView {
    pub evaluated_at: DateTime<Utc>,
    pub candidates: Vec<TallyView>,
    pub total_votes: i64,
}

impl From<Results> for ResultsView {
    fn from(Results { evaluated_at, candidates, total_votes }: Results) -> Self {
        let candidates = candidates
            .into_iter()
            .map(|tally| TallyView {
                photo_url: photos::url(tally.candidate.photo_path.as_deref()),
                tally,
            })
            .collect();
        ResultsView { evaluated_at, candidates, total_votes }
    }
}

#[derive(Serialize)]
pub struct Health<'a> {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub environment: &'a str,
}
