use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::store::{BallotStore, ElectionRows};
use super::user::Role;
use crate::error::BallotError;

#[derive(Debug, Serialize)]
pub struct ElectionExport {
    pub export_date: DateTime<Utc>,
    pub summary: ExportSummary,
    pub users: Vec<ExportedUser>,
    pub candidates: Vec<ExportedCandidate>,
    pub votes: Vec<ExportedVote>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ExportSummary {
    pub total_users: usize,
    pub total_candidates: usize,
    pub total_votes: usize,
}

#[derive(Debug, Serialize)]
pub struct ExportedUser {
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct ExportedCandidate {
    pub name: String,
    pub position: String,
    pub votes: i64,
}

#[derive(Debug, Serialize)]
pub struct ExportedVote {
    pub username: String,
    pub candidate_name: String,
    pub voted_at: DateTime<Utc>,
}

pub fn export(store: &Arc<dyn BallotStore>) -> Result<ElectionExport, BallotError> {
    let ElectionRows { users, candidates, votes } = store.snapshot()?;

    let usernames: HashMap<_, _> = users.iter().map(|u| (u.id, u.username.as_str())).collect();
    let names: HashMap<_, _> = candidates.iter().map(|c| (c.id, c.name.as_str())).collect();

    let votes: Vec<ExportedVote> = votes
        .into_iter()
        .filter_map(|vote| {
            let username = usernames.get(&vote.voter_id)?;
            let candidate_name = names.get(&vote.candidate_id)?;
            Some(ExportedVote {
                username: (*username).to_owned(),
                candidate_name: (*candidate_name).to_owned(),
                voted_at: vote.voted_at,
            })
        })
        .collect();

    let users: Vec<ExportedUser> = users
        .iter()
        .map(|u| ExportedUser { username: u.username.clone(), role: u.role })
        .collect();
    let candidates: Vec<ExportedCandidate> = candidates
        .iter()
        .map(|c| ExportedCandidate {
            name: c.name.clone(),
            position: c.position.clone(),
            votes: c.votes,
        })
        .collect();

    Ok(ElectionExport {
        export_date: Utc::now(),
        summary: ExportSummary {
            total_users: users.len(),
            total_candidates: candidates.len(),
            total_votes: votes.len(),
        },
        users,
        candidates,
        votes,
    })
}
