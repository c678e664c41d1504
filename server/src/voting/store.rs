//! Persistence port for users, candidates and votes.

use super::candidate::{Candidate, CreateCandidate};
use super::id::{CandidateId, UserId};
use super::user::{Credentials, NewUser, User};
use super::vote::{RecordedVote, Vote};
use crate::error::{BallotError, StoreError};

/// Durable storage for the election.
///
/// Implementations own the one-vote-per-voter rule: `record_vote` must reject a
/// second vote atomically (a unique constraint or a single critical section), never
/// through a separate lookup followed by an insert.
pub trait BallotStore: Send + Sync {
    /// All candidates, newest first.
    fn list_candidates(&self) -> Result<Vec<Candidate>, StoreError>;

    fn create_candidate(&self, candidate: CreateCandidate) -> Result<Candidate, StoreError>;

    /// Removes a candidate and every vote cast for it. Returns `None` if the id is unknown.
    fn delete_candidate(&self, id: CandidateId) -> Result<Option<Candidate>, StoreError>;

    /// Inserts the voter's only vote and bumps the candidate's cached counter in one
    /// transaction. Fails with `AlreadyVoted`, `CandidateNotFound` or `VoterNotFound`
    /// without leaving any rows behind.
    fn record_vote(&self, voter: UserId, candidate: CandidateId) -> Result<Vote, BallotError>;

    fn vote_for(&self, voter: UserId) -> Result<Option<RecordedVote>, StoreError>;

    /// Every candidate with the number of vote rows referencing it, read from a
    /// single consistent snapshot.
    fn tally(&self) -> Result<Vec<(Candidate, i64)>, StoreError>;

    /// Resets every cached counter to its vote row count, returning how many were wrong.
    fn rebuild_counters(&self) -> Result<usize, StoreError>;

    fn find_credentials(&self, username: &str) -> Result<Option<Credentials>, StoreError>;

    fn count_users(&self) -> Result<i64, StoreError>;

    /// Inserts users whose username is still free, returning how many were added.
    fn seed_users(&self, users: &[NewUser]) -> Result<usize, StoreError>;

    /// Every user, candidate and vote, read from a single consistent snapshot.
    fn snapshot(&self) -> Result<ElectionRows, StoreError>;
}

/// Full contents of the election, as read by [`BallotStore::snapshot`].
#[derive(Clone, Debug, Default)]
pub struct ElectionRows {
    /// Ordered by id.
    pub users: Vec<User>,
    /// Newest first, like [`BallotStore::list_candidates`].
    pub candidates: Vec<Candidate>,
    /// Ordered by id.
    pub votes: Vec<Vote>,
}
