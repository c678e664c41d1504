use std::convert::TryFrom;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::candidate::{Candidate, CreateCandidate, UnvalidatedCreateCandidate};
use super::id::{CandidateId, UserId};
use super::store::BallotStore;
use super::tally::Results;
use super::vote::{Vote, VoteStatus};
use crate::error::BallotError;

/// The voter-facing half of the election.
#[derive(Clone)]
pub struct VoteService {
    store: Arc<dyn BallotStore>,
}

impl VoteService {
    pub fn new(store: Arc<dyn BallotStore>) -> VoteService {
        VoteService { store }
    }

    /// Records `voter`'s single vote. Never retried: a repeat of a request that already
    /// succeeded is answered with `AlreadyVoted`.
    pub fn cast_vote(&self, voter: UserId, candidate: CandidateId) -> Result<Vote, BallotError> {
        match self.store.record_vote(voter, candidate) {
            Ok(vote) => {
                info!(vote_id = %vote.id, "vote recorded {vote}");
                Ok(vote)
            }
            Err(err @ BallotError::AlreadyVoted(_)) => {
                debug!(%voter, %candidate, "duplicate vote rejected");
                Err(err)
            }
            Err(err) => {
                warn!(%voter, %candidate, error = %err, "vote not recorded");
                Err(err)
            }
        }
    }

    pub fn vote_status(&self, voter: UserId) -> Result<VoteStatus, BallotError> {
        Ok(VoteStatus::from(self.store.vote_for(voter)?))
    }

    pub fn results(&self) -> Result<Results, BallotError> {
        Ok(Results::evaluate(self.store.tally()?))
    }
}

/// Admin-only candidate lifecycle.
#[derive(Clone)]
pub struct CandidateAdmin {
    store: Arc<dyn BallotStore>,
}

impl CandidateAdmin {
    pub fn new(store: Arc<dyn BallotStore>) -> CandidateAdmin {
        CandidateAdmin { store }
    }

    pub fn list(&self) -> Result<Vec<Candidate>, BallotError> {
        Ok(self.store.list_candidates()?)
    }

    pub fn add(&self, candidate: UnvalidatedCreateCandidate) -> Result<Candidate, BallotError> {
        let candidate = CreateCandidate::try_from(candidate)?;
        let created = self.store.create_candidate(candidate)?;
        info!(candidate = %created.id, name = %created.name, "candidate added");
        Ok(created)
    }

    /// Deletes the candidate together with its votes; those voters may vote again.
    pub fn remove(&self, id: CandidateId) -> Result<Candidate, BallotError> {
        let removed = self
            .store
            .delete_candidate(id)?
            .ok_or(BallotError::CandidateNotFound(id))?;
        info!(candidate = %id, discarded_votes = removed.votes, "candidate removed");
        Ok(removed)
    }

    pub fn rebuild_counters(&self) -> Result<usize, BallotError> {
        let corrected = self.store.rebuild_counters()?;
        if corrected > 0 {
            warn!(corrected, "cached vote counters disagreed with vote rows");
        }
        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::voting::{MemoryStore, NewUser, Role};

    struct Election {
        votes: VoteService,
        admin: CandidateAdmin,
    }

    impl Election {
        fn add(&self, name: &str) -> CandidateId {
            self.admin
                .add(UnvalidatedCreateCandidate {
                    name: Some(name.to_owned()),
                    position: Some("President".to_owned()),
                    photo_path: None,
                })
                .unwrap()
                .id
        }

        fn assert_consistent(&self) {
            let results = self.votes.results().unwrap();
            let summed: i64 = results.candidates.iter().map(|c| c.vote_count).sum();
            assert_eq!(results.total_votes, summed);

            let rows = self.admin.store.snapshot().unwrap().votes.len() as i64;
            assert_eq!(results.total_votes, rows);
        }
    }

    #[fixture]
    fn election() -> Election {
        let store = Arc::new(MemoryStore::new());
        let voters: Vec<NewUser> = (1..=10)
            .map(|i| NewUser {
                username: format!("v{i}"),
                password_hash: String::new(),
                role: Role::Voter,
            })
            .collect();
        store.seed_users(&voters).unwrap();

        Election {
            votes: VoteService::new(store.clone()),
            admin: CandidateAdmin::new(store),
        }
    }

    #[rstest]
    fn single_voter_walkthrough(election: Election) {
        let ada = election.add("Ada");
        let v1 = UserId(1);

        let results = election.votes.results().unwrap();
        assert_eq!(results.count_for("Ada"), Some(0));
        assert_eq!(results.total_votes, 0);

        election.votes.cast_vote(v1, ada).unwrap();

        let status = election.votes.vote_status(v1).unwrap();
        assert!(status.has_voted);
        let vote = status.vote.unwrap();
        assert_eq!(vote.vote.candidate_id, ada);
        assert_eq!(vote.candidate_name, "Ada");

        let results = election.votes.results().unwrap();
        assert_eq!(results.count_for("Ada"), Some(1));
        assert_eq!(results.total_votes, 1);

        let bob = election.add("Bob");
        for candidate in [ada, bob] {
            let err = election.votes.cast_vote(v1, candidate).unwrap_err();
            assert!(matches!(err, BallotError::AlreadyVoted(_)));
        }
        assert_eq!(election.votes.results().unwrap().total_votes, 1);
        election.assert_consistent();
    }

    #[rstest]
    fn results_are_ordered_by_votes(election: Election) {
        let b = election.add("B");
        let a = election.add("A");
        for voter in 1..=3 {
            election.votes.cast_vote(UserId(voter), a).unwrap();
        }
        election.votes.cast_vote(UserId(4), b).unwrap();

        let results = election.votes.results().unwrap();
        let names: Vec<&str> =
            results.candidates.iter().map(|c| c.candidate.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(results.total_votes, 4);
        election.assert_consistent();
    }

    #[rstest]
    fn unvoted_voter_has_no_status(election: Election) {
        let status = election.votes.vote_status(UserId(2)).unwrap();
        assert!(!status.has_voted);
        assert!(status.vote.is_none());
    }

    #[rstest]
    #[case(UserId(1), CandidateId(999))]
    #[case(UserId(999), CandidateId(1))]
    fn failed_casts_leave_no_rows(
        election: Election,
        #[case] voter: UserId,
        #[case] candidate: CandidateId,
    ) {
        election.add("Ada");
        assert!(election.votes.cast_vote(voter, candidate).is_err());
        assert_eq!(election.votes.results().unwrap().total_votes, 0);
        assert!(!election.votes.vote_status(voter).unwrap().has_voted);
    }

    #[rstest]
    fn removing_a_candidate_drops_its_votes(election: Election) {
        let ada = election.add("Ada");
        let bob = election.add("Bob");
        election.votes.cast_vote(UserId(1), ada).unwrap();
        election.votes.cast_vote(UserId(2), ada).unwrap();
        election.votes.cast_vote(UserId(3), bob).unwrap();

        election.admin.remove(ada).unwrap();

        let results = election.votes.results().unwrap();
        assert_eq!(results.count_for("Ada"), None);
        assert_eq!(results.total_votes, 1);
        election.assert_consistent();

        // freed voters may vote again
        election.votes.cast_vote(UserId(1), bob).unwrap();
        assert!(matches!(election.admin.remove(ada), Err(BallotError::CandidateNotFound(_))));
    }

    #[rstest]
    fn blank_candidate_fields_are_rejected(election: Election) {
        let err = election
            .admin
            .add(UnvalidatedCreateCandidate {
                name: Some(" ".to_owned()),
                position: Some("President".to_owned()),
                photo_path: None,
            })
            .unwrap_err();
        assert!(matches!(err, BallotError::Validation(_)));
        assert!(election.admin.list().unwrap().is_empty());
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn concurrent_casts_by_one_voter_succeed_once(
        election: Election,
        #[case] spread_candidates: bool,
    ) {
        const ATTEMPTS: usize = 16;
        let candidates = [election.add("Ada"), election.add("Bob")];
        let barrier = Arc::new(Barrier::new(ATTEMPTS));

        let handles: Vec<_> = (0..ATTEMPTS)
            .map(|i| {
                let votes = election.votes.clone();
                let barrier = barrier.clone();
                let candidate = if spread_candidates { candidates[i % 2] } else { candidates[0] };
                thread::spawn(move || {
                    barrier.wait();
                    votes.cast_vote(UserId(5), candidate)
                })
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let successes = outcomes.iter().filter(|o| o.is_ok()).count();
        let duplicates = outcomes
            .iter()
            .filter(|o| matches!(o, Err(BallotError::AlreadyVoted(_))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(duplicates, ATTEMPTS - 1);
        assert_eq!(election.votes.results().unwrap().total_votes, 1);
        election.assert_consistent();
    }

    #[rstest]
    fn different_voters_vote_in_parallel(election: Election) {
        let ada = election.add("Ada");
        let handles: Vec<_> = (1..=10)
            .map(|voter| {
                let votes = election.votes.clone();
                thread::spawn(move || votes.cast_vote(UserId(voter), ada))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let results = election.votes.results().unwrap();
        assert_eq!(results.count_for("Ada"), Some(10));
        assert_eq!(election.admin.list().unwrap()[0].votes, 10);
        election.assert_consistent();
    }
}
