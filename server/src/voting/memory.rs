//! In-process `BallotStore` for tests and for runs without a `DATABASE_URL`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use super::candidate::{Candidate, CreateCandidate};
use super::id::{CandidateId, UserId, VoteId};
use super::store::{BallotStore, ElectionRows};
use super::user::{Credentials, NewUser, User};
use super::vote::{RecordedVote, Vote};
use crate::error::{BallotError, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, Credentials>,
    candidates: BTreeMap<CandidateId, Candidate>,
    votes: BTreeMap<VoteId, Vote>,
    // unique key on the voter column
    votes_by_voter: HashMap<UserId, VoteId>,
    last_user_id: i32,
    last_candidate_id: i32,
    last_vote_id: i32,
}

impl Tables {
    fn count_votes_for(&self, candidate: CandidateId) -> i64 {
        self.votes.values().filter(|v| v.candidate_id == candidate).count() as i64
    }

    fn candidates_newest_first(&self) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self.candidates.values().cloned().collect();
        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        candidates
    }
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // a panicking writer never leaves a table half-updated, so the data stays usable
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn overwrite_cached_votes(&self, id: CandidateId, votes: i64) {
        if let Some(candidate) = self.tables().candidates.get_mut(&id) {
            candidate.votes = votes;
        }
    }
}

impl BallotStore for MemoryStore {
    fn list_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        Ok(self.tables().candidates_newest_first())
    }

    fn create_candidate(&self, candidate: CreateCandidate) -> Result<Candidate, StoreError> {
        let mut tables = self.tables();
        tables.last_candidate_id += 1;
        let created = Candidate {
            id: CandidateId(tables.last_candidate_id),
            name: candidate.name,
            position: candidate.position,
            photo_path: candidate.photo_path,
            votes: 0,
            created_at: Utc::now(),
        };
        tables.candidates.insert(created.id, created.clone());
        Ok(created)
    }

    fn delete_candidate(&self, id: CandidateId) -> Result<Option<Candidate>, StoreError> {
        let mut tables = self.tables();
        let Some(removed) = tables.candidates.remove(&id) else {
            return Ok(None);
        };

        let orphaned: Vec<(VoteId, UserId)> = tables
            .votes
            .values()
            .filter(|v| v.candidate_id == id)
            .map(|v| (v.id, v.voter_id))
            .collect();
        for (vote_id, voter_id) in orphaned {
            tables.votes.remove(&vote_id);
            tables.votes_by_voter.remove(&voter_id);
        }

        Ok(Some(removed))
    }

    fn record_vote(&self, voter: UserId, candidate: CandidateId) -> Result<Vote, BallotError> {
        let mut tables = self.tables();

        if !tables.users.contains_key(&voter) {
            return Err(BallotError::VoterNotFound(voter));
        }
        if tables.votes_by_voter.contains_key(&voter) {
            return Err(BallotError::AlreadyVoted(voter));
        }
        let Some(target) = tables.candidates.get_mut(&candidate) else {
            return Err(BallotError::CandidateNotFound(candidate));
        };
        target.votes += 1;

        tables.last_vote_id += 1;
        let vote = Vote {
            id: VoteId(tables.last_vote_id),
            voter_id: voter,
            candidate_id: candidate,
            voted_at: Utc::now(),
        };
        tables.votes_by_voter.insert(voter, vote.id);
        tables.votes.insert(vote.id, vote.clone());
        Ok(vote)
    }

    fn vote_for(&self, voter: UserId) -> Result<Option<RecordedVote>, StoreError> {
        let tables = self.tables();
        let recorded = tables
            .votes_by_voter
            .get(&voter)
            .and_then(|id| tables.votes.get(id))
            .and_then(|vote| {
                tables.candidates.get(&vote.candidate_id).map(|candidate| RecordedVote {
                    vote: vote.clone(),
                    candidate_name: candidate.name.clone(),
                })
            });
        Ok(recorded)
    }

    fn tally(&self) -> Result<Vec<(Candidate, i64)>, StoreError> {
        let tables = self.tables();
        Ok(tables
            .candidates
            .values()
            .map(|c| (c.clone(), tables.count_votes_for(c.id)))
            .collect())
    }

    fn rebuild_counters(&self) -> Result<usize, StoreError> {
        let mut tables = self.tables();
        let actual: Vec<(CandidateId, i64)> = tables
            .candidates
            .keys()
            .map(|id| (*id, tables.count_votes_for(*id)))
            .collect();

        let mut corrected = 0;
        for (id, count) in actual {
            if let Some(candidate) = tables.candidates.get_mut(&id) {
                if candidate.votes != count {
                    candidate.votes = count;
                    corrected += 1;
                }
            }
        }
        Ok(corrected)
    }

    fn find_credentials(&self, username: &str) -> Result<Option<Credentials>, StoreError> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|c| c.user.username == username)
            .cloned())
    }

    fn count_users(&self) -> Result<i64, StoreError> {
        Ok(self.tables().users.len() as i64)
    }

    fn seed_users(&self, users: &[NewUser]) -> Result<usize, StoreError> {
        let mut tables = self.tables();
        let mut inserted = 0;
        for new_user in users {
            if tables.users.values().any(|c| c.user.username == new_user.username) {
                continue;
            }
            tables.last_user_id += 1;
            let id = UserId(tables.last_user_id);
            tables.users.insert(id, Credentials {
                user: User::new(id, new_user.username.clone(), new_user.role),
                password_hash: new_user.password_hash.clone(),
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    fn snapshot(&self) -> Result<ElectionRows, StoreError> {
        let tables = self.tables();
        Ok(ElectionRows {
            users: tables.users.values().map(|c| c.user.clone()).collect(),
            candidates: tables.candidates_newest_first(),
            votes: tables.votes.values().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::voting::Role;

    #[fixture]
    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        let users: Vec<NewUser> = ["v1", "v2", "v3"]
            .iter()
            .map(|name| NewUser {
                username: (*name).to_owned(),
                password_hash: String::new(),
                role: Role::Voter,
            })
            .collect();
        store.seed_users(&users).unwrap();
        store
    }

    fn add(store: &MemoryStore, name: &str) -> CandidateId {
        store
            .create_candidate(CreateCandidate {
                name: name.to_owned(),
                position: "President".to_owned(),
                photo_path: None,
            })
            .unwrap()
            .id
    }

    #[rstest]
    fn seeding_skips_taken_usernames(store: MemoryStore) {
        let again = vec![
            NewUser { username: "v1".to_owned(), password_hash: String::new(), role: Role::Voter },
            NewUser { username: "v4".to_owned(), password_hash: String::new(), role: Role::Voter },
        ];
        assert_eq!(store.seed_users(&again).unwrap(), 1);
        assert_eq!(store.count_users().unwrap(), 4);
    }

    #[rstest]
    fn second_vote_is_rejected_without_side_effects(store: MemoryStore) {
        let ada = add(&store, "Ada");
        let bob = add(&store, "Bob");

        store.record_vote(UserId(1), ada).unwrap();
        let err = store.record_vote(UserId(1), bob).unwrap_err();

        assert!(matches!(err, BallotError::AlreadyVoted(UserId(1))));
        assert_eq!(store.snapshot().unwrap().votes.len(), 1);
        let counts: Vec<i64> = store.tally().unwrap().into_iter().map(|(_, n)| n).collect();
        assert_eq!(counts, [1, 0]);
    }

    #[rstest]
    fn unknown_voter_and_candidate_are_reported(store: MemoryStore) {
        let ada = add(&store, "Ada");

        assert!(matches!(
            store.record_vote(UserId(99), ada),
            Err(BallotError::VoterNotFound(UserId(99)))
        ));
        assert!(matches!(
            store.record_vote(UserId(1), CandidateId(42)),
            Err(BallotError::CandidateNotFound(CandidateId(42)))
        ));
        assert!(store.snapshot().unwrap().votes.is_empty());
    }

    #[rstest]
    fn deleting_a_candidate_frees_its_voters(store: MemoryStore) {
        let ada = add(&store, "Ada");
        let bob = add(&store, "Bob");
        store.record_vote(UserId(1), ada).unwrap();
        store.record_vote(UserId(2), bob).unwrap();

        let removed = store.delete_candidate(ada).unwrap();
        assert_eq!(removed.map(|c| c.name), Some("Ada".to_owned()));
        assert_eq!(store.vote_for(UserId(1)).unwrap(), None);
        assert_eq!(store.snapshot().unwrap().votes.len(), 1);

        store.record_vote(UserId(1), bob).unwrap();
        assert_eq!(store.delete_candidate(ada).unwrap(), None);
    }

    #[rstest]
    fn candidates_are_listed_newest_first(store: MemoryStore) {
        add(&store, "First");
        add(&store, "Second");
        let names: Vec<String> =
            store.list_candidates().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["Second", "First"]);
    }

    #[rstest]
    fn counters_are_rebuilt_from_vote_rows(store: MemoryStore) {
        let ada = add(&store, "Ada");
        store.record_vote(UserId(1), ada).unwrap();
        store.overwrite_cached_votes(ada, 17);

        assert_eq!(store.rebuild_counters().unwrap(), 1);
        assert_eq!(store.list_candidates().unwrap()[0].votes, 1);
        assert_eq!(store.rebuild_counters().unwrap(), 0);
    }
}
