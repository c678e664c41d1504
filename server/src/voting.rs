mod accounts;
mod candidate;
mod export;
mod id;
mod memory;
mod service;
mod store;
mod tally;
mod user;
mod vote;

pub use accounts::{hash_password, Accounts, Roster};
pub use candidate::{Candidate, CreateCandidate, UnvalidatedCreateCandidate};
pub use export::export;
pub use id::{CandidateId, UserId, VoteId};
pub use memory::MemoryStore;
pub use service::{CandidateAdmin, VoteService};
pub use store::{BallotStore, ElectionRows};
pub use tally::{CandidateTally, Results};
pub use user::{Credentials, NewUser, Role, User};
pub use vote::{RecordedVote, Vote};
