use std::collections::HashMap;
use std::convert::TryFrom;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DbError};
use tracing::debug;

use super::models;
use super::schema::{candidates, users, votes};
use super::PgPool;
use crate::error::{BallotError, StoreError};
use crate::voting::{
    BallotStore, Candidate, CandidateId, CreateCandidate, Credentials, ElectionRows, NewUser,
    RecordedVote, User, UserId, Vote,
};

const VOTER_UNIQUE_KEY: &str = "votes_user_id_key";
const VOTER_FOREIGN_KEY: &str = "votes_user_id_fkey";

const REBUILD_COUNTERS: &str = "\
    UPDATE candidates AS c SET vote_count = counted.n \
    FROM (SELECT cc.id, COUNT(v.id)::int4 AS n \
          FROM candidates cc LEFT JOIN votes v ON v.candidate_id = cc.id \
          GROUP BY cc.id) AS counted \
    WHERE counted.id = c.id AND c.vote_count <> counted.n";

/// `BallotStore` backed by PostgreSQL; the one-vote rule is the `votes_user_id_key` index.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> PgStore {
        PgStore { pool }
    }

    fn connection(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, StoreError> {
        Ok(self.pool.get()?)
    }
}

/// Translates the constraint that rejected a vote insert into the matching ballot error.
fn vote_insert_error(err: DbError, voter: UserId, candidate: CandidateId) -> BallotError {
    if let DbError::DatabaseError(kind, info) = &err {
        debug!(?kind, constraint = info.constraint_name(), "vote insert rejected");
        match (kind, info.constraint_name()) {
            (DatabaseErrorKind::UniqueViolation, Some(VOTER_UNIQUE_KEY)) => {
                return BallotError::AlreadyVoted(voter);
            }
            (DatabaseErrorKind::ForeignKeyViolation, Some(VOTER_FOREIGN_KEY)) => {
                return BallotError::VoterNotFound(voter);
            }
            (DatabaseErrorKind::ForeignKeyViolation, _) => {
                return BallotError::CandidateNotFound(candidate);
            }
            _ => {}
        }
    }
    err.into()
}

impl BallotStore for PgStore {
    fn list_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        let mut conn = self.connection()?;
        let rows = candidates::table
            .order((candidates::created_at.desc(), candidates::id.desc()))
            .select(models::Candidate::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Candidate::from).collect())
    }

    fn create_candidate(&self, candidate: CreateCandidate) -> Result<Candidate, StoreError> {
        let mut conn = self.connection()?;
        let row = diesel::insert_into(candidates::table)
            .values(models::CreateCandidate::from(candidate))
            .returning(models::Candidate::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn delete_candidate(&self, id: CandidateId) -> Result<Option<Candidate>, StoreError> {
        let mut conn = self.connection()?;
        // votes go with it through ON DELETE CASCADE
        let removed = diesel::delete(candidates::table.find(id.0))
            .returning(models::Candidate::as_returning())
            .get_result(&mut conn)
            .optional()?;
        Ok(removed.map(Candidate::from))
    }

    fn record_vote(&self, voter: UserId, candidate: CandidateId) -> Result<Vote, BallotError> {
        let mut conn = self.connection()?;
        conn.transaction::<_, BallotError, _>(|conn| {
            let voter_exists: bool =
                diesel::select(diesel::dsl::exists(users::table.find(voter.0))).get_result(conn)?;
            if !voter_exists {
                return Err(BallotError::VoterNotFound(voter));
            }

            let row = diesel::insert_into(votes::table)
                .values(models::CastVote {
                    user_id: voter.0,
                    candidate_id: candidate.0,
                })
                .returning(models::Vote::as_returning())
                .get_result(conn)
                .map_err(|err| vote_insert_error(err, voter, candidate))?;

            let updated = diesel::update(candidates::table.find(candidate.0))
                .set(candidates::vote_count.eq(candidates::vote_count + 1))
                .execute(conn)?;
            if updated != 1 {
                return Err(BallotError::CandidateNotFound(candidate));
            }

            Ok(row.into())
        })
    }

    fn vote_for(&self, voter: UserId) -> Result<Option<RecordedVote>, StoreError> {
        let mut conn = self.connection()?;
        let row = votes::table
            .inner_join(candidates::table)
            .filter(votes::user_id.eq(voter.0))
            .select((models::Vote::as_select(), candidates::name))
            .first::<(models::Vote, String)>(&mut conn)
            .optional()?;
        Ok(row.map(|(vote, candidate_name)| RecordedVote {
            vote: vote.into(),
            candidate_name,
        }))
    }

    fn tally(&self) -> Result<Vec<(Candidate, i64)>, StoreError> {
        let mut conn = self.connection()?;
        let (rows, counts) = conn
            .build_transaction()
            .repeatable_read()
            .read_only()
            .run::<_, DbError, _>(|conn| {
                let rows = candidates::table
                    .order(candidates::id)
                    .select(models::Candidate::as_select())
                    .load(conn)?;
                let counts: Vec<(i32, i64)> = votes::table
                    .group_by(votes::candidate_id)
                    .select((votes::candidate_id, diesel::dsl::count_star()))
                    .load(conn)?;
                Ok((rows, counts))
            })?;

        let counts: HashMap<i32, i64> = counts.into_iter().collect();
        Ok(rows
            .into_iter()
            .map(|row| {
                let count = counts.get(&row.id).copied().unwrap_or(0);
                (Candidate::from(row), count)
            })
            .collect())
    }

    fn rebuild_counters(&self) -> Result<usize, StoreError> {
        let mut conn = self.connection()?;
        Ok(diesel::sql_query(REBUILD_COUNTERS).execute(&mut conn)?)
    }

    fn find_credentials(&self, username: &str) -> Result<Option<Credentials>, StoreError> {
        let mut conn = self.connection()?;
        let row = users::table
            .filter(users::username.eq(username))
            .select(models::User::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(Credentials::try_from).transpose()
    }

    fn count_users(&self) -> Result<i64, StoreError> {
        let mut conn = self.connection()?;
        Ok(users::table.count().get_result(&mut conn)?)
    }

    fn seed_users(&self, new_users: &[NewUser]) -> Result<usize, StoreError> {
        let mut conn = self.connection()?;
        let rows: Vec<models::CreateUser> =
            new_users.iter().map(models::CreateUser::from).collect();
        Ok(diesel::insert_into(users::table)
            .values(&rows)
            .on_conflict(users::username)
            .do_nothing()
            .execute(&mut conn)?)
    }

    fn snapshot(&self) -> Result<ElectionRows, StoreError> {
        let mut conn = self.connection()?;
        let (user_rows, candidate_rows, vote_rows) = conn
            .build_transaction()
            .repeatable_read()
            .read_only()
            .run::<_, DbError, _>(|conn| {
                let user_rows = users::table
                    .order(users::id)
                    .select(models::User::as_select())
                    .load(conn)?;
                let candidate_rows = candidates::table
                    .order((candidates::created_at.desc(), candidates::id.desc()))
                    .select(models::Candidate::as_select())
                    .load(conn)?;
                let vote_rows = votes::table
                    .order(votes::id)
                    .select(models::Vote::as_select())
                    .load(conn)?;
                Ok((user_rows, candidate_rows, vote_rows))
            })?;

        Ok(ElectionRows {
            users: user_rows
                .into_iter()
                .map(User::try_from)
                .collect::<Result<_, _>>()?,
            candidates: candidate_rows.into_iter().map(Candidate::from).collect(),
            votes: vote_rows.into_iter().map(Vote::from).collect(),
        })
    }
}
