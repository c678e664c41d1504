use std::convert::TryFrom;

use chrono::NaiveDateTime;
use diesel::prelude::*;

use super::schema;
use crate::error::StoreError;
use crate::voting;

#[derive(Identifiable, Queryable, Selectable)]
#[diesel(table_name = schema::candidates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Candidate {
    pub id: i32,
    pub name: String,
    pub position: String,
    pub photo_path: Option<String>,
    pub vote_count: i32,
    pub created_at: NaiveDateTime,
}

impl From<Candidate> for voting::Candidate {
    fn from(value: Candidate) -> Self {
        voting::Candidate {
            id: voting::CandidateId(value.id),
            name: value.name,
            position: value.position,
            photo_path: value.photo_path,
            votes: i64::from(value.vote_count),
            created_at: value.created_at.and_utc(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::candidates)]
pub struct CreateCandidate {
    pub name: String,
    pub position: String,
    pub photo_path: Option<String>,
}

impl From<voting::CreateCandidate> for CreateCandidate {
    fn from(value: voting::CreateCandidate) -> Self {
        let voting::CreateCandidate { name, position, photo_path } = value;
        Self { name, position, photo_path }
    }
}

#[derive(Identifiable, Queryable, Selectable)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

impl TryFrom<User> for voting::Credentials {
    type Error = StoreError;

    fn try_from(value: User) -> Result<Self, Self::Error> {
        let role = value.role.parse().map_err(|message| StoreError::CorruptRow {
            table: "users",
            message,
        })?;

        Ok(voting::Credentials {
            user: voting::User::new(voting::UserId(value.id), value.username, role),
            password_hash: value.password_hash,
        })
    }
}

impl TryFrom<User> for voting::User {
    type Error = StoreError;

    fn try_from(value: User) -> Result<Self, Self::Error> {
        voting::Credentials::try_from(value).map(|credentials| credentials.user)
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::users)]
pub struct CreateUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
}

impl<'a> From<&'a voting::NewUser> for CreateUser<'a> {
    fn from(value: &'a voting::NewUser) -> Self {
        Self {
            username: &value.username,
            password_hash: &value.password_hash,
            role: value.role.as_str(),
        }
    }
}

#[derive(Associations, Identifiable, Queryable, Selectable)]
#[diesel(table_name = schema::votes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(belongs_to(Candidate, foreign_key = candidate_id))]
pub struct Vote {
    pub id: i32,
    pub user_id: i32,
    pub candidate_id: i32,
    pub voted_at: NaiveDateTime,
}

impl From<Vote> for voting::Vote {
    fn from(value: Vote) -> Self {
        voting::Vote {
            id: voting::VoteId(value.id),
            voter_id: voting::UserId(value.user_id),
            candidate_id: voting::CandidateId(value.candidate_id),
            voted_at: value.voted_at.and_utc(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::votes)]
pub struct CastVote {
    pub user_id: i32,
    pub candidate_id: i32,
}
