use diesel::r2d2::PoolError;
use diesel::result::Error as DbError;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::voting::{CandidateId, UserId};

#[derive(Debug, Error)]
#[error("Validation error: {message}")]
pub struct ValidationError {
    message: String,
}

pub fn candidate_field_missing(field: &str) -> ValidationError {
    ValidationError {
        message: format!("candidate {field} is required"),
    }
}

pub fn photo_not_image(content_type: Option<&str>) -> ValidationError {
    ValidationError {
        message: format!(
            "only image files are allowed, got {}",
            content_type.unwrap_or("no content type")
        ),
    }
}

pub fn photo_too_large(limit: u64) -> ValidationError {
    ValidationError {
        message: format!("file too large, maximum size is {} bytes", limit),
    }
}

pub fn credentials_missing() -> ValidationError {
    ValidationError {
        message: "username and password are required".to_owned(),
    }
}

pub fn form_unreadable(detail: &str) -> ValidationError {
    ValidationError {
        message: format!("could not read form data: {detail}"),
    }
}

/// Failures of the persistence layer; always fatal for the request that hit them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database query failed: {0}")]
    Query(#[from] DbError),
    #[error("database connection unavailable: {0}")]
    Pool(#[from] PoolError),
    #[error("database migration failed: {0}")]
    Migration(String),
    #[error("photo storage failed: {0}")]
    Photo(#[from] std::io::Error),
    #[error("corrupt row in {table}: {message}")]
    CorruptRow { table: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum BallotError {
    #[error("voter {0} has already voted")]
    AlreadyVoted(UserId),
    #[error("candidate {0} not found")]
    CandidateNotFound(CandidateId),
    #[error("voter {0} not found")]
    VoterNotFound(UserId),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DbError> for BallotError {
    fn from(value: DbError) -> Self {
        BallotError::Store(StoreError::Query(value))
    }
}

/// Reasons the server could not come up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ballot(#[from] BallotError),
    #[error("could not prepare upload directory: {0}")]
    Uploads(std::io::Error),
    #[error("startup task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("could not bind server: {0}")]
    Bind(#[from] warp::Error),
}

#[derive(Debug)]
pub struct HttpError {
    pub code: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> HttpError {
        HttpError {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> HttpError {
        HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    #[cfg(test)]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ValidationError> for HttpError {
    fn from(value: ValidationError) -> Self {
        HttpError::new(StatusCode::BAD_REQUEST, value.to_string())
    }
}

impl From<BallotError> for HttpError {
    fn from(value: BallotError) -> Self {
        match value {
            BallotError::AlreadyVoted(_) => {
                HttpError::new(StatusCode::BAD_REQUEST, "User has already voted")
            }
            err @ (BallotError::CandidateNotFound(_) | BallotError::VoterNotFound(_)) => {
                HttpError::new(StatusCode::NOT_FOUND, err.to_string())
            }
            BallotError::InvalidCredentials => {
                HttpError::new(StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
            BallotError::Validation(err) => err.into(),
            BallotError::Store(err) => {
                error!(error = %err, "store failure");
                HttpError::internal("Database error")
            }
        }
    }
}

impl Reply for HttpError {
    fn into_response(self) -> Response {
        let body = reply::json(&json!({ "error": self.message }));
        reply::with_status(body, self.code).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_voted_is_a_bad_request() {
        let err = HttpError::from(BallotError::AlreadyVoted(UserId(1)));
        assert_eq!(err.code, StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "User has already voted");
    }

    #[test]
    fn store_failures_hide_their_details() {
        let err = HttpError::from(BallotError::Store(StoreError::Migration("boom".to_owned())));
        assert_eq!(err.code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Database error");
    }

    #[test]
    fn missing_records_are_not_found() {
        let err = HttpError::from(BallotError::CandidateNotFound(CandidateId(4)));
        assert_eq!(err.code, StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "candidate 4 not found");
    }
}
