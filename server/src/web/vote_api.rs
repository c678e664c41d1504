use std::convert::Infallible;

use warp::http::StatusCode;
use warp::reply::Response;

use super::models::{CastVoteRequest, Success};
use super::{blocking, respond, AppState};
use crate::voting::UserId;

/// POST /api/vote
pub async fn cast(state: AppState, request: CastVoteRequest) -> Result<Response, Infallible> {
    let votes = state.votes.clone();
    let CastVoteRequest { user_id, candidate_id } = request;
    let cast = blocking(move || votes.cast_vote(user_id, candidate_id)).await;
    Ok(respond(cast.map(|_| Success::ok()), StatusCode::OK))
}

/// GET /api/vote-status/:user_id
pub async fn status(user_id: i32, state: AppState) -> Result<Response, Infallible> {
    let votes = state.votes.clone();
    let status = blocking(move || votes.vote_status(UserId(user_id))).await;
    Ok(respond(status, StatusCode::OK))
}
