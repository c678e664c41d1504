use std::convert::Infallible;

use chrono::Utc;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use super::models::{Health, LoggedIn, LoginRequest, UsersCount};
use super::{blocking, respond, AppState};

/// POST /api/login
pub async fn login(state: AppState, request: LoginRequest) -> Result<Response, Infallible> {
    let accounts = state.accounts.clone();
    let LoginRequest { username, password } = request;
    let user = blocking(move || accounts.login(&username, &password))
        .await
        .map(|user| LoggedIn { success: true, user });
    Ok(respond(user, StatusCode::OK))
}

/// GET /api/users-count
pub async fn users_count(state: AppState) -> Result<Response, Infallible> {
    let accounts = state.accounts.clone();
    let count = blocking(move || accounts.users_count())
        .await
        .map(|count| UsersCount { count });
    Ok(respond(count, StatusCode::OK))
}

/// GET /api/health
pub async fn health(state: AppState) -> Result<Response, Infallible> {
    let health = Health {
        status: "healthy",
        timestamp: Utc::now(),
        environment: &state.environment,
    };
    Ok(reply::json(&health).into_response())
}
