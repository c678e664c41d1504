mod candidate_api;
pub mod db;
mod models;
mod photos;
mod result_api;
mod user_api;
mod vote_api;


use std::convert::Infallible;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info, warn};
use warp::filters::body::BodyDeserializeError;
use warp::http::{StatusCode, Uri};
use warp::reject;
use warp::reply::{self, Reply, Response};
use warp::{Filter, Rejection};

use crate::config::Settings;
use crate::error::{BallotError, HttpError};
use crate::voting::{Accounts, BallotStore, CandidateAdmin, VoteService};
use models::{CastVoteRequest, LoginRequest};
pub use photos::PhotoStore;

const JSON_BODY_LIMIT: u64 = 16 * 1024;
// room for the name/position fields and multipart boundaries around the photo
const FORM_OVERHEAD: u64 = 64 * 1024;

/// Everything a request handler needs, cheap to clone into each filter.
#[derive(Clone)]
pub struct AppState {
    pub votes: VoteService,
    pub admin: CandidateAdmin,
    pub accounts: Accounts,
    pub store: Arc<dyn BallotStore>,
    pub photos: PhotoStore,
    pub environment: String,
}

impl AppState {
    pub fn new(store: Arc<dyn BallotStore>, photos: PhotoStore, environment: String) -> AppState {
        AppState {
            votes: VoteService::new(store.clone()),
            admin: CandidateAdmin::new(store.clone()),
            accounts: Accounts::new(store.clone()),
            store,
            photos,
            environment,
        }
    }
}

/// Runs a synchronous store call on the blocking pool.
async fn blocking<T, F>(task: F) -> Result<T, HttpError>
where
    F: FnOnce() -> Result<T, BallotError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => result.map_err(HttpError::from),
        Err(err) => {
            error!(error = %err, "store task did not complete");
            Err(HttpError::internal("Internal server error"))
        }
    }
}

fn respond<T: Serialize>(result: Result<T, HttpError>, code: StatusCode) -> Response {
    match result {
        Ok(body) => reply::with_status(reply::json(&body), code).into_response(),
        Err(err) => err.into_response(),
    }
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(JSON_BODY_LIMIT).and(warp::body::json())
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path!("api" / "health")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(user_api::health);

    let login = warp::path!("api" / "login")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body::<LoginRequest>())
        .and_then(user_api::login);

    let users_count = warp::path!("api" / "users-count")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(user_api::users_count);

    let list_candidates = warp::path!("api" / "candidates")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(candidate_api::list);

    let add_candidate = warp::path!("api" / "candidates")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(warp::multipart::form().max_length(state.photos.max_bytes() + FORM_OVERHEAD))
        .and_then(candidate_api::create);

    let delete_candidate = warp::path!("api" / "candidates" / i32)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(candidate_api::delete);

    let cast_vote = warp::path!("api" / "vote")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body::<CastVoteRequest>())
        .and_then(vote_api::cast);

    let vote_status = warp::path!("api" / "vote-status" / i32)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(vote_api::status);

    let results = warp::path!("api" / "results")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(result_api::get_results);

    let export = warp::path!("api" / "export")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(result_api::export);

    let uploads =
        warp::path(photos::UPLOADS_ROUTE).and(warp::fs::dir(state.photos.dir().to_path_buf()));

    let placeholder = warp::path!("static" / "placeholder.svg")
        .and(warp::get())
        .map(|| reply::with_header(photos::PLACEHOLDER_SVG, "content-type", "image/svg+xml"));

    health
        .or(login)
        .or(users_count)
        .or(list_candidates)
        .or(add_candidate)
        .or(delete_candidate)
        .or(cast_vote)
        .or(vote_status)
        .or(results)
        .or(export)
        .or(uploads)
        .or(placeholder)
        .recover(handle_rejection)
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let error = if err.is_not_found() {
        HttpError::new(StatusCode::NOT_FOUND, "Not found")
    } else if let Some(cause) = err.find::<BodyDeserializeError>() {
        HttpError::new(StatusCode::BAD_REQUEST, cause.to_string())
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        HttpError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request too large")
    } else if err.find::<reject::LengthRequired>().is_some() {
        HttpError::new(StatusCode::LENGTH_REQUIRED, "Content-Length required")
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        HttpError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type")
    } else if let Some(header) = err.find::<reject::InvalidHeader>() {
        let message = format!("Invalid request header \"{}\"", header.name());
        HttpError::new(StatusCode::BAD_REQUEST, message)
    } else if let Some(header) = err.find::<reject::MissingHeader>() {
        let message = format!("Missing request header \"{}\"", header.name());
        HttpError::new(StatusCode::BAD_REQUEST, message)
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        HttpError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        error!(rejection = ?err, "unhandled rejection");
        HttpError::internal("Internal server error")
    };
    Ok(error.into_response())
}

fn cors(origins: &[String]) -> warp::cors::Cors {
    let builder = warp::cors()
        .allow_methods(vec!["GET", "POST", "DELETE"])
        .allow_headers(vec!["content-type"]);

    if origins.iter().any(|origin| origin == "*") {
        return builder.allow_any_origin().build();
    }

    // warp panics on a malformed origin, so those are dropped up front
    let valid: Vec<&str> = origins
        .iter()
        .map(String::as_str)
        .filter(|origin| match origin.parse::<Uri>() {
            Ok(uri) if uri.scheme().is_some() && uri.authority().is_some() => true,
            _ => {
                warn!(origin, "ignoring malformed CORS origin");
                false
            }
        })
        .collect();
    builder.allow_origins(valid).build()
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

pub async fn serve(settings: &Settings, state: AppState) -> Result<(), warp::Error> {
    let routes = routes(state)
        .with(cors(&settings.cors_origins))
        .with(warp::trace::request());

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(settings.bind_addr, shutdown_signal())?;
    info!(%addr, uploads = %settings.upload_dir.display(), "voting server listening");
    server.await;
    Ok(())
}
