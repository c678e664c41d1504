use std::convert::Infallible;

use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use super::models::ResultsView;
use super::{blocking, respond, AppState};
use crate::voting;

const EXPORT_DISPOSITION: &str = "attachment; filename=voting_data_export.json";

/// GET /api/results
pub async fn get_results(state: AppState) -> Result<Response, Infallible> {
    let votes = state.votes.clone();
    let results = blocking(move || votes.results()).await.map(ResultsView::from);
    Ok(respond(results, StatusCode::OK))
}

/// GET /api/export
pub async fn export(state: AppState) -> Result<Response, Infallible> {
    let store = state.store.clone();
    let response = match blocking(move || voting::export(&store)).await {
        Ok(document) => {
            reply::with_header(reply::json(&document), "content-disposition", EXPORT_DISPOSITION)
                .into_response()
        }
        Err(err) => err.into_response(),
    };
    Ok(response)
}
