use std::convert::Infallible;

use bytes::Buf;
use futures_util::{pin_mut, TryStreamExt};
use tracing::debug;
use warp::http::StatusCode;
use warp::multipart::{FormData, Part};
use warp::reply::Response;

use super::models::{CandidateCreated, CandidateView, Success};
use super::{blocking, respond, AppState};
use crate::error::{self, BallotError, HttpError};
use crate::voting::{Candidate, CandidateId, UnvalidatedCreateCandidate};

/// GET /api/candidates
pub async fn list(state: AppState) -> Result<Response, Infallible> {
    let admin = state.admin.clone();
    let candidates = blocking(move || admin.list())
        .await
        .map(|candidates| candidates.into_iter().map(CandidateView::from).collect::<Vec<_>>());
    Ok(respond(candidates, StatusCode::OK))
}

/// POST /api/candidates (multipart: name, position, photo)
pub async fn create(state: AppState, form: FormData) -> Result<Response, Infallible> {
    let created = create_internal(&state, form).await.map(|candidate| CandidateCreated {
        success: true,
        candidate: candidate.into(),
    });
    Ok(respond(created, StatusCode::CREATED))
}

/// DELETE /api/candidates/:id
pub async fn delete(id: i32, state: AppState) -> Result<Response, Infallible> {
    let admin = state.admin.clone();
    let removed = blocking(move || admin.remove(CandidateId(id))).await;
    if let Ok(Candidate { photo_path: Some(photo), .. }) = &removed {
        state.photos.remove(photo).await;
    }
    Ok(respond(removed.map(|_| Success::ok()), StatusCode::OK))
}

async fn create_internal(state: &AppState, form: FormData) -> Result<Candidate, HttpError> {
    let fields = read_form(form, state.photos.max_bytes()).await?;

    let photo_path = match &fields.photo {
        Some(photo) => Some(
            state
                .photos
                .save(photo.filename.as_deref(), &photo.bytes)
                .await
                .map_err(BallotError::from)?,
        ),
        None => None,
    };

    let admin = state.admin.clone();
    let input = UnvalidatedCreateCandidate {
        name: fields.name,
        position: fields.position,
        photo_path: photo_path.clone(),
    };
    let created = blocking(move || admin.add(input)).await;
    if let (Err(_), Some(photo)) = (&created, &photo_path) {
        state.photos.remove(photo).await;
    }
    created
}

#[derive(Default)]
struct CandidateForm {
    name: Option<String>,
    position: Option<String>,
    photo: Option<PhotoUpload>,
}

struct PhotoUpload {
    filename: Option<String>,
    bytes: Vec<u8>,
}

async fn read_form(form: FormData, max_bytes: u64) -> Result<CandidateForm, HttpError> {
    let mut fields = CandidateForm::default();
    pin_mut!(form);

    while let Some(part) = form.try_next().await.map_err(unreadable)? {
        let field = part.name().to_owned();
        match field.as_str() {
            "name" => fields.name = Some(read_text(part).await?),
            "position" => fields.position = Some(read_text(part).await?),
            "photo" => fields.photo = read_photo(part, max_bytes).await?,
            other => debug!(field = other, "ignoring unknown form field"),
        }
    }
    Ok(fields)
}

async fn read_photo(part: Part, max_bytes: u64) -> Result<Option<PhotoUpload>, HttpError> {
    let filename = part.filename().map(str::to_owned);
    let content_type = part.content_type().map(str::to_owned);
    let bytes = read_bytes(part).await?;

    // browsers send an empty, nameless file part when no photo was picked
    if bytes.is_empty() && filename.as_deref().map_or(true, str::is_empty) {
        return Ok(None);
    }
    if !content_type.as_deref().map_or(false, |ct| ct.starts_with("image/")) {
        return Err(error::photo_not_image(content_type.as_deref()).into());
    }
    if bytes.len() as u64 > max_bytes {
        return Err(error::photo_too_large(max_bytes).into());
    }
    Ok(Some(PhotoUpload { filename, bytes }))
}

async fn read_text(part: Part) -> Result<String, HttpError> {
    String::from_utf8(read_bytes(part).await?)
        .map_err(|_| error::form_unreadable("text field is not UTF-8").into())
}

async fn read_bytes(part: Part) -> Result<Vec<u8>, HttpError> {
    part.stream()
        .try_fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(chunk.chunk());
            Ok(acc)
        })
        .await
        .map_err(unreadable)
}

fn unreadable(err: warp::Error) -> HttpError {
    error::form_unreadable(&err.to_string()).into()
}
