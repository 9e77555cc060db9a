use std::{io::ErrorKind, sync::Arc};

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, LOCATION},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::{Multipart, multipart::MultipartRejection};
use bytes::Bytes;
use serde::Serialize;
use tracing::error;

use crate::{
    application::{
        error::HttpError,
        posts::{CreatePostCommand, PostService},
        uploads::UploadService,
    },
    infra::{db::SqliteRepositories, uploads::UploadStorageError},
    presentation::{
        sanitize::ContentRenderer,
        views::{EditorView, IndexTemplate, IndexView, PostCardView, render_template_response},
    },
};

use super::{
    db_health_response,
    error::JsonError,
    middleware::{log_responses, set_request_context},
    multipart::{read_create_post_form, read_file_field},
};

/// Form field the editor sends inline images under.
const UPLOAD_FIELD: &str = "image";

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostService>,
    pub uploads: Arc<UploadService>,
    pub content: Arc<ContentRenderer>,
    pub db: Arc<SqliteRepositories>,
    pub upload_limit_bytes: u64,
    /// Set when uploaded images are downscaled; shown as a hint in the editor.
    pub max_image_width: Option<u32>,
}

impl HttpState {
    fn editor_view(&self) -> EditorView {
        EditorView {
            upload_limit_mib: self.upload_limit_bytes.div_ceil(1_048_576),
            max_image_width: self.max_image_width,
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    let body_limit = usize::try_from(state.upload_limit_bytes).unwrap_or(usize::MAX);

    let form_routes = Router::new()
        .route("/create", post(create_post))
        .route("/upload", post(upload_image))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/", get(index))
        .route("/uploads/{*path}", get(serve_upload))
        .route("/_health/db", get(health))
        .merge(form_routes)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index(State(state): State<HttpState>) -> Response {
    let posts = match state.posts.list_recent().await {
        Ok(posts) => posts,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let view = IndexView {
        posts: posts
            .into_iter()
            .map(|record| PostCardView::from_record(record, &state.content))
            .collect(),
        editor: state.editor_view(),
    };

    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

async fn create_post(
    State(state): State<HttpState>,
    mut multipart: Multipart,
) -> Result<Response, HttpError> {
    const SOURCE: &str = "infra::http::public::create_post";

    let form = read_create_post_form(&mut multipart)
        .await
        .map_err(|err| {
            let status = err.status();
            let message = match status {
                StatusCode::PAYLOAD_TOO_LARGE => "Uploaded file is too large",
                StatusCode::BAD_REQUEST => "Post form data was invalid",
                _ => "Could not read post form",
            };
            HttpError::new(SOURCE, status, message, err.detail())
        })?;

    let image = match form.image {
        Some(file) => Some(state.uploads.save(&file.filename, file.data).await?.public_path),
        None => None,
    };

    state
        .posts
        .create_post(CreatePostCommand {
            title: form.title,
            content: form.content,
            image,
        })
        .await?;

    Ok(redirect_home())
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    url: String,
}

async fn upload_image(
    State(state): State<HttpState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, JsonError> {
    const SOURCE: &str = "infra::http::public::upload_image";

    let mut multipart = multipart.map_err(|rejection| {
        JsonError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Upload form data was invalid",
            rejection.body_text(),
        )
    })?;

    let file = read_file_field(&mut multipart, UPLOAD_FIELD)
        .await
        .map_err(|err| {
            JsonError::new(
                SOURCE,
                err.status(),
                err.public_message(state.upload_limit_bytes),
                err.detail(),
            )
        })?
        .ok_or_else(|| {
            JsonError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "No image file provided",
                "multipart body had no `image` file field",
            )
        })?;

    let stored = state
        .uploads
        .save(&file.filename, file.data)
        .await
        .map_err(|err| JsonError::from(HttpError::from(err)))?;

    Ok(Json(UploadResponse {
        url: stored.public_path,
    }))
}

async fn serve_upload(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_upload";

    match state.uploads.storage().read(&path).await {
        Ok(bytes) => build_upload_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => upload_not_found(SOURCE),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            upload_not_found(SOURCE)
        }
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored upload"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read uploaded file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

async fn health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

/// `302 Found` back to the post list, the status browsers follow with a GET.
fn redirect_home() -> Response {
    (StatusCode::FOUND, [(LOCATION, "/")]).into_response()
}

fn upload_not_found(source: &'static str) -> Response {
    HttpError::new(
        source,
        StatusCode::NOT_FOUND,
        "Upload not found",
        "The requested upload is not available",
    )
    .into_response()
}

fn build_upload_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}
