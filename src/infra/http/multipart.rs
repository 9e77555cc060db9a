//! Multipart form parsing for the post form and the editor image upload.

use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use axum_extra::extract::multipart::{Field, MultipartError};
use bytes::Bytes;
use tracing::debug;

const SOURCE_BASE: &str = "quillpost::http::multipart";

/// A file field read fully into memory.
pub(super) struct FilePart {
    pub(super) filename: String,
    pub(super) data: Bytes,
}

pub(super) struct CreatePostForm {
    pub(super) title: String,
    pub(super) content: String,
    pub(super) image: Option<FilePart>,
}

#[derive(Debug)]
pub(super) enum MultipartFormError {
    PayloadTooLarge,
    InvalidFormData,
    Read { detail: String },
}

impl MultipartFormError {
    pub(super) fn status(&self) -> StatusCode {
        match self {
            MultipartFormError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            MultipartFormError::InvalidFormData => StatusCode::BAD_REQUEST,
            MultipartFormError::Read { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(super) fn public_message(&self, limit_bytes: u64) -> String {
        match self {
            MultipartFormError::PayloadTooLarge => {
                let limit_mib = limit_bytes.div_ceil(1_048_576);
                format!("File is too large (limit is {limit_mib} MiB)")
            }
            MultipartFormError::InvalidFormData => "Upload form data was invalid".to_string(),
            MultipartFormError::Read { .. } => "Upload failed, please try again".to_string(),
        }
    }

    pub(super) fn detail(&self) -> String {
        match self {
            MultipartFormError::PayloadTooLarge => "request body exceeded the limit".to_string(),
            MultipartFormError::InvalidFormData => "malformed multipart body".to_string(),
            MultipartFormError::Read { detail } => detail.clone(),
        }
    }
}

/// Read the `title`, `content` and optional `image` fields of the post form.
///
/// Missing text fields read as empty strings. A file input left empty by the
/// browser (no filename, no bytes) counts as no image.
pub(super) async fn read_create_post_form(
    multipart: &mut Multipart,
) -> Result<CreatePostForm, MultipartFormError> {
    let mut title = String::new();
    let mut content = String::new();
    let mut image = None;

    while let Some(field) = next_field(multipart).await? {
        match field.name() {
            Some("title") => title = read_text(field).await?,
            Some("content") => content = read_text(field).await?,
            Some("image") => image = read_file(field).await?,
            _ => continue,
        }
    }

    Ok(CreatePostForm {
        title,
        content,
        image,
    })
}

/// Read the first non-empty file sent under `field_name`, skipping other fields.
pub(super) async fn read_file_field(
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<Option<FilePart>, MultipartFormError> {
    while let Some(field) = next_field(multipart).await? {
        if field.name() != Some(field_name) {
            continue;
        }
        if let Some(file) = read_file(field).await? {
            return Ok(Some(file));
        }
    }

    Ok(None)
}

async fn next_field(multipart: &mut Multipart) -> Result<Option<Field>, MultipartFormError> {
    multipart.next_field().await.map_err(classify)
}

async fn read_text(field: Field) -> Result<String, MultipartFormError> {
    field.text().await.map_err(classify)
}

async fn read_file(field: Field) -> Result<Option<FilePart>, MultipartFormError> {
    let filename = field
        .file_name()
        .map(|value| value.trim().to_string())
        .unwrap_or_default();
    let data = field.bytes().await.map_err(classify)?;

    if filename.is_empty() && data.is_empty() {
        return Ok(None);
    }

    Ok(Some(FilePart { filename, data }))
}

fn classify(err: MultipartError) -> MultipartFormError {
    let status = err.status();
    debug!(
        target = SOURCE_BASE,
        status = status.as_u16(),
        error = %err,
        "failed to read multipart payload"
    );
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => MultipartFormError::PayloadTooLarge,
        StatusCode::BAD_REQUEST => MultipartFormError::InvalidFormData,
        _ => MultipartFormError::Read {
            detail: err.to_string(),
        },
    }
}
