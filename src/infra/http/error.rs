use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::{ErrorReport, HttpError};

/// Body of a failed JSON endpoint: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct JsonErrorBody {
    pub error: String,
}

/// Error returned by endpoints that always answer with JSON.
#[derive(Debug)]
pub struct JsonError {
    status: StatusCode,
    message: String,
    report: ErrorReport,
}

impl JsonError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<HttpError> for JsonError {
    fn from(err: HttpError) -> Self {
        let status = err.status();
        let message = err.public_message().to_string();
        Self {
            status,
            message,
            report: err.into_report(),
        }
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        let body = JsonErrorBody {
            error: self.message,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn renders_error_object_and_keeps_report() {
        let response = JsonError::new(
            "test",
            StatusCode::BAD_REQUEST,
            "No image file provided",
            "missing field",
        )
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.extensions().get::<ErrorReport>().is_some());

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "No image file provided");
    }

    #[test]
    fn converts_from_http_error() {
        let err = HttpError::new(
            "test",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not store uploaded file",
            "disk full",
        );
        let json = JsonError::from(err);
        assert_eq!(json.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json.message(), "Could not store uploaded file");
    }
}
