//! Maps the ledger's error taxonomy onto HTTP responses.
//!
//! Every failure becomes `{"error": "..."}` with the status for its kind.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::LedgerError;

impl LedgerError {
    pub fn status(&self) -> StatusCode {
        match self {
            LedgerError::Validation(_) | LedgerError::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
            LedgerError::Conflict(_) => StatusCode::CONFLICT,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Db(_)
            | LedgerError::Io(_)
            | LedgerError::Csv(_)
            | LedgerError::Internal(_)
            | LedgerError::Settings(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for LedgerError {
    fn from(rejection: JsonRejection) -> Self {
        LedgerError::Validation(rejection.body_text())
    }
}

/// JSON body extractor whose rejections use the `{error}` shape.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(LedgerError))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(LedgerError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            LedgerError::PreconditionFailed("no active transactions".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(LedgerError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(LedgerError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(LedgerError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = LedgerError::NotFound("archive 42".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "archive 42 not found");
    }
}
