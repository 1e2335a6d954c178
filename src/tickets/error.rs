use axum::{response::IntoResponse, Json};

#[derive(Debug, thiserror::Error)]
pub enum TicketsError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TicketsError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TicketsError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let message = match self {
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Storage(msg)
            | Self::Internal(msg) => msg,
        };
        if status.is_server_error() {
            log::error!("Ticket request failed ({status}): {message}");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<axum::extract::rejection::JsonRejection> for TicketsError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Ticket ids are UUIDs; any other path segment names no ticket.
impl From<axum::extract::rejection::PathRejection> for TicketsError {
    fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
        log::debug!("Unresolvable ticket path: {}", rejection.body_text());
        Self::NotFound("Ticket not found".to_string())
    }
}

impl From<diesel::result::Error> for TicketsError {
    fn from(e: diesel::result::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for TicketsError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        Self::Storage(format!("DB error: {e}"))
    }
}

impl From<tokio::task::JoinError> for TicketsError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Blocking task failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            TicketsError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TicketsError::NotFound("gone".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TicketsError::Storage("down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_path_rejection_is_not_found() {
        use axum::extract::{rejection::PathRejection, Path};
        use axum::routing::get;
        use tower::ServiceExt;

        async fn handler(
            path: Result<Path<uuid::Uuid>, PathRejection>,
        ) -> Result<&'static str, TicketsError> {
            let Path(_id) = path?;
            Ok("found")
        }

        let app = axum::Router::new().route("/items/:id", get(handler));
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/items/42")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Ticket not found");
    }

    #[test]
    fn test_into_response_keeps_status() {
        let response = TicketsError::NotFound("Ticket not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
