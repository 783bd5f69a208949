//! Gateway error types.
//!
//! Every variant maps to a fixed status and a short plain-text body. The
//! enum implements [`axum::response::IntoResponse`] so handlers can simply
//! return `Err(GatewayError::NotFound)`.
//!
//! Store failures and genuinely absent objects are both reported as 404;
//! the underlying error is only ever written to the log.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Body sent with every 404.
pub const NOT_FOUND_BODY: &str = "Not found.\n";

/// Body sent with every 401.
pub const ACCESS_DENIED_BODY: &str = "Access denied\n";

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing, malformed, or wrong Basic-Auth credentials.
    #[error("authentication required")]
    Unauthorized { realm: String },

    /// The path matched none of the known route shapes.
    #[error("no route for path")]
    NotFound,

    /// The object's suffix has no known content type.
    #[error("unsupported object type: {key}")]
    UnsupportedObjectType { key: String },

    /// The object store failed (including a missing key).
    #[error("object store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl GatewayError {
    /// Return the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            GatewayError::NotFound
            | GatewayError::UnsupportedObjectType { .. }
            | GatewayError::Store(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            GatewayError::Unauthorized { realm } => {
                let challenge = HeaderValue::from_str(&format!("Basic realm=\"{realm}\""))
                    .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
                (
                    status,
                    [
                        (header::WWW_AUTHENTICATE, challenge),
                        (header::CONTENT_TYPE, HeaderValue::from_static("text/plain")),
                    ],
                    ACCESS_DENIED_BODY,
                )
                    .into_response()
            }
            other => {
                if let GatewayError::Store(ref err) = other {
                    error!("Store error: {:#}", err);
                }
                not_found()
            }
        }
    }
}

/// Plain-text 404 response.
pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        NOT_FOUND_BODY,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::Unauthorized {
                realm: "r".to_string()
            }
            .status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(GatewayError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            GatewayError::UnsupportedObjectType {
                key: "2024/05/01/a.txt".to_string()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::Store(anyhow::anyhow!("boom")).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_unauthorized_response_headers() {
        let resp = GatewayError::Unauthorized {
            realm: "camera.example.net".to_string(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"camera.example.net\""
        );
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[tokio::test]
    async fn test_store_error_body_is_opaque() {
        let resp =
            GatewayError::Store(anyhow::anyhow!("AccessDenied: secret detail")).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], NOT_FOUND_BODY.as_bytes());
    }
}
