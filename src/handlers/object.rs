//! Single-object streaming handler.
//!
//! Only two object types are served:
//!
//! | suffix | content type      |
//! |--------|-------------------|
//! | `.jpg` | `image/jpeg`      |
//! | `.avi` | `video/x-msvideo` |
//!
//! Anything else is a 404 without touching the store.
//!
//! Headers are only written once the store has answered the `get`, so a
//! missing key or an unreachable store is still a clean 404. A failure
//! after that point can no longer change the status: the body stream ends
//! with an error, hyper aborts the connection, and the client sees a
//! truncated download.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::GatewayError;
use crate::metrics::record_store_error;
use crate::AppState;

/// Content type for a key, or `None` if the suffix is not served.
pub fn content_type_for(key: &str) -> Option<&'static str> {
    if key.ends_with(".jpg") {
        Some("image/jpeg")
    } else if key.ends_with(".avi") {
        Some("video/x-msvideo")
    } else {
        None
    }
}

/// `GET /YYYY/MM/DD/<file>` -- stream the object at `key`.
pub async fn stream_object(state: Arc<AppState>, key: &str) -> Result<Response, GatewayError> {
    let content_type = content_type_for(key).ok_or_else(|| GatewayError::UnsupportedObjectType {
        key: key.to_string(),
    })?;

    let object = state.storage.get(key).await.map_err(|e| {
        record_store_error("get");
        GatewayError::Store(e.context(format!("fetching {key}")))
    })?;

    debug!(
        "Streaming {} ({} bytes)",
        key,
        object
            .content_length
            .map_or_else(|| "unknown".to_string(), |n| n.to_string())
    );

    let logged_key = key.to_string();
    let body = object.body.inspect(move |chunk| {
        if let Err(e) = chunk {
            record_store_error("stream");
            warn!("Stream for {} failed mid-body, truncating: {}", logged_key, e);
        }
    });

    let mut response = (StatusCode::OK, Body::from_stream(body)).into_response();
    let hdrs = response.headers_mut();
    hdrs.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(val) = HeaderValue::from_str(&format!("inline;filename={key}")) {
        hdrs.insert(header::CONTENT_DISPOSITION, val);
    }
    if let Some(len) = object.content_length {
        hdrs.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("2024/05/01/a.jpg"), Some("image/jpeg"));
        assert_eq!(content_type_for("2024/05/01/a.avi"), Some("video/x-msvideo"));
        assert_eq!(content_type_for("2024/05/01/a.txt"), None);
        assert_eq!(content_type_for("2024/05/01/a.jpeg"), None);
        assert_eq!(content_type_for("2024/05/01/jpg"), None);
    }
}
