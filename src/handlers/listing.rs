//! Date listing handler.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::debug;

use crate::errors::GatewayError;
use crate::html::render_listing;
use crate::metrics::record_store_error;
use crate::routing::DateKey;
use crate::AppState;

/// `GET /YYYY/MM/DD` -- HTML index of every object stored under the date.
///
/// An empty prefix is a valid, empty listing. Any store failure becomes
/// a 404 (the error itself is only logged).
pub async fn list_date(state: Arc<AppState>, date: &DateKey) -> Result<Response, GatewayError> {
    let prefix = date.prefix();
    let keys = state.storage.list(&prefix).await.map_err(|e| {
        record_store_error("list");
        GatewayError::Store(e.context(format!("listing {prefix}")))
    })?;

    debug!("Listed {} objects under {}", keys.len(), prefix);

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        render_listing(date, &keys),
    )
        .into_response())
}
