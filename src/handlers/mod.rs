//! Request handlers, one module per route class.
//!
//! [`crate::server`] classifies the path and calls into these; handlers
//! return `Result<Response, GatewayError>` and never see unauthenticated
//! requests.

pub mod listing;
pub mod object;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::routing::DateKey;

/// `GET /` -- 302 to today's listing in the server's local time zone.
pub fn redirect_to_today() -> Response {
    redirect_to(&DateKey::today())
}

pub(crate) fn redirect_to(date: &DateKey) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, date.listing_path())],
    )
        .into_response()
}
