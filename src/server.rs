//! Axum router construction and request dispatch.
//!
//! The gateway has no fixed route table: every request falls through to
//! [`dispatch`], which classifies the path with [`crate::routing::classify`]
//! and hands off to the listing or object handler. The only real route is
//! the optional `/metrics` endpoint.

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, Uri},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::auth;
use crate::errors::GatewayError;
use crate::handlers;
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::routing::{classify, Route};
use crate::AppState;

/// Marker sent in `X-Powered-By` on every authenticated response.
const POWERED_BY: &str = "bacon";

/// Build the axum [`Router`] for the gateway.
///
/// The returned router is ready to be passed to `axum_server`.
pub fn app(state: Arc<AppState>) -> Router {
    let metrics_enabled = state.config.observability.metrics;

    let mut router = Router::new();
    if metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    let router = router
        .fallback(dispatch)
        .with_state(state.clone())
        // Layer ordering: inner layers run first, outer layers wrap them.
        // common_headers_middleware sits inside auth so 401s never carry it.
        .layer(middleware::from_fn(common_headers_middleware))
        .layer(middleware::from_fn_with_state(state, auth_middleware))
        // access_log_middleware logs before authentication runs.
        .layer(middleware::from_fn(access_log_middleware));

    let router = if metrics_enabled {
        router.layer(middleware::from_fn(metrics_middleware))
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}

// -- Dispatch ----------------------------------------------------------------

/// Fallback handler for every path: classify, then route.
async fn dispatch(State(state): State<Arc<AppState>>, uri: Uri) -> Result<Response, GatewayError> {
    match classify(uri.path()) {
        Route::Root => Ok(handlers::redirect_to_today()),
        Route::DateListing(date) => handlers::listing::list_date(state, &date).await,
        Route::DateObject { date, filename } => {
            handlers::object::stream_object(state, &date.object_key(&filename)).await
        }
        Route::Unmatched => Err(GatewayError::NotFound),
    }
}

// -- Access log middleware ---------------------------------------------------

/// Log `remote method path` for every request, before authentication.
async fn access_log_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    info!("{} {} {}", remote, req.method(), req.uri().path());
    next.run(req).await
}

// -- Common headers middleware -----------------------------------------------

/// Adds `X-Powered-By` and `Server` to every authenticated response.
async fn common_headers_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("x-powered-by", HeaderValue::from_static(POWERED_BY));
    headers.insert(header::SERVER, HeaderValue::from_static("camgate"));
    response
}

// -- Auth middleware ---------------------------------------------------------

/// Basic-Auth middleware.
///
/// Fails closed: a missing or malformed `Authorization` header, an unknown
/// user, or a wrong password all produce a 401 challenge, and the request
/// never reaches a handler. bcrypt runs on the blocking pool.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, GatewayError> {
    let unauthorized = || GatewayError::Unauthorized {
        realm: state.config.auth.realm.clone(),
    };

    let Some(credentials) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(auth::parse_basic_auth)
    else {
        debug!("Missing or malformed Basic credentials");
        return Err(unauthorized());
    };

    let username = credentials.username.clone();
    let verifier = state.clone();
    let valid = tokio::task::spawn_blocking(move || {
        verifier
            .credentials
            .verify(&credentials.username, &credentials.password)
    })
    .await
    .unwrap_or(false);

    if !valid {
        debug!("Authentication failed for user {}", username);
        return Err(unauthorized());
    }

    debug!("Auth OK for user {}", username);
    Ok(next.run(req).await)
}

// -- Tests -------------------------------------------------------------------
