//! Request middleware

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use hermes_types::GatewayErrorBody;

use crate::state::AppState;

/// Public-surface rate limiting, applied before any auth work.
///
/// Internal provisioning paths bypass the limiter entirely.
pub async fn public_rate_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path().starts_with("/internal/") {
        return next.run(request).await;
    }

    match state.limiter.check(addr.ip(), Utc::now()) {
        Ok(()) => next.run(request).await,
        Err(err) => {
            metrics::counter!("gateway_rate_limited_total").increment(1);
            let status = StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::TOO_MANY_REQUESTS);
            (
                status,
                Json(GatewayErrorBody::new(status.as_u16(), err.to_string())),
            )
                .into_response()
        }
    }
}
