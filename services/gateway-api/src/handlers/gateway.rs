//! Transparent `/wa/**` gateway (admission, rewrite, proxy, accounting)
//!
//! The `/wa` prefix is stripped and the remainder decides the path class:
//! admin and global endpoints bypass auth, everything else resolves the
//! session token. Compatible requests are relayed bit-for-bit; only an
//! image preflight may rewrite the body (and with it, Content-Length).

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use hermes_client::proxy::{ProxyRequest, ProxyResponse};
use hermes_db::repo::{SessionRepository, UpstreamSessionSync};
use hermes_types::{GatewayErrorBody, HermesError};

use crate::extractors::session_token_from_headers;
use crate::state::AppState;
use crate::stats::SendOutcome;

/// Paths the upstream exposes without a session token
const GLOBAL_ENDPOINTS: &[&str] = &["/webhook/events", "/health"];

/// Proxied request body cap (images arrive base64-inflated)
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Any method under `/wa/**`
pub async fn wa_gateway(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = request.headers().clone();

    let path = uri.path().strip_prefix("/wa").unwrap_or(uri.path());
    let path = if path.is_empty() { "/" } else { path };
    let query = uri.query().map(ToString::to_string);

    let body = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) => bytes.to_vec(),
        Err(_) => {
            return gateway_error(StatusCode::BAD_REQUEST, "Failed to read request body");
        }
    };

    // Admin and global endpoints are forwarded without admission checks
    if path.starts_with("/admin") || is_global_endpoint(path) {
        return match proxy_upstream(&state, method, path, query, headers, body, false).await {
            Ok(upstream) => relay(path, upstream),
            Err(response) => response,
        };
    }

    let Some(token) = session_token_from_headers(&headers) else {
        return gateway_error(StatusCode::UNAUTHORIZED, "Token required");
    };

    let resolved = match state.resolver.resolve_session_token(&token).await {
        Ok(resolved) => resolved,
        Err(err) => return admission_error(err),
    };

    // Connect requests must fit under the session cap before touching the
    // upstream
    if path == "/session/connect" && method == Method::POST {
        if let Err(err) = state
            .resolver
            .check_session_limit(&resolved.session.user_id, resolved.subscription.max_sessions)
            .await
        {
            return admission_error(err);
        }
    }

    let is_send = is_message_endpoint(path) && method == Method::POST;

    if is_send {
        if let Err(err) = resolved.check_message_quota() {
            return admission_error(err);
        }

        // Best-effort typing indicator ahead of the real send
        if resolved.session.typing_enabled {
            let client = state.client.clone();
            let session_token = resolved.session.session_token.clone();
            tokio::spawn(async move {
                if let Err(err) = client.chat_presence(&session_token, "composing").await {
                    tracing::debug!(error = %err, "typing indicator failed");
                }
            });
        }
    }

    // Image sends may need a URL→base64 rewrite before forwarding
    let is_image = path == "/chat/send/image" && method == Method::POST;
    let body = if is_image {
        match state.media.rewrite_send_body(&body).await {
            Ok(Some(rewritten)) => rewritten,
            Ok(None) => body,
            Err(err) => {
                let err: HermesError = err.into();
                return gateway_error(
                    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_REQUEST),
                    err.to_string(),
                );
            }
        }
    } else {
        body
    };

    let upstream = match proxy_upstream(&state, method, path, query, headers, body, is_image).await
    {
        Ok(upstream) => upstream,
        Err(response) => {
            // Upstream unreachable: a send attempt still counts as failed
            if is_send {
                record_send(&state, &resolved, path, false);
            }
            return response;
        }
    };

    let success = (200..300).contains(&upstream.status);

    if is_send {
        record_send(&state, &resolved, path, success);
    }

    // Mirror upstream session mutations locally; parse failures are
    // non-fatal by contract
    if path.starts_with("/session") && success {
        if let Some(session) = hermes_client::WaClient::parse_session_body(&upstream.body) {
            let update = UpstreamSessionSync {
                session_id: session.id,
                session_name: session.name,
                session_token: session.token,
                jid: session.jid,
                status: session.status,
                connected: session.connected,
                logged_in: session.logged_in,
            };

            if let Err(err) = state
                .repos
                .sessions
                .sync_from_upstream(&resolved.session.user_id, update)
                .await
            {
                tracing::warn!(error = %err, "session sync from upstream response failed");
            }
        }
    }

    relay(path, upstream)
}

fn record_send(
    state: &AppState,
    resolved: &hermes_auth_core::ResolvedSession,
    path: &str,
    success: bool,
) {
    state.stats.record(SendOutcome {
        session_pk: resolved.session.id,
        user_id: resolved.session.user_id.clone(),
        session_id: resolved.session.session_id.clone(),
        message_type: message_type_from_path(path),
        success,
    });
}

/// Forward to the upstream; a transport failure becomes the 502 response
async fn proxy_upstream(
    state: &AppState,
    method: Method,
    path: &str,
    query: Option<String>,
    headers: HeaderMap,
    body: Vec<u8>,
    is_image: bool,
) -> Result<ProxyResponse, Response> {
    let timeout = if is_image {
        state.client.config().image_timeout()
    } else {
        state.client.config().request_timeout()
    };

    let request = ProxyRequest {
        method,
        path: path.to_string(),
        query,
        headers,
        body,
    };

    state.client.proxy(request, timeout).await.map_err(|err| {
        let err: HermesError = err.into();
        gateway_error(StatusCode::BAD_GATEWAY, err.to_string())
    })
}

/// Relay the upstream response to the caller unchanged
fn relay(path: &str, upstream: ProxyResponse) -> Response {
    metrics::counter!("gateway_proxied_requests_total", "path_class" => path_class(path))
        .increment(1);

    let mut builder = Response::builder()
        .status(StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY));

    if let Some(response_headers) = builder.headers_mut() {
        for (name, value) in upstream.headers.iter() {
            // Hop-by-hop and length framing are re-derived locally
            if *name == http::header::TRANSFER_ENCODING
                || *name == http::header::CONTENT_LENGTH
                || *name == http::header::CONNECTION
            {
                continue;
            }
            response_headers.insert(name.clone(), value.clone());
        }
    }

    builder
        .body(Body::from(upstream.body))
        .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
}

fn is_global_endpoint(path: &str) -> bool {
    GLOBAL_ENDPOINTS
        .iter()
        .any(|endpoint| path == *endpoint || path.starts_with(&format!("{endpoint}/")))
}

/// Message-send endpoints subject to quota and accounting
pub fn is_message_endpoint(path: &str) -> bool {
    path.starts_with("/chat/send/") || path == "/status/set/text"
}

/// `/chat/send/text` → `text`; `/status/set/text` → `text`; else `unknown`
pub fn message_type_from_path(path: &str) -> String {
    if path == "/status/set/text" {
        return "text".to_string();
    }

    if let Some(rest) = path.strip_prefix("/chat/send/") {
        let segment = rest.split('/').next().unwrap_or("");
        if !segment.is_empty() {
            return segment.to_string();
        }
    }

    "unknown".to_string()
}

fn path_class(path: &str) -> &'static str {
    if path.starts_with("/admin") {
        "admin"
    } else if path.starts_with("/chat/send") {
        "send"
    } else if path.starts_with("/session") {
        "session"
    } else {
        "other"
    }
}

fn admission_error(err: HermesError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::FORBIDDEN);
    gateway_error(status, err.to_string())
}

fn gateway_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(GatewayErrorBody::new(status.as_u16(), message.into())),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_endpoints() {
        assert!(is_global_endpoint("/health"));
        assert!(is_global_endpoint("/webhook/events"));
        assert!(is_global_endpoint("/webhook/events/123"));
        assert!(!is_global_endpoint("/chat/send/text"));
        assert!(!is_global_endpoint("/healthcheck"));
    }

    #[test]
    fn test_message_endpoints() {
        assert!(is_message_endpoint("/chat/send/text"));
        assert!(is_message_endpoint("/chat/send/image"));
        assert!(is_message_endpoint("/chat/send/poll"));
        assert!(is_message_endpoint("/status/set/text"));
        assert!(!is_message_endpoint("/chat/presence"));
        assert!(!is_message_endpoint("/session/connect"));
    }

    #[test]
    fn test_message_type_extraction() {
        assert_eq!(message_type_from_path("/chat/send/text"), "text");
        assert_eq!(message_type_from_path("/chat/send/image"), "image");
        assert_eq!(message_type_from_path("/chat/send/document"), "document");
        assert_eq!(message_type_from_path("/status/set/text"), "text");
        assert_eq!(message_type_from_path("/chat/presence"), "unknown");
        assert_eq!(message_type_from_path("/chat/send/"), "unknown");
    }
}
