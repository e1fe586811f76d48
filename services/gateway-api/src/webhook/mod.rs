//! Webhook intake (`/webhook/wa`)
//!
//! Every envelope is appended to `webhook_events` before anything else
//! happens; the caller gets its ack as soon as the raw row is durable.
//! Typed processing runs on a background task and only flips the
//! `processed` flag — a processing failure never loses the envelope.

pub mod events;
pub mod processor;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use hermes_db::repo::{CreateWebhookEvent, WebhookEventRepository};

use crate::state::AppState;
use events::WebhookEnvelope;

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode", default)]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge", default)]
    pub challenge: Option<String>,
}

/// GET /webhook/wa - subscription verification echo
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let Some(expected) = state.config.webhook_verify_token.as_deref() else {
        return Json(json!({ "message": "Webhook verification disabled" })).into_response();
    };

    let mode_ok = query.mode.as_deref() == Some("subscribe");
    let token_ok = query.verify_token.as_deref() == Some(expected);

    if mode_ok && token_ok {
        return query.challenge.unwrap_or_default().into_response();
    }

    (StatusCode::FORBIDDEN, Json(json!({ "error": "Forbidden" }))).into_response()
}

/// POST /webhook/wa - ingest one upstream event
pub async fn receive(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let envelope: WebhookEnvelope = match serde_json::from_value(payload.clone()) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(error = %err, "malformed webhook envelope");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid JSON data" })),
            )
                .into_response();
        }
    };

    let raw_data = payload.to_string();
    let event_id = match state
        .repos
        .webhook_events
        .insert(CreateWebhookEvent {
            event_type: envelope.event_type.clone(),
            source: "wa".to_string(),
            user_token: envelope.token.clone(),
            event_data: envelope.event.clone(),
            raw_data,
        })
        .await
    {
        Ok(id) => id,
        Err(err) => {
            tracing::error!(error = %err, "failed to store webhook event");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to store webhook event" })),
            )
                .into_response();
        }
    };

    metrics::counter!("webhook_events_total", "type" => envelope.event_type.clone())
        .increment(1);

    // The ack must not wait for fan-out
    let task_state = state.clone();
    tokio::spawn(async move {
        match processor::process_event(&task_state, &envelope).await {
            Ok(()) => {
                if let Err(err) = task_state
                    .repos
                    .webhook_events
                    .mark_processed(event_id, Utc::now())
                    .await
                {
                    tracing::warn!(event_id, error = %err, "failed to flag event processed");
                }
            }
            Err(err) => {
                tracing::error!(event_id, error = %err, "webhook event processing failed");
                let _ = task_state
                    .repos
                    .webhook_events
                    .mark_unprocessed(event_id)
                    .await;
            }
        }
    });

    Json(json!({ "status": "success" })).into_response()
}
