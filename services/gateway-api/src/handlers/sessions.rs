//! Customer surface (`/v1/**`): session CRUD, settings and contacts
//!
//! Sessions are provisioned against the upstream admin API and mirrored
//! locally. The session token is generated here and handed to the
//! upstream; it never appears in logs.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use hermes_auth_core::generate_api_key;
use hermes_db::repo::{
    ContactRepository, CreateSession, SessionRepository, SessionSettingsUpdate, UpsertContact,
};
use hermes_types::HermesError;

use crate::error::ApiResult;
use crate::extractors::CustomerUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub session_name: String,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub events: Option<String>,
    #[serde(default)]
    pub expiration_sec: Option<i64>,
    #[serde(default)]
    pub auto_connect: bool,
    #[serde(default)]
    pub auto_read_enabled: bool,
    #[serde(default)]
    pub typing_enabled: bool,
    #[serde(default)]
    pub chat_log_enabled: bool,
    #[serde(default)]
    pub history: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub events: Option<String>,
    #[serde(default)]
    pub expiration_sec: Option<i64>,
    #[serde(default)]
    pub auto_read_enabled: Option<bool>,
    #[serde(default)]
    pub typing_enabled: Option<bool>,
    #[serde(default)]
    pub chat_log_enabled: Option<bool>,
    #[serde(default)]
    pub history: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    #[serde(default)]
    pub auto_read_enabled: Option<bool>,
    #[serde(default)]
    pub typing_enabled: Option<bool>,
    #[serde(default)]
    pub chat_log_enabled: Option<bool>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContactsQuery {
    #[serde(default)]
    pub sync: Option<String>,
}

/// GET /v1/me
pub async fn me(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
) -> ApiResult<Json<Value>> {
    let subscription = state.resolver.active_subscription(&user.user_id).await?;
    Ok(Json(json!({ "user": user, "subscription": subscription })))
}

/// GET /v1/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
) -> ApiResult<Json<Value>> {
    let sessions = state.repos.sessions.find_by_user(&user.user_id).await?;
    Ok(Json(json!({ "sessions": sessions })))
}

/// POST /v1/sessions - provision a session upstream and mirror it locally
pub async fn create_session(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<Response> {
    let subscription = state.resolver.active_subscription(&user.user_id).await?;
    state
        .resolver
        .check_provision_limit(&user.user_id, subscription.max_sessions)
        .await?;

    let events = req
        .events
        .clone()
        .unwrap_or_else(|| "Message,Connected,Disconnected,QR".to_string());
    let token = generate_api_key("wat");

    let admin_payload = json!({
        "name": req.session_name,
        "token": token.raw,
        "webhook": req.webhook_url,
        "expiration": req.expiration_sec.unwrap_or(0),
        "events": events,
        "history": req.history.unwrap_or(0),
    });

    let (status, body) = state
        .client
        .admin_json(http::Method::POST, "/admin/users", Some(&admin_payload))
        .await
        .map_err(HermesError::from)?;

    if !(200..300).contains(&status) {
        // Relay the upstream rejection unchanged
        return Ok(upstream_passthrough(status, body));
    }

    let provisioned = parse_admin_user_body(&body).ok_or_else(|| {
        HermesError::Upstream("invalid wa response for session provisioning".into())
    })?;

    let session_token = provisioned.token.unwrap_or(token.raw);
    let webhook_url = provisioned.webhook.or(req.webhook_url.clone());

    let session = state
        .repos
        .sessions
        .create(CreateSession {
            user_id: user.user_id.clone(),
            provider: subscription.provider.clone(),
            session_id: provisioned.id,
            session_name: Some(req.session_name.clone()),
            session_token: session_token.clone(),
            webhook_url,
            auto_read_enabled: req.auto_read_enabled,
            typing_enabled: req.typing_enabled,
            chat_log_enabled: req.chat_log_enabled,
            status: "created".to_string(),
        })
        .await?;

    if req.auto_connect {
        let client = state.client.clone();
        let subscribe: Vec<String> = events.split(',').map(|s| s.trim().to_string()).collect();
        tokio::spawn(async move {
            let payload = json!({ "subscribe": subscribe });
            if let Err(err) = client
                .token_json(
                    http::Method::POST,
                    "/session/connect",
                    &session_token,
                    Some(&payload),
                )
                .await
            {
                tracing::warn!(error = %err, "auto-connect after provisioning failed");
            }
        });
    }

    Ok((StatusCode::CREATED, Json(json!({ "session": session }))).into_response())
}

/// PUT /v1/sessions/{session_id}
pub async fn update_session(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(session_id): Path<String>,
    Json(req): Json<UpdateSessionRequest>,
) -> ApiResult<Response> {
    let session = state
        .repos
        .sessions
        .find_by_session_id(&user.user_id, &session_id)
        .await?
        .ok_or_else(|| HermesError::NotFound("session".into()))?;

    // Upstream-visible fields go through the admin API first
    let mut admin_payload = serde_json::Map::new();
    if let Some(name) = &req.session_name {
        admin_payload.insert("name".into(), json!(name));
    }
    if let Some(webhook) = &req.webhook_url {
        admin_payload.insert("webhook".into(), json!(webhook));
    }
    if let Some(events) = &req.events {
        admin_payload.insert("events".into(), json!(events));
    }
    if let Some(expiration) = req.expiration_sec {
        admin_payload.insert("expiration".into(), json!(expiration));
    }
    if let Some(history) = req.history {
        admin_payload.insert("history".into(), json!(history));
    }

    if !admin_payload.is_empty() {
        let path = format!("/admin/users/{session_id}");
        let (status, body) = state
            .client
            .admin_json(http::Method::PUT, &path, Some(&Value::Object(admin_payload)))
            .await
            .map_err(HermesError::from)?;

        if !(200..300).contains(&status) {
            return Ok(upstream_passthrough(status, body));
        }
    }

    state
        .repos
        .sessions
        .update_settings(
            &user.user_id,
            &session_id,
            SessionSettingsUpdate {
                session_name: req.session_name,
                webhook_url: req.webhook_url,
                auto_read_enabled: req.auto_read_enabled,
                typing_enabled: req.typing_enabled,
                chat_log_enabled: req.chat_log_enabled,
            },
        )
        .await?;

    let refreshed = state
        .repos
        .sessions
        .find_by_session_id(&user.user_id, &session_id)
        .await?
        .unwrap_or(session);

    Ok(Json(json!({ "session": refreshed })).into_response())
}

/// DELETE /v1/sessions/{session_id}
pub async fn delete_session(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(session_id): Path<String>,
) -> ApiResult<Response> {
    if state
        .repos
        .sessions
        .find_by_session_id(&user.user_id, &session_id)
        .await?
        .is_none()
    {
        return Err(HermesError::NotFound("session".into()).into());
    }

    let path = format!("/admin/users/{session_id}/full");
    let (status, body) = state
        .client
        .admin_json(http::Method::DELETE, &path, None)
        .await
        .map_err(HermesError::from)?;

    if (200..300).contains(&status) {
        state.repos.sessions.delete(&user.user_id, &session_id).await?;
    }

    Ok(upstream_passthrough(status, body))
}

/// GET /v1/sessions/{session_id}/settings
pub async fn get_settings(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let session = state
        .repos
        .sessions
        .find_by_session_id(&user.user_id, &session_id)
        .await?
        .ok_or_else(|| HermesError::NotFound("session".into()))?;

    Ok(Json(json!({
        "session_id": session.session_id,
        "auto_read_enabled": session.auto_read_enabled,
        "typing_enabled": session.typing_enabled,
        "chat_log_enabled": session.chat_log_enabled,
        "webhook_url": session.webhook_url,
        "message_stat_sent": session.last_message_sent,
        "message_stat_failed": session.last_message_fail,
    })))
}

/// PUT /v1/sessions/{session_id}/settings
pub async fn update_settings(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(session_id): Path<String>,
    Json(req): Json<SettingsRequest>,
) -> ApiResult<Json<Value>> {
    let session = state
        .repos
        .sessions
        .find_by_session_id(&user.user_id, &session_id)
        .await?
        .ok_or_else(|| HermesError::NotFound("session".into()))?;

    state
        .repos
        .sessions
        .update_settings(
            &user.user_id,
            &session_id,
            SessionSettingsUpdate {
                session_name: None,
                webhook_url: req.webhook_url.clone(),
                auto_read_enabled: req.auto_read_enabled,
                typing_enabled: req.typing_enabled,
                chat_log_enabled: req.chat_log_enabled,
            },
        )
        .await?;

    // Propagate a webhook change to the upstream, best effort
    if let Some(webhook_url) = req.webhook_url {
        let client = state.client.clone();
        let token = session.session_token.clone();
        tokio::spawn(async move {
            let payload = json!({ "webhookURL": webhook_url });
            if let Err(err) = client
                .token_json(http::Method::PUT, "/webhook", &token, Some(&payload))
                .await
            {
                tracing::warn!(error = %err, "failed to push webhook url upstream");
            }
        });
    }

    Ok(Json(json!({ "message": "settings updated" })))
}

/// GET /v1/sessions/{session_id}/contacts
pub async fn list_contacts(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(session_id): Path<String>,
    Query(query): Query<ContactsQuery>,
) -> ApiResult<Json<Value>> {
    let session = state
        .repos
        .sessions
        .find_by_session_id(&user.user_id, &session_id)
        .await?
        .ok_or_else(|| HermesError::NotFound("session".into()))?;

    let auto_sync = query
        .sync
        .as_deref()
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(true);

    if auto_sync {
        if let Ok((status, body)) = state
            .client
            .token_json(
                http::Method::GET,
                "/user/contacts",
                &session.session_token,
                None,
            )
            .await
        {
            if (200..300).contains(&status) {
                let _ = sync_contacts_from_body(&state, &user.user_id, &session_id, &body).await;
            }
        }
    }

    let contacts = state.repos.contacts.list(&user.user_id, &session_id).await?;
    Ok(Json(json!({ "contacts": contacts })))
}

/// POST /v1/sessions/{session_id}/contacts/sync
pub async fn sync_contacts(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(session_id): Path<String>,
) -> ApiResult<Response> {
    let session = state
        .repos
        .sessions
        .find_by_session_id(&user.user_id, &session_id)
        .await?
        .ok_or_else(|| HermesError::NotFound("session".into()))?;

    let (status, body) = state
        .client
        .token_json(
            http::Method::GET,
            "/user/contacts",
            &session.session_token,
            None,
        )
        .await
        .map_err(HermesError::from)?;

    if !(200..300).contains(&status) {
        return Ok(upstream_passthrough(status, body));
    }

    let count = sync_contacts_from_body(&state, &user.user_id, &session_id, &body).await?;
    Ok(Json(json!({ "synced": count })).into_response())
}

/// Parse the upstream contacts body and upsert every entry.
///
/// Two shapes exist in the wild: a map of `jid → contact` and an array
/// under `data`/`contacts`.
pub async fn sync_contacts_from_body(
    state: &AppState,
    user_id: &str,
    session_id: &str,
    body: &[u8],
) -> Result<usize, crate::error::ApiError> {
    let entries = parse_contact_entries(body)
        .map_err(|msg| crate::error::ApiError::bad_request(msg))?;

    let now = Utc::now();
    let mut count = 0;
    for (jid, entry) in entries {
        let name = entry
            .get("name")
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
            .or_else(|| entry.get("full_name").and_then(|v| v.as_str()))
            .map(ToString::to_string);

        let phone = entry
            .get("phone")
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| phone_from_jid(&jid));

        state
            .repos
            .contacts
            .upsert(UpsertContact {
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
                jid,
                name,
                phone: Some(phone),
                raw: entry,
                synced_at: now,
            })
            .await?;
        count += 1;
    }

    Ok(count)
}

/// Extract `(jid, entry)` pairs from either contacts response shape
pub fn parse_contact_entries(body: &[u8]) -> Result<Vec<(String, Value)>, String> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|_| "invalid contacts response".to_string())?;

    let mut entries = Vec::new();

    if let Some(map) = payload.as_object() {
        // Format 1: map of jid → contact info
        for (key, value) in map {
            if value.is_object() && !key.is_empty() && key.contains('@') {
                entries.push((key.clone(), value.clone()));
            }
        }
        if !entries.is_empty() {
            return Ok(entries);
        }

        // Format 2: array under data/contacts
        let list = map
            .get("data")
            .or_else(|| map.get("contacts"))
            .and_then(|v| v.as_array());

        if let Some(list) = list {
            for item in list {
                let Some(entry) = item.as_object() else { continue };
                let jid = entry
                    .get("jid")
                    .and_then(|v| v.as_str())
                    .or_else(|| entry.get("id").and_then(|v| v.as_str()))
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                if !jid.is_empty() {
                    entries.push((jid, item.clone()));
                }
            }
        }
    }

    Ok(entries)
}

/// `628111…@s.whatsapp.net:24` → `628111…`
pub fn phone_from_jid(jid: &str) -> String {
    let left = jid.split('@').next().unwrap_or(jid);
    left.split(':').next().unwrap_or(left).to_string()
}

struct ProvisionedSession {
    id: String,
    token: Option<String>,
    webhook: Option<String>,
}

/// Parse `{data: {id, token, webhook}}` (or the same fields top-level)
/// from an admin user-creation response.
fn parse_admin_user_body(body: &[u8]) -> Option<ProvisionedSession> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let data = value.get("data").filter(|d| d.is_object()).unwrap_or(&value);
    let id = data.get("id").and_then(|v| v.as_str())?.to_string();

    Some(ProvisionedSession {
        id,
        token: data
            .get("token")
            .and_then(|v| v.as_str())
            .map(ToString::to_string),
        webhook: data
            .get("webhook")
            .and_then(|v| v.as_str())
            .map(ToString::to_string),
    })
}

/// Relay an upstream response body and status to the caller unchanged
pub fn upstream_passthrough(status: u16, body: Vec<u8>) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    (
        status,
        [(http::header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_from_jid() {
        assert_eq!(phone_from_jid("628111@s.whatsapp.net"), "628111");
        assert_eq!(phone_from_jid("628111:24@s.whatsapp.net"), "628111");
        assert_eq!(phone_from_jid("628111"), "628111");
    }

    #[test]
    fn test_contact_entries_map_shape() {
        let body = br#"{"628111@s.whatsapp.net": {"name": "Ana"}, "628222@s.whatsapp.net": {"name": "Bo"}}"#;
        let mut entries = parse_contact_entries(body).unwrap();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "628111@s.whatsapp.net");
    }

    #[test]
    fn test_contact_entries_array_shape() {
        let body = br#"{"data": [{"jid": "628111@s.whatsapp.net", "name": "Ana"}, {"id": "628222@s.whatsapp.net"}]}"#;
        let entries = parse_contact_entries(body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].0, "628222@s.whatsapp.net");
    }

    #[test]
    fn test_contact_entries_bad_json() {
        assert!(parse_contact_entries(b"<html>").is_err());
    }

    #[test]
    fn test_admin_body_with_token() {
        let body = br#"{"data": {"id": "s9", "token": "wat_up", "webhook": "https://cb"}}"#;
        let parsed = parse_admin_user_body(body).unwrap();
        assert_eq!(parsed.id, "s9");
        assert_eq!(parsed.token.as_deref(), Some("wat_up"));
    }
}
