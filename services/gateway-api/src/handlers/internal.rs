//! Internal provisioning surface (`/internal/**`)
//!
//! Callers authenticate with `x-internal-api-key`. A scoped key
//! (`source:secret`) may only see and mutate users of its own source
//! service. API-key plaintext leaves the process exactly once, on user
//! creation or rotation.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use hermes_auth_core::generate_api_key;
use hermes_db::repo::{
    CreateServiceUser, SubscriptionRepository, UpsertSubscription, UserRepository,
};
use hermes_types::HermesError;

use crate::error::{ApiError, ApiResult};
use crate::extractors::InternalAuth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpsertUserRequest {
    pub user_id: String,
    pub source: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub max_sessions: i32,
    #[serde(default)]
    pub max_messages: i64,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UserListItem {
    pub user_id: String,
    pub source_service: String,
    pub status: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub subscription: Option<SubscriptionView>,
    pub session_count: i64,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    pub provider: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub max_sessions: i32,
    pub max_messages: i64,
}

/// GET /internal/me
pub async fn me(InternalAuth(scope): InternalAuth) -> Json<serde_json::Value> {
    let (mode, source) = match scope.source_filter() {
        Some(source) => ("scoped", Some(source.to_string())),
        None => ("global", None),
    };

    Json(json!({
        "auth": {
            "mode": mode,
            "source_service": source,
        }
    }))
}

/// GET /internal/users
pub async fn list_users(
    State(state): State<AppState>,
    InternalAuth(scope): InternalAuth,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    // A scoped key's filter always wins over the requested one
    let source = match scope.source_filter() {
        Some(own) => Some(own.to_string()),
        None => query.source.clone(),
    };

    let provider = query
        .provider
        .clone()
        .unwrap_or_else(|| state.config.provider.clone());
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * limit;

    let total = state.repos.users.count(source.as_deref()).await?;
    let users = state
        .repos
        .users
        .list(source.as_deref(), limit, offset)
        .await?;

    let mut items = Vec::with_capacity(users.len());
    for user in users {
        let subscription = state
            .repos
            .subscriptions
            .find_latest(&user.user_id, &provider)
            .await?
            .map(|sub| SubscriptionView {
                provider: sub.provider,
                status: sub.status,
                expires_at: sub.expires_at,
                max_sessions: sub.max_sessions,
                max_messages: sub.max_messages,
            });

        let session_count = {
            use hermes_db::repo::SessionRepository;
            state.repos.sessions.find_by_user(&user.user_id).await?.len() as i64
        };

        items.push(UserListItem {
            user_id: user.user_id,
            source_service: user.source_service,
            status: user.status,
            created_by: user.created_by,
            created_at: user.created_at,
            updated_at: user.updated_at,
            subscription,
            session_count,
        });
    }

    Ok(Json(json!({
        "items": items,
        "meta": {
            "page": page,
            "limit": limit,
            "total": total,
            "provider": provider,
            "source": source,
        }
    })))
}

/// POST /internal/users - create or refresh a user and their subscription
pub async fn upsert_user(
    State(state): State<AppState>,
    InternalAuth(scope): InternalAuth,
    Json(req): Json<UpsertUserRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if !scope.allows_source(&req.source) {
        return Err(HermesError::Forbidden("key only allowed for its own source".into()).into());
    }

    let max_sessions = if req.max_sessions <= 0 { 1 } else { req.max_sessions };
    let provider = req
        .provider
        .clone()
        .unwrap_or_else(|| state.config.provider.clone());

    let existing = state.repos.users.find_by_id(&req.user_id).await?;
    let plain_api_key = match existing {
        Some(_) => {
            state
                .repos
                .users
                .update_source(&req.user_id, &req.source)
                .await?;
            None
        }
        None => {
            let key = generate_api_key("gwa");
            state
                .repos
                .users
                .create(CreateServiceUser {
                    user_id: req.user_id.clone(),
                    source_service: req.source.clone(),
                    api_key_hash: key.hash,
                    created_by: req.created_by.clone(),
                })
                .await?;
            Some(key.raw)
        }
    };

    state
        .repos
        .subscriptions
        .upsert(UpsertSubscription {
            user_id: req.user_id.clone(),
            provider,
            max_sessions,
            max_messages: req.max_messages,
            expires_at: req.expires_at,
        })
        .await?;

    Ok(Json(json!({
        "user_id": req.user_id,
        "api_key": plain_api_key,
        "note": "api_key is only returned when the user is first created",
    })))
}

/// PUT /internal/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    InternalAuth(scope): InternalAuth,
    Path(user_id): Path<String>,
    Json(req): Json<UpsertUserRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if !scope.allows_source(&req.source) {
        return Err(HermesError::Forbidden("key only allowed for its own source".into()).into());
    }
    ensure_scope_owns_user(&state, &scope, &user_id).await?;

    if state.repos.users.find_by_id(&user_id).await?.is_none() {
        return Err(HermesError::NotFound("user".into()).into());
    }

    let max_sessions = if req.max_sessions <= 0 { 1 } else { req.max_sessions };
    let provider = req
        .provider
        .clone()
        .unwrap_or_else(|| state.config.provider.clone());

    state.repos.users.update_source(&user_id, &req.source).await?;
    state
        .repos
        .subscriptions
        .upsert(UpsertSubscription {
            user_id: user_id.clone(),
            provider,
            max_sessions,
            max_messages: req.max_messages,
            expires_at: req.expires_at,
        })
        .await?;

    Ok(Json(json!({ "message": "updated" })))
}

/// GET /internal/users/{id}/apikey
///
/// Keys are stored hashed; there is nothing to return but the policy.
pub async fn get_user_api_key(
    State(state): State<AppState>,
    InternalAuth(scope): InternalAuth,
    Path(user_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ensure_scope_owns_user(&state, &scope, &user_id).await?;

    Ok(Json(json!({
        "user_id": user_id,
        "note": "api keys are stored as hashes and cannot be read back; rotate to obtain a new one",
    })))
}

/// POST /internal/users/{id}/apikey/rotate
pub async fn rotate_user_api_key(
    State(state): State<AppState>,
    InternalAuth(scope): InternalAuth,
    Path(user_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ensure_scope_owns_user(&state, &scope, &user_id).await?;

    if state.repos.users.find_by_id(&user_id).await?.is_none() {
        return Err(HermesError::NotFound("user".into()).into());
    }

    let key = generate_api_key("gwa");
    state
        .repos
        .users
        .update_api_key_hash(&user_id, &key.hash)
        .await?;

    Ok(Json(json!({
        "user_id": user_id,
        "api_key": key.raw,
    })))
}

async fn ensure_scope_owns_user(
    state: &AppState,
    scope: &hermes_auth_core::InternalScope,
    user_id: &str,
) -> Result<(), ApiError> {
    if let Some(source) = scope.source_filter() {
        let owned = state.repos.users.belongs_to_source(user_id, source).await?;
        if !owned {
            return Err(
                HermesError::Forbidden("user does not belong to this source".into()).into(),
            );
        }
    }
    Ok(())
}
