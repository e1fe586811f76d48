//! Campaign surface (`/bulk/**`)
//!
//! Campaign templates are reusable content blobs; executing one snapshots
//! its content into a bulk campaign with one item per recipient. The
//! response envelope is `{code, success, message, data}` throughout.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use hermes_campaign_core::{parse_send_sync, ScheduleOutcome};
use hermes_db::repo::{
    BulkCampaignRepository, CampaignRepository, ContactRepository, CreateBulkCampaign,
    CreateCampaign, SessionRepository, UpdateCampaign, UpsertContact,
};
use hermes_types::{BulkCampaignStatus, CampaignType, Envelope};

use crate::error::ApiResult;
use crate::extractors::CustomerUser;
use crate::handlers::sessions::{phone_from_jid, sync_contacts_from_body, upstream_passthrough};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub campaign_type: String,
    #[serde(default)]
    pub message_body: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCampaignRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message_body: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteCampaignRequest {
    pub campaign_id: i64,
    pub name: String,
    pub phone: Vec<String>,
    pub send_sync: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddContactsRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub contacts: Vec<ManualContact>,
}

#[derive(Debug, Deserialize)]
pub struct ManualContact {
    pub phone: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteContactsRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub jids: Vec<String>,
    #[serde(default)]
    pub all: bool,
}

fn envelope_response<T: serde::Serialize>(envelope: Envelope<T>) -> Response {
    let status = StatusCode::from_u16(envelope.code).unwrap_or(StatusCode::OK);
    (status, Json(envelope)).into_response()
}

fn failure(code: u16, message: impl Into<String>) -> Response {
    envelope_response::<Value>(Envelope::failure(code, message))
}

/// POST /bulk/campaigns
pub async fn create_campaign(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Json(req): Json<CreateCampaignRequest>,
) -> ApiResult<Response> {
    let kind = CampaignType::parse(&req.campaign_type);
    match kind {
        CampaignType::Text => {
            if req.message_body.as_deref().unwrap_or("").is_empty() {
                return Ok(failure(400, "Message body is required for text campaigns"));
            }
        }
        CampaignType::Image => {
            let has_url = req.image_url.as_deref().is_some_and(|v| !v.is_empty());
            let has_b64 = req.image_base64.as_deref().is_some_and(|v| !v.is_empty());
            if !has_url && !has_b64 {
                return Ok(failure(
                    400,
                    "Image URL or base64 is required for image campaigns",
                ));
            }
        }
        CampaignType::Unknown => {
            return Ok(failure(400, "Campaign type must be 'text' or 'image'"));
        }
    }

    let campaign = state
        .repos
        .campaigns
        .create(CreateCampaign {
            user_id: user.user_id,
            name: req.name,
            campaign_type: kind.as_str().to_string(),
            message_body: req.message_body,
            image_url: req.image_url,
            image_base64: req.image_base64,
            caption: req.caption,
        })
        .await?;

    Ok(envelope_response(Envelope::created(
        campaign,
        "Campaign created successfully",
    )))
}

/// GET /bulk/campaigns
pub async fn list_campaigns(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
) -> ApiResult<Response> {
    let campaigns = state.repos.campaigns.list(&user.user_id).await?;
    Ok(envelope_response(Envelope::ok(campaigns)))
}

/// GET /bulk/campaigns/{id}
pub async fn get_campaign(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    match state.repos.campaigns.find(&user.user_id, id).await? {
        Some(campaign) => Ok(envelope_response(Envelope::ok(campaign))),
        None => Ok(failure(404, "Campaign not found")),
    }
}

/// PUT /bulk/campaigns/{id} - type is immutable, content is not
pub async fn update_campaign(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCampaignRequest>,
) -> ApiResult<Response> {
    let updated = state
        .repos
        .campaigns
        .update(
            &user.user_id,
            id,
            UpdateCampaign {
                name: req.name,
                status: req.status,
                message_body: req.message_body,
                image_url: req.image_url,
                image_base64: req.image_base64,
                caption: req.caption,
            },
        )
        .await?;

    match updated {
        Some(campaign) => Ok(envelope_response(Envelope::ok_with_message(
            campaign,
            "Campaign updated successfully",
        ))),
        None => Ok(failure(404, "Campaign not found")),
    }
}

/// DELETE /bulk/campaigns/{id}
///
/// Queued executions carry their own content snapshot, so deleting the
/// template never touches them.
pub async fn delete_campaign(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    if state.repos.campaigns.delete(&user.user_id, id).await? {
        Ok(envelope_response(Envelope::ok_with_message(
            Value::Null,
            "Campaign deleted successfully",
        )))
    } else {
        Ok(failure(404, "Campaign not found"))
    }
}

/// POST /bulk/campaigns/execute - snapshot a template into an execution
pub async fn execute_campaign(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Json(req): Json<ExecuteCampaignRequest>,
) -> ApiResult<Response> {
    if req.phone.is_empty() {
        return Ok(failure(400, "At least one recipient phone is required"));
    }

    let Some(campaign) = state
        .repos
        .campaigns
        .find(&user.user_id, req.campaign_id)
        .await?
    else {
        return Ok(failure(404, "Campaign not found"));
    };

    let outcome = match parse_send_sync(&req.send_sync, req.timezone.as_deref(), Utc::now()) {
        Ok(outcome) => outcome,
        Err(err) => return Ok(failure(400, format!("Invalid send_sync format: {err}"))),
    };

    let (status, scheduled_at, timezone) = match outcome {
        ScheduleOutcome::Immediate => (BulkCampaignStatus::Pending, None, None),
        ScheduleOutcome::At { utc, timezone } => {
            (BulkCampaignStatus::Scheduled, Some(utc), timezone)
        }
    };

    let bulk = state
        .repos
        .bulk_campaigns
        .create_with_items(
            CreateBulkCampaign {
                user_id: user.user_id.clone(),
                campaign_id: Some(campaign.id),
                name: req.name,
                campaign_type: campaign.campaign_type.clone(),
                message_body: campaign.message_body.clone(),
                image_url: campaign.image_url.clone(),
                image_base64: campaign.image_base64.clone(),
                caption: campaign.caption.clone(),
                status: status.as_str().to_string(),
                scheduled_at,
                timezone,
            },
            &req.phone,
        )
        .await?;

    // Immediate executions go straight to a dispatcher task
    if status == BulkCampaignStatus::Pending {
        let dispatcher = state.dispatcher.clone();
        let bulk_id = bulk.id;
        tokio::spawn(async move {
            dispatcher.run(bulk_id).await;
        });
    }

    let data = json!({
        "bulk_campaign_id": bulk.id,
        "total_recipients": bulk.total_count,
        "status": bulk.status,
        "scheduled_at": bulk.scheduled_at,
        "timezone": bulk.timezone,
    });

    Ok(envelope_response(Envelope::created(
        data,
        "Bulk campaign created successfully",
    )))
}

/// GET /bulk/executions
pub async fn list_bulk_campaigns(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
) -> ApiResult<Response> {
    let campaigns = state.repos.bulk_campaigns.list(&user.user_id).await?;
    Ok(envelope_response(Envelope::ok(campaigns)))
}

/// GET /bulk/executions/{id}
pub async fn get_bulk_campaign(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let Some(bulk) = state.repos.bulk_campaigns.find(&user.user_id, id).await? else {
        return Ok(failure(404, "Bulk campaign not found"));
    };

    let items = state.repos.bulk_campaigns.items(bulk.id).await?;
    Ok(envelope_response(Envelope::ok(json!({
        "bulk_campaign": bulk,
        "items": items,
    }))))
}

/// DELETE /bulk/executions/{id}
///
/// A campaign in `processing` belongs to its dispatcher and cannot be
/// deleted out from under it.
pub async fn delete_bulk_campaign(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let Some(bulk) = state.repos.bulk_campaigns.find(&user.user_id, id).await? else {
        return Ok(failure(404, "Bulk campaign not found"));
    };

    if bulk.bulk_status() == BulkCampaignStatus::Processing {
        return Ok(failure(400, "Cannot delete a bulk campaign while it is processing"));
    }

    state.repos.bulk_campaigns.delete(&user.user_id, id).await?;
    Ok(envelope_response(Envelope::ok_with_message(
        Value::Null,
        "Bulk campaign deleted successfully",
    )))
}

/// POST /bulk/contacts - manual contact add/update
pub async fn add_contacts(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Json(req): Json<AddContactsRequest>,
) -> ApiResult<Response> {
    if req.contacts.is_empty() {
        return Ok(failure(400, "At least one contact is required"));
    }

    let session_id = match resolve_session_id(&state, &user.user_id, req.session_id).await? {
        Some(session_id) => session_id,
        None => "manual".to_string(),
    };

    let now = Utc::now();
    let mut processed = 0;
    for contact in &req.contacts {
        let jid = if contact.phone.contains('@') {
            contact.phone.clone()
        } else {
            format!("{}@s.whatsapp.net", contact.phone)
        };

        state
            .repos
            .contacts
            .upsert(UpsertContact {
                user_id: user.user_id.clone(),
                session_id: session_id.clone(),
                jid,
                name: Some(contact.full_name.clone()),
                phone: Some(phone_from_jid(&contact.phone)),
                raw: json!({ "source": "manual", "full_name": contact.full_name }),
                synced_at: now,
            })
            .await?;
        processed += 1;
    }

    Ok(envelope_response(Envelope::ok_with_message(
        json!({ "processed": processed, "session_id": session_id }),
        format!("Processed {processed} contacts"),
    )))
}

/// POST /bulk/contacts/sync - pull contacts from the upstream
pub async fn sync_contacts(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
) -> ApiResult<Response> {
    let Some(session) = state.repos.sessions.latest_connected(&user.user_id).await? else {
        return Ok(failure(400, "No active WhatsApp session found"));
    };

    let (status, body) = state
        .client
        .token_json(
            http::Method::GET,
            "/user/contacts",
            &session.session_token,
            None,
        )
        .await
        .map_err(hermes_types::HermesError::from)?;

    if !(200..300).contains(&status) {
        return Ok(upstream_passthrough(status, body));
    }

    let count =
        sync_contacts_from_body(&state, &user.user_id, &session.session_id, &body).await?;

    Ok(envelope_response(Envelope::ok(json!({ "synced": count }))))
}

/// DELETE /bulk/contacts - bulk delete by JID list or wholesale
pub async fn delete_contacts(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Json(req): Json<DeleteContactsRequest>,
) -> ApiResult<Response> {
    if !req.all && req.jids.is_empty() {
        return Ok(failure(400, "Provide jids to delete or set all=true"));
    }

    let session_id = match resolve_session_id(&state, &user.user_id, req.session_id).await? {
        Some(session_id) => session_id,
        None => return Ok(failure(400, "No session found for contact deletion")),
    };

    let deleted = if req.all {
        state
            .repos
            .contacts
            .delete_all(&user.user_id, &session_id)
            .await?
    } else {
        state
            .repos
            .contacts
            .delete_many(&user.user_id, &session_id, &req.jids)
            .await?
    };

    Ok(envelope_response(Envelope::ok(json!({ "deleted": deleted }))))
}

/// POST /bulk/cron/process - unauthenticated, idempotent scheduler kick
pub async fn cron_process(State(state): State<AppState>) -> ApiResult<Response> {
    let now = Utc::now();
    let processed = state.scheduler.tick(now).await?;

    Ok(envelope_response(Envelope::ok_with_message(
        json!({ "processed_count": processed, "checked_at": now }),
        "Bulk campaign cron job completed",
    )))
}

async fn resolve_session_id(
    state: &AppState,
    user_id: &str,
    requested: Option<String>,
) -> Result<Option<String>, crate::error::ApiError> {
    if let Some(session_id) = requested.filter(|s| !s.is_empty()) {
        return Ok(Some(session_id));
    }

    let sessions = state.repos.sessions.find_by_user(user_id).await?;
    Ok(sessions.first().map(|s| s.session_id.clone()))
}
