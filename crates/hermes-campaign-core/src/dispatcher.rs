//! Per-campaign dispatcher
//!
//! One dispatcher run owns one bulk campaign from CAS admission to the
//! terminal status. Items are processed strictly in creation order with a
//! pacing delay between sends; each send gets up to three attempts with a
//! backoff chosen by error class. An item row is written exactly once,
//! after its outcome is known.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};

use hermes_client::error::ClientError;
use hermes_client::WaClient;
use hermes_db::models::{BulkCampaignRow, BulkItemRow};
use hermes_db::repo::{BulkCampaignRepository, MessageStatRepository, SessionRepository};
use hermes_media::MediaPreflight;
use hermes_types::CampaignType;

/// Dispatcher tuning knobs
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Delay between successive recipient sends
    pub pacing: Duration,
    /// Attempts per item, including the first
    pub max_attempts: u32,
    /// Backoff after timeout/connection failures
    pub transport_backoff: Duration,
    /// Backoff after any other failure
    pub retry_backoff: Duration,
    /// Consecutive-failure guard: abort the run once this many items fail
    /// back to back
    pub failure_guard: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_secs(2),
            max_attempts: 3,
            transport_backoff: Duration::from_secs(5),
            retry_backoff: Duration::from_secs(1),
            failure_guard: 10,
        }
    }
}

/// Dispatches one bulk campaign at a time; cheap to clone and share
#[derive(Clone)]
pub struct CampaignDispatcher {
    bulk: Arc<dyn BulkCampaignRepository>,
    sessions: Arc<dyn SessionRepository>,
    stats: Arc<dyn MessageStatRepository>,
    client: WaClient,
    media: MediaPreflight,
    config: DispatcherConfig,
}

impl CampaignDispatcher {
    pub fn new(
        bulk: Arc<dyn BulkCampaignRepository>,
        sessions: Arc<dyn SessionRepository>,
        stats: Arc<dyn MessageStatRepository>,
        client: WaClient,
        media: MediaPreflight,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            bulk,
            sessions,
            stats,
            client,
            media,
            config,
        }
    }

    /// Run one campaign to a terminal state. Safe to call concurrently
    /// for the same id: the CAS admission lets exactly one runner through.
    pub async fn run(&self, bulk_id: i64) {
        if let Err(err) = self.run_inner(bulk_id).await {
            tracing::error!(bulk_id, error = %err, "bulk campaign dispatch failed");
        }
    }

    async fn run_inner(&self, bulk_id: i64) -> Result<(), hermes_types::HermesError> {
        let now = Utc::now();
        if !self.bulk.claim_for_processing(bulk_id, now).await? {
            tracing::debug!(bulk_id, "campaign already claimed, skipping");
            return Ok(());
        }

        let Some(campaign) = self.bulk.find_by_id(bulk_id).await? else {
            tracing::warn!(bulk_id, "claimed campaign vanished");
            return Ok(());
        };

        tracing::info!(
            bulk_id,
            user_id = %campaign.user_id,
            total = campaign.total_count,
            "starting bulk campaign"
        );

        let Some(session) = self.sessions.latest_connected(&campaign.user_id).await? else {
            tracing::warn!(bulk_id, user_id = %campaign.user_id, "no active session");
            self.bulk
                .finalize(
                    bulk_id,
                    "failed",
                    Some("No active WhatsApp session found"),
                    Utc::now(),
                )
                .await?;
            return Ok(());
        };

        let items = self.bulk.items(bulk_id).await?;
        let mut sent: u32 = 0;
        let mut failed: u32 = 0;
        let mut consecutive_failures: u32 = 0;
        let mut aborted = false;

        for (index, item) in items.iter().enumerate() {
            if item.item_status() != hermes_types::BulkItemStatus::Pending {
                continue;
            }

            if aborted {
                self.bulk
                    .mark_item_failed(
                        item.id,
                        bulk_id,
                        "Campaign aborted: upstream failure threshold reached",
                    )
                    .await?;
                failed += 1;
                continue;
            }

            if index > 0 {
                tokio::time::sleep(self.config.pacing).await;
            }

            match self.send_item(&campaign, &session.session_token, item).await {
                Ok(message_id) => {
                    self.bulk
                        .mark_item_sent(item.id, bulk_id, &message_id, Utc::now())
                        .await?;
                    self.record_stat(&campaign, &session.session_id, true).await;
                    sent += 1;
                    consecutive_failures = 0;
                }
                Err(error_message) => {
                    tracing::warn!(
                        bulk_id,
                        phone = %item.phone,
                        error = %error_message,
                        "bulk item failed"
                    );
                    self.bulk
                        .mark_item_failed(item.id, bulk_id, &error_message)
                        .await?;
                    self.record_stat(&campaign, &session.session_id, false).await;
                    failed += 1;
                    consecutive_failures += 1;

                    if consecutive_failures >= self.config.failure_guard {
                        tracing::error!(
                            bulk_id,
                            consecutive_failures,
                            "aborting campaign, upstream appears degraded"
                        );
                        aborted = true;
                    }
                }
            }
        }

        let final_status = if sent == 0 && failed > 0 {
            "failed"
        } else {
            "completed"
        };
        self.bulk
            .finalize(bulk_id, final_status, None, Utc::now())
            .await?;

        tracing::info!(bulk_id, sent, failed, status = final_status, "bulk campaign finished");
        Ok(())
    }

    /// Build the payload, then send with retries. Returns the upstream
    /// message id or a final error message for the item row.
    async fn send_item(
        &self,
        campaign: &BulkCampaignRow,
        session_token: &str,
        item: &BulkItemRow,
    ) -> Result<String, String> {
        // Preflight failures are deterministic; they burn no retries
        let (endpoint, payload) = self.build_payload(campaign, &item.phone).await?;

        let mut last_error = String::new();
        for attempt in 1..=self.config.max_attempts {
            match self
                .client
                .send_message(endpoint, session_token, &payload)
                .await
            {
                Ok(success) => return Ok(success.message_id),
                Err(err) => {
                    let transport = err.is_transport();
                    last_error = err.to_string();

                    // No wait after the final attempt
                    if attempt < self.config.max_attempts {
                        let backoff = if transport {
                            self.config.transport_backoff
                        } else {
                            self.config.retry_backoff
                        };
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(format!(
            "Failed after {} attempts: {last_error}",
            self.config.max_attempts
        ))
    }

    /// Snapshot → wire payload. Text uses `{Phone, Body}`; image resolves
    /// the snapshot through media preflight into `{Phone, Image, Caption?}`.
    async fn build_payload(
        &self,
        campaign: &BulkCampaignRow,
        phone: &str,
    ) -> Result<(&'static str, Value), String> {
        match campaign.kind() {
            CampaignType::Text => {
                let body = campaign.message_body.clone().unwrap_or_default();
                Ok(("/chat/send/text", json!({ "Phone": phone, "Body": body })))
            }
            CampaignType::Image => {
                let image = match (&campaign.image_url, &campaign.image_base64) {
                    (Some(url), _) if !url.is_empty() => self
                        .media
                        .prepare_image(url)
                        .await
                        .map_err(|e| e.to_string())?,
                    (_, Some(b64)) if !b64.is_empty() => b64.clone(),
                    _ => return Err("Image URL is required for image campaigns".to_string()),
                };

                let mut payload = json!({ "Phone": phone, "Image": image });
                if let Some(caption) = campaign.caption.as_deref().filter(|c| !c.is_empty()) {
                    payload["Caption"] = Value::String(caption.to_string());
                }
                Ok(("/chat/send/image", payload))
            }
            CampaignType::Unknown => {
                Err(format!("Unsupported message type: {}", campaign.campaign_type))
            }
        }
    }

    async fn record_stat(&self, campaign: &BulkCampaignRow, session_id: &str, success: bool) {
        let (sent, failed) = if success { (1, 0) } else { (0, 1) };
        if let Err(err) = self
            .stats
            .increment(
                &campaign.user_id,
                session_id,
                &campaign.campaign_type,
                sent,
                failed,
            )
            .await
        {
            // Stats are best-effort; the send outcome is authoritative
            tracing::warn!(error = %err, "failed to record campaign message stat");
        }
    }
}

/// Classify an error for backoff selection (exposed for tests)
pub fn backoff_for(err: &ClientError, config: &DispatcherConfig) -> Duration {
    if err.is_transport() {
        config.transport_backoff
    } else {
        config.retry_backoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_selection() {
        let config = DispatcherConfig::default();
        assert_eq!(
            backoff_for(&ClientError::Timeout, &config),
            Duration::from_secs(5)
        );
        assert_eq!(
            backoff_for(&ClientError::Connection("refused".into()), &config),
            Duration::from_secs(5)
        );
        assert_eq!(
            backoff_for(&ClientError::Rejected("bad number".into()), &config),
            Duration::from_secs(1)
        );
        assert_eq!(
            backoff_for(&ClientError::HtmlResponse, &config),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_default_config_matches_contract() {
        let config = DispatcherConfig::default();
        assert_eq!(config.pacing, Duration::from_secs(2));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.failure_guard, 10);
    }
}
