//! In-memory repository mocks for resolver tests

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use hermes_db::models::{ServiceUserRow, SessionRow, SubscriptionRow};
use hermes_db::repo::*;
use hermes_db::DbResult;

pub fn user_row(user_id: &str, status: &str) -> ServiceUserRow {
    ServiceUserRow {
        user_id: user_id.to_string(),
        source_service: "billing".to_string(),
        api_key_hash: hermes_auth_core::hash_api_key(&format!("key-{user_id}")),
        status: status.to_string(),
        created_by: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn session_row(user_id: &str, token: &str, connected: bool) -> SessionRow {
    SessionRow {
        id: 1,
        user_id: user_id.to_string(),
        provider: "hermes-wa".to_string(),
        session_id: format!("sess-{user_id}"),
        session_name: None,
        session_token: token.to_string(),
        webhook_url: None,
        jid: None,
        connected,
        logged_in: connected,
        status: if connected { "connected" } else { "created" }.to_string(),
        auto_read_enabled: false,
        typing_enabled: false,
        chat_log_enabled: false,
        qr_code: None,
        qr_expired_at: None,
        connected_at: None,
        disconnected_at: None,
        last_message_sent: 0,
        last_message_fail: 0,
        last_synced_at: None,
        last_activity_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn subscription_row(user_id: &str, expires_in_hours: i64) -> SubscriptionRow {
    SubscriptionRow {
        id: 1,
        user_id: user_id.to_string(),
        provider: "hermes-wa".to_string(),
        max_sessions: 1,
        max_messages: 0,
        expires_at: Utc::now() + Duration::hours(expires_in_hours),
        status: "active".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[derive(Default)]
pub struct MockUserRepo {
    pub users: Mutex<Vec<ServiceUserRow>>,
}

#[async_trait]
impl UserRepository for MockUserRepo {
    async fn find_by_id(&self, user_id: &str) -> DbResult<Option<ServiceUserRow>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned())
    }

    async fn find_by_api_key_hash(&self, hash: &str) -> DbResult<Option<ServiceUserRow>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.api_key_hash == hash)
            .cloned())
    }

    async fn list(
        &self,
        _source: Option<&str>,
        _limit: i64,
        _offset: i64,
    ) -> DbResult<Vec<ServiceUserRow>> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn count(&self, _source: Option<&str>) -> DbResult<i64> {
        Ok(self.users.lock().unwrap().len() as i64)
    }

    async fn create(&self, user: CreateServiceUser) -> DbResult<ServiceUserRow> {
        let row = ServiceUserRow {
            user_id: user.user_id,
            source_service: user.source_service,
            api_key_hash: user.api_key_hash,
            status: "active".to_string(),
            created_by: user.created_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.users.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn update_source(&self, _user_id: &str, _source: &str) -> DbResult<()> {
        Ok(())
    }

    async fn update_api_key_hash(&self, user_id: &str, hash: &str) -> DbResult<()> {
        for user in self.users.lock().unwrap().iter_mut() {
            if user.user_id == user_id {
                user.api_key_hash = hash.to_string();
            }
        }
        Ok(())
    }

    async fn belongs_to_source(&self, user_id: &str, source: &str) -> DbResult<bool> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .any(|u| u.user_id == user_id && u.source_service == source))
    }
}

#[derive(Default)]
pub struct MockSessionRepo {
    pub sessions: Mutex<Vec<SessionRow>>,
}

#[async_trait]
impl SessionRepository for MockSessionRepo {
    async fn find_by_token(&self, token: &str) -> DbResult<Option<SessionRow>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.session_token == token)
            .cloned())
    }

    async fn find_by_session_id(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> DbResult<Option<SessionRow>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == user_id && s.session_id == session_id)
            .cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> DbResult<Vec<SessionRow>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn latest_connected(&self, user_id: &str) -> DbResult<Option<SessionRow>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == user_id && s.connected)
            .cloned())
    }

    async fn count_connected(&self, user_id: &str) -> DbResult<i64> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.connected)
            .count() as i64)
    }

    async fn count_active(&self, user_id: &str) -> DbResult<i64> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| {
                s.user_id == user_id
                    && matches!(s.status.as_str(), "active" | "connected" | "qr_waiting" | "created")
            })
            .count() as i64)
    }

    async fn create(&self, session: CreateSession) -> DbResult<SessionRow> {
        let mut row = session_row(&session.user_id, &session.session_token, false);
        row.session_id = session.session_id;
        row.status = session.status;
        self.sessions.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn update_settings(
        &self,
        _user_id: &str,
        _session_id: &str,
        _update: SessionSettingsUpdate,
    ) -> DbResult<()> {
        Ok(())
    }

    async fn sync_from_upstream(
        &self,
        _user_id: &str,
        _sync: UpstreamSessionSync,
    ) -> DbResult<()> {
        Ok(())
    }

    async fn apply_session_event(
        &self,
        _token: &str,
        _update: SessionEventUpdate,
    ) -> DbResult<()> {
        Ok(())
    }

    async fn record_send_outcome(&self, _id: i64, _success: bool) -> DbResult<()> {
        Ok(())
    }

    async fn delete(&self, _user_id: &str, _session_id: &str) -> DbResult<bool> {
        Ok(false)
    }
}

#[derive(Default)]
pub struct MockSubscriptionRepo {
    pub subscriptions: Mutex<Vec<SubscriptionRow>>,
    pub expired_ids: Mutex<Vec<i64>>,
}

#[async_trait]
impl SubscriptionRepository for MockSubscriptionRepo {
    async fn find_active(
        &self,
        user_id: &str,
        provider: &str,
    ) -> DbResult<Option<SubscriptionRow>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == user_id && s.provider == provider && s.status == "active")
            .cloned())
    }

    async fn find_latest(
        &self,
        user_id: &str,
        provider: &str,
    ) -> DbResult<Option<SubscriptionRow>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == user_id && s.provider == provider)
            .cloned())
    }

    async fn upsert(&self, sub: UpsertSubscription) -> DbResult<SubscriptionRow> {
        let row = SubscriptionRow {
            id: 1,
            user_id: sub.user_id,
            provider: sub.provider,
            max_sessions: sub.max_sessions,
            max_messages: sub.max_messages,
            expires_at: sub.expires_at,
            status: "active".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.subscriptions.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn mark_expired(&self, id: i64) -> DbResult<()> {
        self.expired_ids.lock().unwrap().push(id);
        for sub in self.subscriptions.lock().unwrap().iter_mut() {
            if sub.id == id {
                sub.status = "expired".to_string();
            }
        }
        Ok(())
    }

    async fn expire_due(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let mut affected = 0;
        for sub in self.subscriptions.lock().unwrap().iter_mut() {
            if sub.status == "active" && sub.expires_at <= now {
                sub.status = "expired".to_string();
                affected += 1;
            }
        }
        Ok(affected)
    }
}
