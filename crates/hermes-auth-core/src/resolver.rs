//! Credential resolution
//!
//! Turns each of the three credential kinds into an authorized principal:
//! customer API keys into `ServiceUser`s, session tokens into a session
//! plus its owner's active subscription. Subscription expiry is detected
//! at resolution time and flipped to `expired` in the same pass.

use std::sync::Arc;

use chrono::Utc;

use hermes_db::models::{ServiceUserRow, SessionRow, SubscriptionRow};
use hermes_db::repo::{SessionRepository, SubscriptionRepository, UserRepository};
use hermes_types::{HermesError, HermesResult};

use crate::crypto::hash_api_key;

/// A session token resolved all the way to quota state
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub session: SessionRow,
    pub subscription: SubscriptionRow,
}

impl ResolvedSession {
    /// Pre-flight message quota check. `max_messages = 0` means unlimited.
    pub fn check_message_quota(&self) -> HermesResult<()> {
        if self.subscription.max_messages > 0
            && self.session.last_message_sent >= self.subscription.max_messages
        {
            return Err(HermesError::MessageQuotaExceeded);
        }
        Ok(())
    }
}

/// Resolves credentials against the store
#[derive(Clone)]
pub struct AuthResolver {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    provider: String,
}

impl AuthResolver {
    /// Create a resolver for the given provider
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            users,
            sessions,
            subscriptions,
            provider: provider.into(),
        }
    }

    /// The subscription provider this resolver checks against
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Resolve a customer API key to its user.
    ///
    /// The key is hashed before lookup; plaintext never reaches the store.
    pub async fn resolve_customer(&self, api_key: &str) -> HermesResult<ServiceUserRow> {
        let hash = hash_api_key(api_key);
        let user = self
            .users
            .find_by_api_key_hash(&hash)
            .await?
            .ok_or(HermesError::InvalidApiKey)?;

        if !user.is_active() {
            return Err(HermesError::UserInactive);
        }

        Ok(user)
    }

    /// Fetch the active subscription for a user, flipping it to `expired`
    /// when its time has passed.
    pub async fn active_subscription(&self, user_id: &str) -> HermesResult<SubscriptionRow> {
        let sub = self
            .subscriptions
            .find_active(user_id, &self.provider)
            .await?
            .ok_or(HermesError::NoActiveSubscription)?;

        let now = Utc::now();
        if sub.is_expired_at(now) {
            self.subscriptions.mark_expired(sub.id).await?;
            return Err(HermesError::SubscriptionExpired(
                sub.expires_at.format("%Y-%m-%d").to_string(),
            ));
        }

        Ok(sub)
    }

    /// Resolve a session token to the session and its owner's active
    /// subscription.
    pub async fn resolve_session_token(&self, token: &str) -> HermesResult<ResolvedSession> {
        let session = self
            .sessions
            .find_by_token(token)
            .await?
            .ok_or(HermesError::InvalidToken)?;

        let subscription = self.active_subscription(&session.user_id).await?;

        Ok(ResolvedSession {
            session,
            subscription,
        })
    }

    /// Connected-session cap check, applied when admitting a connect request
    pub async fn check_session_limit(
        &self,
        user_id: &str,
        max_sessions: i32,
    ) -> HermesResult<()> {
        let current = self.sessions.count_connected(user_id).await?;
        if current >= i64::from(max_sessions) {
            return Err(HermesError::SessionLimitExceeded {
                max: max_sessions,
                current,
            });
        }
        Ok(())
    }

    /// Provisioning cap check, applied when creating a session record
    pub async fn check_provision_limit(
        &self,
        user_id: &str,
        max_sessions: i32,
    ) -> HermesResult<()> {
        let current = self.sessions.count_active(user_id).await?;
        if current >= i64::from(max_sessions) {
            return Err(HermesError::SessionLimitExceeded {
                max: max_sessions,
                current,
            });
        }
        Ok(())
    }
}
