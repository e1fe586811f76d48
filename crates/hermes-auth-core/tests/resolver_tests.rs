//! Resolver integration tests against in-memory repositories

mod common;

use std::sync::Arc;

use common::mock_repos::*;
use hermes_auth_core::{hash_api_key, AuthResolver};
use hermes_types::HermesError;

fn resolver(
    users: Arc<MockUserRepo>,
    sessions: Arc<MockSessionRepo>,
    subscriptions: Arc<MockSubscriptionRepo>,
) -> AuthResolver {
    AuthResolver::new(users, sessions, subscriptions, "hermes-wa")
}

#[tokio::test]
async fn customer_key_resolves_active_user() {
    let users = Arc::new(MockUserRepo::default());
    users.users.lock().unwrap().push(user_row("u1", "active"));

    let resolver = resolver(
        users,
        Arc::new(MockSessionRepo::default()),
        Arc::new(MockSubscriptionRepo::default()),
    );

    let user = resolver.resolve_customer("key-u1").await.unwrap();
    assert_eq!(user.user_id, "u1");
}

#[tokio::test]
async fn unknown_key_is_unauthorized() {
    let resolver = resolver(
        Arc::new(MockUserRepo::default()),
        Arc::new(MockSessionRepo::default()),
        Arc::new(MockSubscriptionRepo::default()),
    );

    let err = resolver.resolve_customer("key-nobody").await.unwrap_err();
    assert!(matches!(err, HermesError::InvalidApiKey));
}

#[tokio::test]
async fn inactive_user_is_forbidden() {
    let users = Arc::new(MockUserRepo::default());
    users.users.lock().unwrap().push(user_row("u2", "inactive"));

    let resolver = resolver(
        users,
        Arc::new(MockSessionRepo::default()),
        Arc::new(MockSubscriptionRepo::default()),
    );

    let err = resolver.resolve_customer("key-u2").await.unwrap_err();
    assert!(matches!(err, HermesError::UserInactive));
}

#[tokio::test]
async fn rotation_invalidates_old_key() {
    let users = Arc::new(MockUserRepo::default());
    users.users.lock().unwrap().push(user_row("u1", "active"));

    let resolver = resolver(
        users.clone(),
        Arc::new(MockSessionRepo::default()),
        Arc::new(MockSubscriptionRepo::default()),
    );

    assert!(resolver.resolve_customer("key-u1").await.is_ok());

    let new_hash = hash_api_key("key-rotated");
    hermes_db::repo::UserRepository::update_api_key_hash(users.as_ref(), "u1", &new_hash)
        .await
        .unwrap();

    assert!(matches!(
        resolver.resolve_customer("key-u1").await.unwrap_err(),
        HermesError::InvalidApiKey
    ));
    assert!(resolver.resolve_customer("key-rotated").await.is_ok());
}

#[tokio::test]
async fn session_token_resolves_with_subscription() {
    let sessions = Arc::new(MockSessionRepo::default());
    sessions
        .sessions
        .lock()
        .unwrap()
        .push(session_row("u1", "wat_token1", true));

    let subscriptions = Arc::new(MockSubscriptionRepo::default());
    subscriptions
        .subscriptions
        .lock()
        .unwrap()
        .push(subscription_row("u1", 24));

    let resolver = resolver(Arc::new(MockUserRepo::default()), sessions, subscriptions);

    let resolved = resolver.resolve_session_token("wat_token1").await.unwrap();
    assert_eq!(resolved.session.user_id, "u1");
    assert_eq!(resolved.subscription.status, "active");
}

#[tokio::test]
async fn expired_subscription_is_flipped_once() {
    let sessions = Arc::new(MockSessionRepo::default());
    sessions
        .sessions
        .lock()
        .unwrap()
        .push(session_row("u1", "wat_token1", true));

    let subscriptions = Arc::new(MockSubscriptionRepo::default());
    subscriptions
        .subscriptions
        .lock()
        .unwrap()
        .push(subscription_row("u1", -1));

    let resolver = resolver(
        Arc::new(MockUserRepo::default()),
        sessions,
        subscriptions.clone(),
    );

    // First request detects expiry and flips the row
    let err = resolver.resolve_session_token("wat_token1").await.unwrap_err();
    assert!(matches!(err, HermesError::SubscriptionExpired(_)));
    assert_eq!(subscriptions.expired_ids.lock().unwrap().len(), 1);

    // Second identical request fails without another flip: the row is no
    // longer active, so resolution stops at the subscription lookup
    let err = resolver.resolve_session_token("wat_token1").await.unwrap_err();
    assert!(matches!(err, HermesError::NoActiveSubscription));
    assert_eq!(subscriptions.expired_ids.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn session_limit_rejects_at_cap() {
    let sessions = Arc::new(MockSessionRepo::default());
    sessions
        .sessions
        .lock()
        .unwrap()
        .push(session_row("u1", "wat_a", true));

    let resolver = resolver(
        Arc::new(MockUserRepo::default()),
        sessions,
        Arc::new(MockSubscriptionRepo::default()),
    );

    let err = resolver.check_session_limit("u1", 1).await.unwrap_err();
    assert!(matches!(
        err,
        HermesError::SessionLimitExceeded { max: 1, current: 1 }
    ));

    assert!(resolver.check_session_limit("u1", 2).await.is_ok());
}

#[tokio::test]
async fn quota_check_treats_zero_as_unlimited() {
    let mut session = session_row("u1", "wat_a", true);
    session.last_message_sent = 10_000;

    let mut subscription = subscription_row("u1", 24);
    subscription.max_messages = 0;

    let resolved = hermes_auth_core::ResolvedSession {
        session: session.clone(),
        subscription: subscription.clone(),
    };
    assert!(resolved.check_message_quota().is_ok());

    subscription.max_messages = 100;
    let resolved = hermes_auth_core::ResolvedSession {
        session,
        subscription,
    };
    assert!(matches!(
        resolved.check_message_quota().unwrap_err(),
        HermesError::MessageQuotaExceeded
    ));
}
