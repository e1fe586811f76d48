//! PostgreSQL repository implementations

mod bulk;
mod campaign;
mod chat;
mod contact;
mod session;
mod stats;
mod subscription;
mod user;
mod webhook;

pub use bulk::PgBulkCampaignRepository;
pub use campaign::PgCampaignRepository;
pub use chat::PgChatRepository;
pub use contact::PgContactRepository;
pub use session::PgSessionRepository;
pub use stats::PgMessageStatRepository;
pub use subscription::PgSubscriptionRepository;
pub use user::PgUserRepository;
pub use webhook::PgWebhookEventRepository;

use sqlx::PgPool;

/// All repositories bundled for app state
#[derive(Clone)]
pub struct Repositories {
    pub users: PgUserRepository,
    pub subscriptions: PgSubscriptionRepository,
    pub sessions: PgSessionRepository,
    pub stats: PgMessageStatRepository,
    pub contacts: PgContactRepository,
    pub campaigns: PgCampaignRepository,
    pub bulk_campaigns: PgBulkCampaignRepository,
    pub webhook_events: PgWebhookEventRepository,
    pub chat: PgChatRepository,
}

impl Repositories {
    /// Create all repositories sharing one pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            subscriptions: PgSubscriptionRepository::new(pool.clone()),
            sessions: PgSessionRepository::new(pool.clone()),
            stats: PgMessageStatRepository::new(pool.clone()),
            contacts: PgContactRepository::new(pool.clone()),
            campaigns: PgCampaignRepository::new(pool.clone()),
            bulk_campaigns: PgBulkCampaignRepository::new(pool.clone()),
            webhook_events: PgWebhookEventRepository::new(pool.clone()),
            chat: PgChatRepository::new(pool),
        }
    }
}
