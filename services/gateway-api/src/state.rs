//! Application state

use std::sync::Arc;

use hermes_auth_core::{AuthResolver, InternalKeyRegistry, RateLimiter};
use hermes_campaign_core::{CampaignDispatcher, CampaignScheduler};
use hermes_client::WaClient;
use hermes_db::pg::Repositories;
use hermes_db::DbPool;
use hermes_media::MediaPreflight;

use crate::config::Config;
use crate::stats::StatsRecorder;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database repositories
    pub repos: Repositories,
    /// Credential resolution
    pub resolver: Arc<AuthResolver>,
    /// Parsed internal service keys
    pub internal_keys: Arc<InternalKeyRegistry>,
    /// Upstream WhatsApp client
    pub client: WaClient,
    /// Image preflight
    pub media: MediaPreflight,
    /// Public-surface rate limiter
    pub limiter: Arc<RateLimiter>,
    /// Fire-and-forget send accounting
    pub stats: StatsRecorder,
    /// Per-campaign dispatcher
    pub dispatcher: Arc<CampaignDispatcher>,
    /// Campaign scheduler (shared with the cron kick endpoint)
    pub scheduler: CampaignScheduler,
    /// Database connection pool
    #[allow(dead_code)]
    pub pool: DbPool,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire up all components over one pool
    pub fn new(
        pool: DbPool,
        config: Config,
        stats: StatsRecorder,
    ) -> Self {
        let repos = Repositories::new(pool.clone());

        let resolver = Arc::new(AuthResolver::new(
            Arc::new(repos.users.clone()),
            Arc::new(repos.sessions.clone()),
            Arc::new(repos.subscriptions.clone()),
            config.provider.clone(),
        ));

        let internal_keys = Arc::new(InternalKeyRegistry::from_config(&config.internal_api_keys));

        let client = WaClient::new(hermes_client::config::ClientConfig::new(
            &config.wa_server_url,
            &config.wa_admin_token,
        ));

        let media = MediaPreflight::new();
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        let dispatcher = Arc::new(CampaignDispatcher::new(
            Arc::new(repos.bulk_campaigns.clone()),
            Arc::new(repos.sessions.clone()),
            Arc::new(repos.stats.clone()),
            client.clone(),
            media.clone(),
            config.dispatcher.clone(),
        ));

        let scheduler = CampaignScheduler::new(
            Arc::new(repos.bulk_campaigns.clone()),
            dispatcher.clone(),
        );

        Self {
            repos,
            resolver,
            internal_keys,
            client,
            media,
            limiter,
            stats,
            dispatcher,
            scheduler,
            pool,
            config: Arc::new(config),
        }
    }
}
