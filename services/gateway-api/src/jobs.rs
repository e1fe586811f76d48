//! Background jobs
//!
//! Two periodic tasks, both at minute resolution: the subscription-expiry
//! sweep and the bulk-campaign scheduler tick. Per-campaign dispatchers
//! are spawned on demand by the scheduler or the execute endpoint.
//!
//! The tasks hold `AppState` clones, which keep the accounting channel's
//! senders alive; main must stop them via [`BackgroundJobs::shutdown`]
//! before draining the recorder or the drain never terminates.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use hermes_db::repo::SubscriptionRepository;

use crate::state::AppState;

const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Handles for the periodic tasks
pub struct BackgroundJobs {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundJobs {
    /// Stop the periodic tasks, releasing their `AppState` clones.
    /// In-flight dispatcher tasks are unaffected.
    pub fn shutdown(self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Spawn the periodic tasks; they run until [`BackgroundJobs::shutdown`].
pub fn spawn_background_jobs(state: &AppState) -> BackgroundJobs {
    BackgroundJobs {
        handles: vec![
            spawn_subscription_sweep(state.clone()),
            spawn_campaign_scheduler(state.clone()),
        ],
    }
}

fn spawn_subscription_sweep(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            match state.repos.subscriptions.expire_due(Utc::now()).await {
                Ok(0) => {}
                Ok(expired) => {
                    tracing::info!(expired, "subscription expiry sweep flipped rows");
                    metrics::counter!("subscriptions_expired_total").increment(expired);
                }
                Err(err) => {
                    tracing::error!(error = %err, "subscription expiry sweep failed");
                }
            }
        }
    })
}

fn spawn_campaign_scheduler(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            match state.scheduler.tick(Utc::now()).await {
                Ok(0) => {}
                Ok(dispatched) => {
                    metrics::counter!("campaigns_dispatched_total").increment(dispatched as u64);
                }
                Err(err) => {
                    tracing::error!(error = %err, "campaign scheduler tick failed");
                }
            }
        }
    })
}
