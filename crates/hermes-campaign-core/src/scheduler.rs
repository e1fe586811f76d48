//! Scheduler tick
//!
//! Finds due scheduled campaigns and hands each to a dispatcher task.
//! The tick itself never mutates campaign state; the dispatcher's CAS
//! admission makes concurrent ticks (periodic task + cron kick) safe.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use hermes_db::repo::BulkCampaignRepository;
use hermes_types::HermesResult;

use crate::dispatcher::CampaignDispatcher;

/// Minute-resolution campaign scheduler
#[derive(Clone)]
pub struct CampaignScheduler {
    bulk: Arc<dyn BulkCampaignRepository>,
    dispatcher: Arc<CampaignDispatcher>,
}

impl CampaignScheduler {
    pub fn new(bulk: Arc<dyn BulkCampaignRepository>, dispatcher: Arc<CampaignDispatcher>) -> Self {
        Self { bulk, dispatcher }
    }

    /// One tick: spawn a dispatcher for every scheduled campaign whose
    /// time has come. Returns how many were handed off. A tick that finds
    /// nothing due touches nothing.
    pub async fn tick(&self, now: DateTime<Utc>) -> HermesResult<usize> {
        let due = self.bulk.due_scheduled(now).await?;

        for id in &due {
            let dispatcher = self.dispatcher.clone();
            let id = *id;
            tokio::spawn(async move {
                dispatcher.run(id).await;
            });
        }

        if !due.is_empty() {
            tracing::info!(count = due.len(), "scheduler tick dispatched campaigns");
        }

        Ok(due.len())
    }
}
