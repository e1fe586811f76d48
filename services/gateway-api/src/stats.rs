//! Fire-and-forget message accounting.
//!
//! Gateway handlers must never block response delivery on bookkeeping.
//! Send outcomes go through a bounded channel into a background task that
//! applies the session counters and the per-type stat upsert; the channel
//! is drained on shutdown. Increments are applied with DB arithmetic, so
//! one event means exactly one increment.

use tokio::sync::mpsc;

use hermes_db::pg::Repositories;
use hermes_db::repo::{MessageStatRepository, SessionRepository};

/// One send outcome to account for
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Session row primary key (for the counter update)
    pub session_pk: i64,
    pub user_id: String,
    /// Upstream session id (stat key)
    pub session_id: String,
    pub message_type: String,
    pub success: bool,
}

/// Handle used by request handlers to enqueue accounting work
#[derive(Clone)]
pub struct StatsRecorder {
    tx: mpsc::Sender<SendOutcome>,
}

impl StatsRecorder {
    /// Create the recorder and its background task
    pub fn new(repos: Repositories, buffer: usize) -> (Self, StatsRecorderHandle) {
        let (tx, rx) = mpsc::channel(buffer);
        let handle = StatsRecorderHandle {
            task: tokio::spawn(Self::run_background(repos, rx)),
        };
        (Self { tx }, handle)
    }

    /// Queue one outcome. Does not block; a full buffer drops the event
    /// with a warning rather than stalling the response path.
    pub fn record(&self, outcome: SendOutcome) {
        if let Err(err) = self.tx.try_send(outcome) {
            tracing::warn!(error = %err, "stats buffer full, dropping send outcome");
        }
    }

    async fn run_background(repos: Repositories, mut rx: mpsc::Receiver<SendOutcome>) {
        while let Some(outcome) = rx.recv().await {
            let (sent, failed) = if outcome.success { (1, 0) } else { (0, 1) };

            if let Err(err) = repos
                .sessions
                .record_send_outcome(outcome.session_pk, outcome.success)
                .await
            {
                tracing::warn!(error = %err, "failed to update session send counters");
            }

            if let Err(err) = repos
                .stats
                .increment(
                    &outcome.user_id,
                    &outcome.session_id,
                    &outcome.message_type,
                    sent,
                    failed,
                )
                .await
            {
                tracing::warn!(error = %err, "failed to update message stats");
            }

            metrics::counter!(
                "gateway_messages_total",
                "type" => outcome.message_type.clone(),
                "result" => if outcome.success { "sent" } else { "failed" }
            )
            .increment(1);
        }
    }
}

/// Handle for the background accounting task
pub struct StatsRecorderHandle {
    task: tokio::task::JoinHandle<()>,
}

impl StatsRecorderHandle {
    /// Wait for queued outcomes to drain
    pub async fn shutdown(self) {
        let _ = self.task.await;
    }
}
