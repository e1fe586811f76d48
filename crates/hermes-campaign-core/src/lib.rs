//! Hermes Campaign Core
//!
//! The bulk campaign engine: `send_sync` schedule parsing, the
//! per-campaign dispatcher (pacing, retries, per-item accounting) and the
//! minute-resolution scheduler tick.

pub mod dispatcher;
pub mod schedule;
pub mod scheduler;

pub use dispatcher::{CampaignDispatcher, DispatcherConfig};
pub use schedule::{parse_send_sync, ScheduleError, ScheduleOutcome};
pub use scheduler::CampaignScheduler;
