//! Autoposting engine
//!
//! The long-running background process that, for every configured
//! autoposting entity, decides when it is due, fetches candidate posts from
//! its channels, deduplicates against previously-seen links, classifies
//! candidates with an LLM filter, selects one winner, and hands it to the
//! draft-publication pipeline.
//!
//! # Architecture
//!
//! ```text
//! Scheduler ──▶ due-time selection ──▶ Coordinator (per config)
//!                                          │
//!                                          ▼
//!                                 ChannelProcessor (per channel)
//!                                          │
//!                            fetch ─▶ recency ─▶ dedup ─▶ classify
//! ```
//!
//! Everything external (Postgres, Telegram, the model endpoint, draft
//! generation) sits behind the traits in [`ports`], which keeps the engine
//! deterministic under test. Processing is strictly sequential: one config,
//! one channel, one post at a time. That bounds the classifier call rate and
//! leaves exactly one ledger writer.

pub mod channel;
pub mod coordinator;
pub mod due;
pub mod ports;
pub mod scheduler;

use std::time::Duration;

use crate::config::AutopostingSettings;

pub use channel::{ChannelOutcome, ChannelProcessor};
pub use coordinator::Coordinator;
pub use due::{select_due, DueSelection};
pub use scheduler::{CycleStats, Scheduler};

/// Engine limits and cadence, derived from the `[autoposting]` config
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Maximum posts fetched per channel
    pub fetch_limit: usize,

    /// Maximum accepted candidates per channel per cycle
    pub per_channel_cap: usize,

    /// Recency window as a multiple of a config's period
    pub lookback_factor: i64,

    /// Sleep between full cycles
    pub cycle_interval: Duration,

    /// Sleep after a cycle-level failure
    pub error_backoff: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fetch_limit: 100,
            per_channel_cap: 3,
            lookback_factor: 3,
            cycle_interval: Duration::from_secs(1800),
            error_backoff: Duration::from_secs(60),
        }
    }
}

impl From<&AutopostingSettings> for EngineSettings {
    fn from(settings: &AutopostingSettings) -> Self {
        Self {
            fetch_limit: settings.fetch_limit,
            per_channel_cap: settings.per_channel_cap,
            lookback_factor: settings.lookback_factor,
            cycle_interval: Duration::from_secs(settings.cycle_interval_secs),
            error_backoff: Duration::from_secs(settings.error_backoff_secs),
        }
    }
}
