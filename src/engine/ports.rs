//! Collaborator ports for the autoposting engine
//!
//! The engine never talks to Postgres, Telegram, or the model endpoint
//! directly; it goes through these traits. Production wiring plugs in the
//! adapters from `storage`, `telegram`, `llm`, and `generation`; tests plug
//! in in-memory fakes, a manual clock, and a scripted picker.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{AutopostingConfig, ChannelPost, Verdict};

/// Source of autoposting configs and their `last_active` stamps
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// List every autoposting config, in source order
    async fn list_all(&self) -> Result<Vec<AutopostingConfig>>;

    /// Stamp a config's last completed cycle
    async fn update_last_active(&self, id: Uuid, ts: DateTime<Utc>) -> Result<()>;
}

/// Append-only ledger of links already considered per (config, channel)
///
/// A link present in the ledger must never reach the classifier again for
/// that pair.
#[async_trait]
pub trait ViewedLinkLedger: Send + Sync {
    /// Load the full viewed set for one (config, channel) pair
    async fn list_links(&self, autoposting_id: Uuid, channel: &str) -> Result<Vec<String>>;

    /// Record a link as considered; idempotent
    async fn record(&self, autoposting_id: Uuid, channel: &str, link: &str) -> Result<()>;
}

/// Source of recent posts for a channel handle
#[async_trait]
pub trait ChannelFetcher: Send + Sync {
    /// Fetch up to `limit` most recent posts, newest first
    async fn fetch_recent(&self, channel: &str, limit: usize) -> Result<Vec<ChannelPost>>;
}

/// LLM suitability judge for a single post
#[async_trait]
pub trait PostClassifier: Send + Sync {
    /// Classify one post against a config's filter prompt
    async fn classify(&self, filter_prompt: &str, text: &str) -> Result<Verdict>;
}

/// Turns one winning post into a draft publication
///
/// Covers text generation, the optional image, publication creation, source
/// tagging, and moderation routing (including the auto-approval
/// short-circuit when the organization has no moderators).
#[async_trait]
pub trait DraftPublisher: Send + Sync {
    /// Publish a draft for the winning post; returns the publication id
    async fn publish_draft(&self, config: &AutopostingConfig, post: &ChannelPost) -> Result<Uuid>;
}

/// Wall-clock port, injected so due-time logic is deterministic under test
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Pick-one-of-N port for winner selection
///
/// `pick` is only called with `len > 0` and must return an index in
/// `0..len`.
pub trait Picker: Send + Sync {
    fn pick(&self, len: usize) -> usize;
}

/// Uniform random picker
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformPicker;

impl Picker for UniformPicker {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}
