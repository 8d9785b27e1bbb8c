//! Common test utilities: fixtures and in-memory port fakes
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use kurator::engine::ports::{
    ChannelFetcher, Clock, ConfigStore, DraftPublisher, Picker, PostClassifier, ViewedLinkLedger,
};
use kurator::engine::{ChannelProcessor, Coordinator, EngineSettings, Scheduler};
use kurator::error::{Error, Result};
use kurator::models::{AutopostingConfig, ChannelPost, Verdict};
use kurator::utils::error::FetchError;

/// Fixed "now" shared by the fixtures
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Config watching the given channels, due immediately by default
pub fn make_config(channels: &[&str]) -> AutopostingConfig {
    AutopostingConfig {
        id: Uuid::new_v4(),
        organization_id: Uuid::new_v4(),
        enabled: true,
        period_hours: 2,
        filter_prompt: "posts about rust".to_string(),
        category_id: Uuid::new_v4(),
        channels: channels.iter().map(|c| c.to_string()).collect(),
        last_active: None,
        with_image: false,
    }
}

/// Post aged `age_hours` back from the fixed now
pub fn make_post(channel: &str, id: u32, text: &str, age_hours: i64) -> ChannelPost {
    ChannelPost {
        channel: channel.to_string(),
        link: format!("https://t.me/{channel}/{id}"),
        text: text.to_string(),
        posted_at: fixed_now() - Duration::hours(age_hours),
    }
}

// ============================================================================
// Port fakes
// ============================================================================

/// Manually advanced clock
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Picker that always returns the same index (clamped to the pool)
pub struct ScriptedPicker {
    index: usize,
    pub pools_seen: Mutex<Vec<usize>>,
}

impl ScriptedPicker {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            pools_seen: Mutex::new(Vec::new()),
        }
    }
}

impl Picker for ScriptedPicker {
    fn pick(&self, len: usize) -> usize {
        self.pools_seen.lock().unwrap().push(len);
        self.index.min(len - 1)
    }
}

/// In-memory config store with a failure switch on the stamp path
pub struct InMemoryConfigStore {
    configs: Mutex<Vec<AutopostingConfig>>,
    pub stamped: Mutex<Vec<(Uuid, DateTime<Utc>)>>,
    pub fail_update: AtomicBool,
}

impl InMemoryConfigStore {
    pub fn new(configs: Vec<AutopostingConfig>) -> Self {
        Self {
            configs: Mutex::new(configs),
            stamped: Mutex::new(Vec::new()),
            fail_update: AtomicBool::new(false),
        }
    }

    pub fn last_active_of(&self, id: Uuid) -> Option<DateTime<Utc>> {
        self.configs
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| c.last_active)
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn list_all(&self) -> Result<Vec<AutopostingConfig>> {
        Ok(self.configs.lock().unwrap().clone())
    }

    async fn update_last_active(&self, id: Uuid, ts: DateTime<Utc>) -> Result<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(Error::other("stamp failure injected"));
        }

        self.stamped.lock().unwrap().push((id, ts));
        if let Some(config) = self.configs.lock().unwrap().iter_mut().find(|c| c.id == id) {
            config.last_active = Some(ts);
        }
        Ok(())
    }
}

/// In-memory viewed-link ledger recording every write
pub struct InMemoryLedger {
    entries: Mutex<HashSet<(Uuid, String, String)>>,
    pub records: Mutex<Vec<(Uuid, String, String)>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashSet::new()),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self, autoposting_id: Uuid, channel: &str, link: &str) {
        self.entries.lock().unwrap().insert((
            autoposting_id,
            channel.to_string(),
            link.to_string(),
        ));
    }

    pub fn contains(&self, autoposting_id: Uuid, channel: &str, link: &str) -> bool {
        self.entries.lock().unwrap().contains(&(
            autoposting_id,
            channel.to_string(),
            link.to_string(),
        ))
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl ViewedLinkLedger for InMemoryLedger {
    async fn list_links(&self, autoposting_id: Uuid, channel: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, ch, _)| *id == autoposting_id && ch == channel)
            .map(|(_, _, link)| link.clone())
            .collect())
    }

    async fn record(&self, autoposting_id: Uuid, channel: &str, link: &str) -> Result<()> {
        let key = (autoposting_id, channel.to_string(), link.to_string());
        self.records.lock().unwrap().push(key.clone());
        self.entries.lock().unwrap().insert(key);
        Ok(())
    }
}

/// Fetcher serving canned posts per channel, with per-channel failure
pub struct StaticFetcher {
    posts: Mutex<HashMap<String, Vec<ChannelPost>>>,
    failing: Mutex<HashSet<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self {
            posts: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn add_posts(&self, channel: &str, posts: Vec<ChannelPost>) {
        self.posts
            .lock()
            .unwrap()
            .entry(channel.to_string())
            .or_default()
            .extend(posts);
    }

    pub fn fail_channel(&self, channel: &str) {
        self.failing.lock().unwrap().insert(channel.to_string());
    }
}

#[async_trait]
impl ChannelFetcher for StaticFetcher {
    async fn fetch_recent(&self, channel: &str, limit: usize) -> Result<Vec<ChannelPost>> {
        if self.failing.lock().unwrap().contains(channel) {
            return Err(FetchError::Timeout.into());
        }

        let mut posts = self
            .posts
            .lock()
            .unwrap()
            .get(channel)
            .cloned()
            .unwrap_or_default();
        posts.truncate(limit);
        Ok(posts)
    }
}

/// Classifier keyed on post text: "keep" is suitable, "boom" errors
pub struct KeywordClassifier {
    pub calls: Mutex<Vec<String>>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PostClassifier for KeywordClassifier {
    async fn classify(&self, _filter_prompt: &str, text: &str) -> Result<Verdict> {
        self.calls.lock().unwrap().push(text.to_string());

        if text.contains("boom") {
            return Err(Error::other("classifier failure injected"));
        }

        Ok(Verdict {
            suitable: text.contains("keep"),
            reason: "keyword match".to_string(),
        })
    }
}

/// Publisher recording every draft, with a failure switch
pub struct RecordingPublisher {
    pub published: Mutex<Vec<(Uuid, ChannelPost)>>,
    pub fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl DraftPublisher for RecordingPublisher {
    async fn publish_draft(&self, config: &AutopostingConfig, post: &ChannelPost) -> Result<Uuid> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::other("publish failure injected"));
        }

        self.published
            .lock()
            .unwrap()
            .push((config.id, post.clone()));
        Ok(Uuid::new_v4())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Everything wired together around the in-memory fakes
pub struct Harness {
    pub fetcher: Arc<StaticFetcher>,
    pub ledger: Arc<InMemoryLedger>,
    pub classifier: Arc<KeywordClassifier>,
    pub publisher: Arc<RecordingPublisher>,
    pub configs: Arc<InMemoryConfigStore>,
    pub clock: Arc<ManualClock>,
    pub picker: Arc<ScriptedPicker>,
    pub settings: EngineSettings,
}

impl Harness {
    pub fn new(configs: Vec<AutopostingConfig>) -> Self {
        Self {
            fetcher: Arc::new(StaticFetcher::new()),
            ledger: Arc::new(InMemoryLedger::new()),
            classifier: Arc::new(KeywordClassifier::new()),
            publisher: Arc::new(RecordingPublisher::new()),
            configs: Arc::new(InMemoryConfigStore::new(configs)),
            clock: Arc::new(ManualClock::new(fixed_now())),
            picker: Arc::new(ScriptedPicker::new(0)),
            settings: EngineSettings::default(),
        }
    }

    pub fn channel_processor(&self) -> ChannelProcessor {
        ChannelProcessor::new(
            Arc::clone(&self.fetcher) as Arc<dyn ChannelFetcher>,
            Arc::clone(&self.ledger) as Arc<dyn ViewedLinkLedger>,
            Arc::clone(&self.classifier) as Arc<dyn PostClassifier>,
            Arc::clone(&self.clock) as Arc<dyn Clock>,
            self.settings.clone(),
        )
    }

    pub fn coordinator(&self) -> Coordinator {
        Coordinator::new(
            self.channel_processor(),
            Arc::clone(&self.configs) as Arc<dyn ConfigStore>,
            Arc::clone(&self.ledger) as Arc<dyn ViewedLinkLedger>,
            Arc::clone(&self.publisher) as Arc<dyn DraftPublisher>,
            Arc::clone(&self.clock) as Arc<dyn Clock>,
            Arc::clone(&self.picker) as Arc<dyn Picker>,
        )
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            self.coordinator(),
            Arc::clone(&self.configs) as Arc<dyn ConfigStore>,
            Arc::clone(&self.clock) as Arc<dyn Clock>,
            self.settings.clone(),
        )
    }
}
