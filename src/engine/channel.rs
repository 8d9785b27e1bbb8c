//! Per-channel candidate processing
//!
//! For one (config, channel) pair: fetch recent posts, drop stale ones, drop
//! already-considered links, classify the rest, and stop as soon as the
//! per-channel acceptance cap is reached. Classifier calls are the expensive
//! step, so every filter runs before it and the cap cuts the loop short.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::ports::{ChannelFetcher, Clock, PostClassifier, ViewedLinkLedger};
use crate::engine::EngineSettings;
use crate::error::Result;
use crate::models::{AutopostingConfig, ChannelPost};
use crate::utils::truncate_text;

/// Result of processing one channel for one config
#[derive(Debug, Default)]
pub struct ChannelOutcome {
    /// Classifier-accepted candidates, at most the per-channel cap
    pub accepted: Vec<ChannelPost>,

    /// Posts the classifier rejected (ledgered immediately)
    pub rejected: usize,

    /// Posts outside the recency window
    pub stale: usize,

    /// Posts skipped because their text was blank
    pub skipped_empty: usize,

    /// Posts skipped because their link was already in the ledger
    pub skipped_viewed: usize,

    /// Posts dropped by a per-post error
    pub failed: usize,
}

/// Processes a single channel of an autoposting config
pub struct ChannelProcessor {
    fetcher: Arc<dyn ChannelFetcher>,
    ledger: Arc<dyn ViewedLinkLedger>,
    classifier: Arc<dyn PostClassifier>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl ChannelProcessor {
    /// Create a new channel processor
    pub fn new(
        fetcher: Arc<dyn ChannelFetcher>,
        ledger: Arc<dyn ViewedLinkLedger>,
        classifier: Arc<dyn PostClassifier>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            fetcher,
            ledger,
            classifier,
            clock,
            settings,
        }
    }

    /// Process one channel: fetch, filter, classify with early exit
    ///
    /// Per-post failures are counted and skipped; a fetch or ledger-load
    /// failure propagates so the coordinator can isolate the channel.
    pub async fn process(
        &self,
        config: &AutopostingConfig,
        channel: &str,
    ) -> Result<ChannelOutcome> {
        let posts = self
            .fetcher
            .fetch_recent(channel, self.settings.fetch_limit)
            .await?;

        let mut outcome = ChannelOutcome::default();

        // Recency filter: the window is lookback_factor periods, wider than
        // the due cadence so posts published between cycles still qualify.
        // Timestamps are normalized to naive UTC before comparison.
        let now = self.clock.now().naive_utc();
        let window = config.lookback(self.settings.lookback_factor);
        let fresh: Vec<ChannelPost> = posts
            .into_iter()
            .filter(|post| {
                let is_fresh = now - post.posted_at.naive_utc() <= window;
                if !is_fresh {
                    outcome.stale += 1;
                }
                is_fresh
            })
            .collect();

        // One ledger read per channel, not per post
        let viewed: HashSet<String> = self
            .ledger
            .list_links(config.id, channel)
            .await?
            .into_iter()
            .collect();

        for post in fresh {
            if post.is_blank() {
                outcome.skipped_empty += 1;
                continue;
            }

            if viewed.contains(&post.link) {
                outcome.skipped_viewed += 1;
                continue;
            }

            match self.judge(config, &post).await {
                Ok(true) => {
                    outcome.accepted.push(post);
                    if outcome.accepted.len() >= self.settings.per_channel_cap {
                        // Remaining posts stay untouched; ledger and recency
                        // state are unaffected, so they are candidates again
                        // next cycle.
                        debug!(
                            channel = %channel,
                            cap = self.settings.per_channel_cap,
                            "Acceptance cap reached, stopping channel"
                        );
                        break;
                    }
                }
                Ok(false) => outcome.rejected += 1,
                Err(e) => {
                    warn!(
                        channel = %channel,
                        link = %post.link,
                        error = %e,
                        "Skipping post after processing error"
                    );
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }

    /// Classify one post; rejected links are ledgered immediately so they
    /// are never re-classified
    async fn judge(&self, config: &AutopostingConfig, post: &ChannelPost) -> Result<bool> {
        let verdict = self
            .classifier
            .classify(&config.filter_prompt, &post.text)
            .await?;

        if verdict.suitable {
            debug!(
                link = %post.link,
                reason = %verdict.reason,
                "Post accepted"
            );
        } else {
            debug!(
                link = %post.link,
                reason = %verdict.reason,
                text = %truncate_text(&post.text, 120),
                "Post rejected"
            );
            self.ledger
                .record(config.id, &post.channel, &post.link)
                .await?;
        }

        Ok(verdict.suitable)
    }
}
