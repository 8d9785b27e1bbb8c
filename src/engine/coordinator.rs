//! Per-config coordination
//!
//! Runs the channel processor over every channel of a due config, pools the
//! accepted candidates, picks one winner, hands it to the draft publisher,
//! and stamps the config's `last_active`.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::engine::channel::ChannelProcessor;
use crate::engine::ports::{Clock, ConfigStore, DraftPublisher, Picker, ViewedLinkLedger};
use crate::error::Result;
use crate::models::{AutopostingConfig, ChannelPost};

/// Coordinates one full processing cycle of one autoposting config
pub struct Coordinator {
    channels: ChannelProcessor,
    configs: Arc<dyn ConfigStore>,
    ledger: Arc<dyn ViewedLinkLedger>,
    publisher: Arc<dyn DraftPublisher>,
    clock: Arc<dyn Clock>,
    picker: Arc<dyn Picker>,
}

impl Coordinator {
    /// Create a new coordinator
    pub fn new(
        channels: ChannelProcessor,
        configs: Arc<dyn ConfigStore>,
        ledger: Arc<dyn ViewedLinkLedger>,
        publisher: Arc<dyn DraftPublisher>,
        clock: Arc<dyn Clock>,
        picker: Arc<dyn Picker>,
    ) -> Self {
        Self {
            channels,
            configs,
            ledger,
            publisher,
            clock,
            picker,
        }
    }

    /// Process one due config end to end
    ///
    /// Channel failures are isolated (the channel yields zero candidates),
    /// and selection/publication failures are caught so `last_active` is
    /// still stamped. Only an error escaping this method leaves the config
    /// unstamped, which makes it eligible again on the very next cycle.
    pub async fn process(&self, config: &AutopostingConfig) -> Result<()> {
        let mut pool: Vec<ChannelPost> = Vec::new();

        // Cap is per channel, not per config: N channels can pool up to
        // N * cap candidates.
        for channel in &config.channels {
            match self.channels.process(config, channel).await {
                Ok(outcome) => {
                    debug!(
                        autoposting = %config.id,
                        channel = %channel,
                        accepted = outcome.accepted.len(),
                        rejected = outcome.rejected,
                        stale = outcome.stale,
                        skipped_empty = outcome.skipped_empty,
                        skipped_viewed = outcome.skipped_viewed,
                        failed = outcome.failed,
                        "Channel processed"
                    );
                    pool.extend(outcome.accepted);
                }
                Err(e) => {
                    warn!(
                        autoposting = %config.id,
                        channel = %channel,
                        error = %e,
                        "Channel failed, continuing with remaining channels"
                    );
                }
            }
        }

        if pool.is_empty() {
            info!(autoposting = %config.id, "No suitable candidates this cycle");
        } else if let Err(e) = self.select_and_publish(config, &pool).await {
            // The winner's ledger entry may already be written; it is not
            // rolled back, so the chosen post is consumed even though no
            // publication came out of it.
            error!(
                autoposting = %config.id,
                category = e.category().as_str(),
                error = %e,
                "Draft publication failed"
            );
        }

        self.configs
            .update_last_active(config.id, self.clock.now())
            .await?;

        Ok(())
    }

    /// Pick one winner uniformly from the pool, ledger it, publish a draft
    async fn select_and_publish(
        &self,
        config: &AutopostingConfig,
        pool: &[ChannelPost],
    ) -> Result<()> {
        let winner = &pool[self.picker.pick(pool.len())];

        info!(
            autoposting = %config.id,
            pool = pool.len(),
            link = %winner.link,
            "Candidate selected"
        );

        // Ledger before publishing so the winner can never be re-selected,
        // even though it was never "rejected".
        self.ledger
            .record(config.id, &winner.channel, &winner.link)
            .await?;

        let publication_id = self.publisher.publish_draft(config, winner).await?;

        info!(
            autoposting = %config.id,
            publication = %publication_id,
            "Draft publication created"
        );

        Ok(())
    }
}
