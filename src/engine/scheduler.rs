//! Scheduler loop
//!
//! The top-level driver of the autoposting engine. Each cycle lists all
//! configs, selects the due ones, and runs the coordinator over each
//! sequentially. The loop never terminates on error: a failed cycle is
//! logged and retried after a backoff. Stopping is cooperative via `stop()`.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};

use crate::engine::coordinator::Coordinator;
use crate::engine::due::select_due;
use crate::engine::ports::{Clock, ConfigStore};
use crate::engine::EngineSettings;
use crate::error::Result;

/// Statistics for one scheduler cycle
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleStats {
    /// Configs selected as due
    pub selected: usize,

    /// Configs excluded as disabled
    pub disabled: usize,

    /// Configs excluded as not yet due
    pub not_ready: usize,

    /// Due configs that completed (stamped `last_active`)
    pub completed: usize,

    /// Due configs whose coordinator raised uncaught (left unstamped)
    pub failed: usize,
}

/// Long-lived scheduler driving the autoposting engine
pub struct Scheduler {
    coordinator: Coordinator,
    configs: Arc<dyn ConfigStore>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    is_running: Arc<RwLock<bool>>,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(
        coordinator: Coordinator,
        configs: Arc<dyn ConfigStore>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            coordinator,
            configs,
            clock,
            settings,
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    /// Run one full cycle: list, select, coordinate
    ///
    /// Per-config failures are logged and do not abort the cycle; the failed
    /// config keeps its old `last_active` and is retried next cycle. An
    /// error from listing configs propagates to the loop's backoff path.
    pub async fn run_cycle(&self) -> Result<CycleStats> {
        let configs = self.configs.list_all().await?;
        let selection = select_due(configs, self.clock.now());

        let mut stats = CycleStats {
            selected: selection.due.len(),
            disabled: selection.disabled,
            not_ready: selection.not_ready,
            ..Default::default()
        };

        info!(
            selected = stats.selected,
            disabled = stats.disabled,
            not_ready = stats.not_ready,
            "Autoposting cycle started"
        );

        for config in &selection.due {
            match self.coordinator.process(config).await {
                Ok(()) => stats.completed += 1,
                Err(e) => {
                    stats.failed += 1;
                    error!(
                        autoposting = %config.id,
                        category = e.category().as_str(),
                        error = %e,
                        "Config cycle failed, will retry next cycle"
                    );
                }
            }
        }

        info!(
            completed = stats.completed,
            failed = stats.failed,
            "Autoposting cycle finished"
        );

        Ok(stats)
    }

    /// Start the scheduler loop (runs until stopped)
    pub async fn start(&self) {
        *self.is_running.write().await = true;

        info!(
            cycle_interval_secs = self.settings.cycle_interval.as_secs(),
            error_backoff_secs = self.settings.error_backoff.as_secs(),
            "Scheduler started"
        );

        while *self.is_running.read().await {
            let sleep_for = match self.run_cycle().await {
                Ok(_) => self.settings.cycle_interval,
                Err(e) => {
                    error!(error = %e, "Cycle failed, backing off");
                    self.settings.error_backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.wait_for_stop() => break,
            }
        }

        info!("Scheduler stopped");
    }

    /// Stop the scheduler loop
    pub async fn stop(&self) {
        *self.is_running.write().await = false;
    }

    /// Check if the scheduler is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    // Internal: wait for stop signal
    async fn wait_for_stop(&self) {
        loop {
            if !*self.is_running.read().await {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}
