//! Due-time selection
//!
//! Decides which autoposting configs are eligible for a processing cycle.
//! Pure over the injected clock value, so the rules are trivially testable.

use chrono::{DateTime, Utc};

use crate::models::AutopostingConfig;

/// Outcome of due-time selection over all configs
#[derive(Debug, Default)]
pub struct DueSelection {
    /// Configs to process this cycle, in source order
    pub due: Vec<AutopostingConfig>,

    /// Configs excluded because they are disabled
    pub disabled: usize,

    /// Configs excluded because their period has not elapsed yet
    pub not_ready: usize,
}

impl DueSelection {
    /// Total number of configs examined
    pub fn total(&self) -> usize {
        self.due.len() + self.disabled + self.not_ready
    }
}

/// Select the configs whose cadence has elapsed
///
/// Rules, per config:
/// - disabled configs are excluded
/// - a config that has never completed a cycle (`last_active` is None) is
///   always due
/// - otherwise the config is due when `now - last_active` has reached the
///   configured period
///
/// No reordering or prioritization: configs are processed in the order the
/// store returned them.
pub fn select_due(configs: Vec<AutopostingConfig>, now: DateTime<Utc>) -> DueSelection {
    let mut selection = DueSelection::default();

    for config in configs {
        if !config.enabled {
            selection.disabled += 1;
            continue;
        }

        match config.last_active {
            None => selection.due.push(config),
            Some(last_active) if now - last_active >= config.period() => {
                selection.due.push(config);
            }
            Some(_) => selection.not_ready += 1,
        }
    }

    selection
}
