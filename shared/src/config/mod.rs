//! Configuration module for Quakeboard.
//!
//! This module contains the ranking weights, feed channel settings and the
//! combined dashboard configuration.

pub mod feed;
pub mod ranking;

pub use feed::{FeedConfig, DEFAULT_FEED_CAPACITY, DEFAULT_STALENESS_SECS, MAX_STALENESS_SECS};
pub use ranking::{Criterion, RankingWeights};

use serde::{Deserialize, Serialize};

/// Default buffer size of the change-notification channel.
pub const DEFAULT_NOTIFY_CAPACITY: usize = 64;

/// Complete configuration of the dashboard core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Ranking weight coefficients.
    pub weights: RankingWeights,
    /// Feed channel settings.
    pub feeds: FeedConfig,
    /// Watch an event automatically on its first accepted metric.
    pub auto_watch: bool,
    /// Buffer size of the change-notification channel.
    pub notify_capacity: usize,
}

impl DashboardConfig {
    /// Validates all nested settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights or feed settings are invalid, or the
    /// notification capacity is zero.
    pub fn validate(&self) -> Result<(), String> {
        self.weights.validate()?;
        self.feeds.validate()?;
        if self.notify_capacity == 0 {
            return Err("Notification capacity must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            weights: RankingWeights::default(),
            feeds: FeedConfig::default(),
            auto_watch: true,
            notify_capacity: DEFAULT_NOTIFY_CAPACITY,
        }
    }
}
