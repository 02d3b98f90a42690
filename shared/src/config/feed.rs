//! Feed channel configuration.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Default number of entries kept per channel.
pub const DEFAULT_FEED_CAPACITY: usize = 5;

/// Default staleness horizon in seconds.
pub const DEFAULT_STALENESS_SECS: u64 = 60;

/// Longest accepted staleness horizon in seconds (one week).
pub const MAX_STALENESS_SECS: u64 = 7 * 24 * 60 * 60;

/// Capacity and liveness settings shared by all feed channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Maximum number of entries kept per channel.
    pub capacity: usize,
    /// Seconds without an update after which a channel is reported stale.
    pub staleness_secs: u64,
}

impl FeedConfig {
    /// Creates a new feed configuration.
    #[must_use]
    pub const fn new(capacity: usize, staleness_secs: u64) -> Self {
        Self {
            capacity,
            staleness_secs,
        }
    }

    /// Returns the staleness horizon.
    ///
    /// Saturates at `TimeDelta::MAX` for horizons that were never validated.
    #[must_use]
    pub fn staleness_horizon(&self) -> TimeDelta {
        i64::try_from(self.staleness_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Capacity is zero or exceeds 1000
    /// - Staleness horizon is zero or longer than a week
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("Feed capacity must be greater than zero".to_string());
        }
        if self.capacity > 1000 {
            return Err("Feed capacity cannot exceed 1000 entries".to_string());
        }
        if self.staleness_secs == 0 {
            return Err("Staleness horizon must be greater than zero".to_string());
        }
        if self.staleness_secs > MAX_STALENESS_SECS {
            return Err(format!(
                "Staleness horizon cannot exceed {MAX_STALENESS_SECS} seconds"
            ));
        }
        Ok(())
    }
}

impl Default for FeedConfig {
    /// Five entries per channel, stale after one minute.
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY, DEFAULT_STALENESS_SECS)
    }
}
