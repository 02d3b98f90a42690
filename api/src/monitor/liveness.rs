//! Feed liveness monitoring.
//!
//! Staleness is a function of time, so a channel can go stale without any
//! write. The monitor samples every channel on an interval and announces each
//! transition through the dashboard, which lets stream clients re-render.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{FeedSource, FeedView};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::interval;

use crate::state::AppState;

/// Liveness of one feed channel at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedLiveness {
    /// Channel concerned.
    pub source: FeedSource,
    /// Whether the channel is past the staleness horizon.
    pub is_stale: bool,
    /// Seconds since the last submission, if any.
    pub seconds_since_update: Option<i64>,
    /// Number of entries held.
    pub entries: usize,
}

impl From<&FeedView> for FeedLiveness {
    fn from(view: &FeedView) -> Self {
        Self {
            source: view.source,
            is_stale: view.is_stale,
            seconds_since_update: view.seconds_since_update,
            entries: view.entries.len(),
        }
    }
}

/// Liveness of all channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessReport {
    /// One sample per known source.
    pub feeds: Vec<FeedLiveness>,
    /// When the report was collected.
    pub collected_at: DateTime<Utc>,
}

impl LivenessReport {
    /// Returns the sample for a specific source.
    #[must_use]
    pub fn get(&self, source: FeedSource) -> Option<&FeedLiveness> {
        self.feeds.iter().find(|f| f.source == source)
    }

    /// Returns the sources that are currently stale.
    #[must_use]
    pub fn stale_sources(&self) -> Vec<FeedSource> {
        self.feeds
            .iter()
            .filter(|f| f.is_stale)
            .map(|f| f.source)
            .collect()
    }
}

/// Background monitor for feed liveness.
pub struct LivenessMonitor {
    state: AppState,
    interval_duration: Duration,
    last_known: HashMap<FeedSource, bool>,
}

impl LivenessMonitor {
    /// Creates a new liveness monitor.
    ///
    /// # Arguments
    ///
    /// * `state` - Application state for accessing the dashboard
    /// * `interval_duration` - How often to sample the channels
    #[must_use]
    pub fn new(state: AppState, interval_duration: Duration) -> Self {
        // Channels start out stale until their first submission.
        let last_known = FeedSource::ALL.into_iter().map(|s| (s, true)).collect();
        Self {
            state,
            interval_duration,
            last_known,
        }
    }

    /// Samples every channel as seen at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed store cannot be read.
    pub fn collect_report(&self, now: DateTime<Utc>) -> anyhow::Result<LivenessReport> {
        let feeds = FeedSource::ALL
            .into_iter()
            .map(|source| {
                self.state
                    .dashboard()
                    .get_feed_at(source, now)
                    .map(|view| FeedLiveness::from(&view))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LivenessReport {
            feeds,
            collected_at: now,
        })
    }

    /// Samples every channel and announces those whose staleness changed.
    ///
    /// Returns the channels that transitioned, with their new staleness.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed store cannot be read.
    pub fn check_at(&mut self, now: DateTime<Utc>) -> anyhow::Result<Vec<(FeedSource, bool)>> {
        let report = self.collect_report(now)?;
        let mut transitions = Vec::new();

        for feed in &report.feeds {
            let previous = self.last_known.insert(feed.source, feed.is_stale);
            if previous != Some(feed.is_stale) {
                self.state
                    .dashboard()
                    .report_staleness(feed.source, feed.is_stale);
                transitions.push((feed.source, feed.is_stale));
            }
        }

        Ok(transitions)
    }

    /// Starts the monitoring loop.
    ///
    /// This function runs indefinitely, sampling the channels at the
    /// configured interval.
    ///
    /// # Cancellation
    ///
    /// This function runs until cancelled via the task handle.
    pub async fn run(mut self) {
        let mut tick = interval(self.interval_duration);

        loop {
            tick.tick().await;

            match self.check_at(Utc::now()) {
                Ok(transitions) if !transitions.is_empty() => {
                    tracing::debug!(count = transitions.len(), "Feed liveness changed");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Failed to check feed liveness");
                }
            }
        }
    }
}
