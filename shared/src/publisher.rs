//! Snapshot composition and change notification.
//!
//! The `SnapshotPublisher` composes a `DashboardSnapshot` from the current
//! store contents and the watch list, and fans out a `ChangeNotice` for every
//! state mutation over a `tokio::sync::broadcast` channel.

use arc_swap::ArcSwap;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::models::{DashboardSnapshot, EventRanking, FeedEntry, FeedSource, FeedView};
use crate::storage::{FeedStore, FeedStoreError, MetricStore, MetricStoreError};

/// Errors that can occur while composing a snapshot.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Reading the metric store failed.
    #[error("Metric store error: {0}")]
    Metrics(#[from] MetricStoreError),

    /// Reading the feed store failed.
    #[error("Feed store error: {0}")]
    Feeds(#[from] FeedStoreError),
}

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeKind {
    /// A station metric was accepted for an event.
    StationMetric {
        /// Event the metric belongs to.
        event_id: String,
    },
    /// A feed entry was accepted, or a duplicate refreshed its channel.
    FeedEntry {
        /// Channel that changed.
        source: FeedSource,
    },
    /// An event was added to or removed from the watch list.
    Watch {
        /// Event concerned.
        event_id: String,
        /// Whether the event is now watched.
        watched: bool,
    },
    /// A channel crossed the staleness horizon in either direction.
    Staleness {
        /// Channel concerned.
        source: FeedSource,
        /// Whether the channel is now stale.
        is_stale: bool,
    },
}

/// Notification sent to subscribers after every state mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    /// Version counter after the change.
    pub version: u64,
    /// What changed.
    #[serde(flatten)]
    pub change: ChangeKind,
}

/// Composes snapshots and broadcasts change notices.
pub struct SnapshotPublisher {
    metrics: Arc<dyn MetricStore>,
    feeds: Arc<dyn FeedStore>,
    watched: ArcSwap<BTreeSet<String>>,
    version: AtomicU64,
    notifier: broadcast::Sender<ChangeNotice>,
    staleness_horizon: Duration,
}

impl std::fmt::Debug for SnapshotPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotPublisher")
            .field("watched", &*self.watched.load_full())
            .field("version", &self.version.load(Ordering::Relaxed))
            .field("staleness_horizon", &self.staleness_horizon)
            .finish_non_exhaustive()
    }
}

impl SnapshotPublisher {
    /// Creates a publisher over the given stores.
    ///
    /// `notify_capacity` bounds how many notices a slow subscriber may lag
    /// behind before it starts missing them.
    #[must_use]
    pub fn new(
        metrics: Arc<dyn MetricStore>,
        feeds: Arc<dyn FeedStore>,
        staleness_horizon: Duration,
        notify_capacity: usize,
    ) -> Self {
        let (notifier, _) = broadcast::channel(notify_capacity.max(1));
        Self {
            metrics,
            feeds,
            watched: ArcSwap::from_pointee(BTreeSet::new()),
            version: AtomicU64::new(0),
            notifier,
            staleness_horizon,
        }
    }

    /// Returns the current version counter.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Bumps the version and sends a notice to all current subscribers.
    ///
    /// Returns the new version. Having no subscribers is not an error.
    pub fn notify(&self, change: ChangeKind) -> u64 {
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        let receivers = self
            .notifier
            .send(ChangeNotice { version, change })
            .unwrap_or(0);
        tracing::trace!(version, receivers, "Change notice sent");
        version
    }

    /// Subscribes to change notices sent from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.notifier.subscribe()
    }

    /// Adds an event to the watch list.
    ///
    /// Returns true if the event was not watched before.
    pub fn watch(&self, event_id: &str) -> bool {
        let previous = self.watched.rcu(|current| {
            let mut next = BTreeSet::clone(current);
            next.insert(event_id.to_string());
            next
        });
        let added = !previous.contains(event_id);
        if added {
            tracing::info!(event_id, "Event watched");
            self.notify(ChangeKind::Watch {
                event_id: event_id.to_string(),
                watched: true,
            });
        }
        added
    }

    /// Removes an event from the watch list.
    ///
    /// Returns true if the event was watched.
    pub fn unwatch(&self, event_id: &str) -> bool {
        let previous = self.watched.rcu(|current| {
            let mut next = BTreeSet::clone(current);
            next.remove(event_id);
            next
        });
        let removed = previous.contains(event_id);
        if removed {
            tracing::info!(event_id, "Event unwatched");
            self.notify(ChangeKind::Watch {
                event_id: event_id.to_string(),
                watched: false,
            });
        }
        removed
    }

    /// Returns true if the event is on the watch list.
    #[must_use]
    pub fn is_watched(&self, event_id: &str) -> bool {
        self.watched.load().contains(event_id)
    }

    /// Returns the watched event ids in ascending order.
    #[must_use]
    pub fn watched(&self) -> Vec<String> {
        self.watched.load().iter().cloned().collect()
    }

    /// Builds the view of one channel as seen at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed store cannot be read.
    pub fn feed_view(
        &self,
        source: FeedSource,
        now: DateTime<Utc>,
    ) -> Result<FeedView, FeedStoreError> {
        Ok(match self.feeds.channel(source)? {
            Some(channel) => FeedView::from_channel(&channel, now, self.staleness_horizon),
            None => FeedView::empty(source),
        })
    }

    /// Composes a snapshot as seen now.
    ///
    /// # Errors
    ///
    /// Returns an error if a store cannot be read.
    pub fn publish(&self) -> Result<DashboardSnapshot, PublishError> {
        self.publish_at(Utc::now())
    }

    /// Composes a snapshot as seen at `now`.
    ///
    /// Rankings cover the watched events in ascending id order; feeds cover
    /// every known source, empty or not.
    ///
    /// # Errors
    ///
    /// Returns an error if a store cannot be read.
    pub fn publish_at(&self, now: DateTime<Utc>) -> Result<DashboardSnapshot, PublishError> {
        let version = self.version();
        let watched = self.watched.load_full();

        let rankings = watched
            .iter()
            .map(|event_id| -> Result<EventRanking, PublishError> {
                Ok(EventRanking::new(
                    event_id.clone(),
                    self.metrics.ranking(event_id)?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let feeds = FeedSource::ALL
            .iter()
            .map(|&source| self.feed_view(source, now))
            .collect::<Result<Vec<_>, _>>()?;

        let latest_event = latest_entry(&feeds).cloned();

        Ok(DashboardSnapshot {
            version,
            generated_at: now,
            rankings,
            feeds,
            latest_event,
        })
    }
}

/// Newest entry across the heads of all channels.
fn latest_entry(feeds: &[FeedView]) -> Option<&FeedEntry> {
    feeds
        .iter()
        .filter_map(|view| view.entries.first())
        .fold(None, |best: Option<&FeedEntry>, candidate| match best {
            Some(current) if current.event_time >= candidate.event_time => Some(current),
            _ => Some(candidate),
        })
}
