//! Read models handed to the presentation layer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::feed::{FeedChannelState, FeedEntry, FeedSource, FeedTally};
use super::station::RankedStation;

/// Read view of one feed channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedView {
    /// Channel this view describes.
    pub source: FeedSource,
    /// Entries, most recent first.
    pub entries: Vec<FeedEntry>,
    /// Time of the last submission; `None` if the channel never received one.
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Seconds since the last submission ("Updated N seconds ago").
    pub seconds_since_update: Option<i64>,
    /// True if the channel was not updated within the staleness horizon,
    /// or was never updated at all.
    pub is_stale: bool,
    /// Per-tier counts of accepted entries.
    pub tally: FeedTally,
}

impl FeedView {
    /// Builds the view of a channel as seen at `now`.
    #[must_use]
    pub fn from_channel(channel: &FeedChannelState, now: DateTime<Utc>, horizon: Duration) -> Self {
        Self {
            source: channel.source,
            entries: channel.entries.clone(),
            last_updated_at: Some(channel.last_updated_at),
            seconds_since_update: Some(channel.seconds_since_update(now)),
            is_stale: channel.is_stale(now, horizon),
            tally: channel.tally,
        }
    }

    /// Builds the view of a channel that has not received anything yet.
    #[must_use]
    pub fn empty(source: FeedSource) -> Self {
        Self {
            source,
            entries: Vec::new(),
            last_updated_at: None,
            seconds_since_update: None,
            is_stale: true,
            tally: FeedTally::default(),
        }
    }
}

/// Ranking of one watched event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRanking {
    /// Event identifier.
    pub event_id: String,
    /// Ranked stations, rank 1 first.
    pub stations: Vec<RankedStation>,
    /// Station at rank 1, if any.
    pub selected: Option<String>,
}

impl EventRanking {
    /// Wraps a ranking, selecting its first station.
    #[must_use]
    pub fn new(event_id: impl Into<String>, stations: Vec<RankedStation>) -> Self {
        let selected = stations.first().map(|s| s.station_id.clone());
        Self {
            event_id: event_id.into(),
            stations,
            selected,
        }
    }
}

/// A consistent, immutable view of the whole dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// Change counter at the time of composition.
    pub version: u64,
    /// When the snapshot was composed.
    pub generated_at: DateTime<Utc>,
    /// Rankings of watched events, ordered by event id.
    pub rankings: Vec<EventRanking>,
    /// One view per known feed source.
    pub feeds: Vec<FeedView>,
    /// Newest entry across all feeds.
    pub latest_event: Option<FeedEntry>,
}

impl DashboardSnapshot {
    /// Returns the ranking for `event_id`, if that event is watched.
    #[must_use]
    pub fn ranking(&self, event_id: &str) -> Option<&EventRanking> {
        self.rankings.iter().find(|r| r.event_id == event_id)
    }

    /// Returns the view of `source`.
    #[must_use]
    pub fn feed(&self, source: FeedSource) -> Option<&FeedView> {
        self.feeds.iter().find(|f| f.source == source)
    }
}
