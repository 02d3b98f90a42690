//! The dashboard core.
//!
//! `Dashboard` ties the metric store, the feed store and the snapshot
//! publisher together. Every accepted mutation goes through here so that the
//! watch list and change notifications stay consistent with the stores.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::DashboardConfig;
use crate::models::{
    DashboardSnapshot, FeedEntry, FeedSource, FeedView, RankedStation, StationMetric,
};
use crate::publisher::{ChangeKind, ChangeNotice, PublishError, SnapshotPublisher};
use crate::storage::{
    FeedStore, FeedStoreError, FeedSubmitOutcome, InMemoryFeedStore, InMemoryMetricStore,
    MetricStore, MetricStoreError, MetricSubmitOutcome,
};

/// Earthquake monitoring dashboard core.
///
/// # Example
///
/// ```
/// use shared::dashboard::Dashboard;
/// use shared::models::StationMetric;
/// use shared::storage::MetricSubmitOutcome;
///
/// let dashboard = Dashboard::new();
/// let outcome = dashboard
///     .push_station_metric(StationMetric::new("PGR II", "E1").with_phases(12))
///     .unwrap();
///
/// assert_eq!(outcome, MetricSubmitOutcome::Accepted);
/// assert_eq!(dashboard.get_ranking("E1").unwrap()[0].station_id, "PGR II");
/// ```
pub struct Dashboard {
    metrics: Arc<dyn MetricStore>,
    feeds: Arc<dyn FeedStore>,
    publisher: SnapshotPublisher,
    config: DashboardConfig,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("publisher", &self.publisher)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dashboard {
    /// Creates a dashboard with in-memory stores and the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(DashboardConfig::default())
    }

    /// Creates a dashboard with in-memory stores built from `config`.
    #[must_use]
    pub fn from_config(config: DashboardConfig) -> Self {
        let metrics = Arc::new(InMemoryMetricStore::with_weights(config.weights));
        let feeds = Arc::new(InMemoryFeedStore::with_capacity(config.feeds.capacity));
        Self::with_stores(metrics, feeds, config)
    }

    /// Creates a dashboard over the given stores.
    ///
    /// Ranking weights and feed capacity are owned by the stores; the rest of
    /// `config` applies to the dashboard itself.
    #[must_use]
    pub fn with_stores(
        metrics: Arc<dyn MetricStore>,
        feeds: Arc<dyn FeedStore>,
        config: DashboardConfig,
    ) -> Self {
        let publisher = SnapshotPublisher::new(
            Arc::clone(&metrics),
            Arc::clone(&feeds),
            config.feeds.staleness_horizon(),
            config.notify_capacity,
        );
        Self {
            metrics,
            feeds,
            publisher,
            config,
        }
    }

    /// Returns the configuration the dashboard was built with.
    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Submits a station metric.
    ///
    /// Ids are trimmed and the station code is upper-cased first. An accepted metric auto-watches its event (when enabled) and notifies
    /// subscribers. A superseded metric changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `MetricStoreError::Invalid` if the metric is rejected.
    pub fn push_station_metric(
        &self,
        metric: StationMetric,
    ) -> Result<MetricSubmitOutcome, MetricStoreError> {
        let metric = metric.normalized();
        let event_id = metric.event_id.clone();
        let station_id = metric.station_id.clone();

        let outcome = match self.metrics.submit(metric) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(%event_id, %station_id, error = %e, "Station metric rejected");
                return Err(e);
            }
        };

        match outcome {
            MetricSubmitOutcome::Accepted => {
                tracing::debug!(%event_id, %station_id, "Station metric accepted");
                if self.config.auto_watch {
                    self.publisher.watch(&event_id);
                }
                self.publisher.notify(ChangeKind::StationMetric { event_id });
            }
            MetricSubmitOutcome::Superseded => {
                tracing::debug!(%event_id, %station_id, "Station metric superseded");
            }
        }
        Ok(outcome)
    }

    /// Submits a feed entry received now.
    ///
    /// # Errors
    ///
    /// Returns `FeedStoreError::Invalid` if the entry is rejected.
    pub fn push_feed_entry(&self, entry: FeedEntry) -> Result<FeedSubmitOutcome, FeedStoreError> {
        self.push_feed_entry_at(entry, Utc::now())
    }

    /// Submits a feed entry received at `received_at`.
    ///
    /// Both accepted entries and duplicates notify subscribers, since either
    /// refreshes the channel's liveness.
    ///
    /// # Errors
    ///
    /// Returns `FeedStoreError::Invalid` if the entry is rejected.
    pub fn push_feed_entry_at(
        &self,
        entry: FeedEntry,
        received_at: DateTime<Utc>,
    ) -> Result<FeedSubmitOutcome, FeedStoreError> {
        let source = entry.feed_source;
        let outcome = match self.feeds.submit(entry, received_at) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(%source, error = %e, "Feed entry rejected");
                return Err(e);
            }
        };

        tracing::debug!(%source, ?outcome, "Feed entry processed");
        self.publisher.notify(ChangeKind::FeedEntry { source });
        Ok(outcome)
    }

    /// Returns the current ranking of an event, rank 1 first.
    ///
    /// An unknown event yields an empty ranking.
    ///
    /// # Errors
    ///
    /// Returns an error if the metric store cannot be read.
    pub fn get_ranking(&self, event_id: &str) -> Result<Vec<RankedStation>, MetricStoreError> {
        self.metrics.ranking(event_id)
    }

    /// Returns the view of a feed channel as seen now.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed store cannot be read.
    pub fn get_feed(&self, source: FeedSource) -> Result<FeedView, FeedStoreError> {
        self.get_feed_at(source, Utc::now())
    }

    /// Returns the view of a feed channel as seen at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed store cannot be read.
    pub fn get_feed_at(
        &self,
        source: FeedSource,
        now: DateTime<Utc>,
    ) -> Result<FeedView, FeedStoreError> {
        self.publisher.feed_view(source, now)
    }

    /// Returns a snapshot of the whole dashboard as seen now.
    ///
    /// # Errors
    ///
    /// Returns an error if a store cannot be read.
    pub fn get_snapshot(&self) -> Result<DashboardSnapshot, PublishError> {
        self.publisher.publish()
    }

    /// Returns a snapshot of the whole dashboard as seen at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store cannot be read.
    pub fn get_snapshot_at(&self, now: DateTime<Utc>) -> Result<DashboardSnapshot, PublishError> {
        self.publisher.publish_at(now)
    }

    /// Subscribes to change notices.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.publisher.subscribe()
    }

    /// Adds an event to the watch list. Returns true if it was newly added.
    pub fn watch(&self, event_id: &str) -> bool {
        self.publisher.watch(event_id)
    }

    /// Removes an event from the watch list. Returns true if it was watched.
    pub fn unwatch(&self, event_id: &str) -> bool {
        self.publisher.unwatch(event_id)
    }

    /// Returns the watched event ids in ascending order.
    #[must_use]
    pub fn watched(&self) -> Vec<String> {
        self.publisher.watched()
    }

    /// Returns the current version counter.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.publisher.version()
    }

    /// Announces that a channel crossed the staleness horizon.
    ///
    /// Returns the new version.
    pub fn report_staleness(&self, source: FeedSource, is_stale: bool) -> u64 {
        if is_stale {
            tracing::warn!(%source, "Feed channel is stale");
        } else {
            tracing::info!(%source, "Feed channel is live again");
        }
        self.publisher
            .notify(ChangeKind::Staleness { source, is_stale })
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeedConfig, RankingWeights};
    use crate::models::{SeverityTier, StationMetricValidationError};
    use chrono::Duration;

    fn station(id: &str, ot: f64, rms: f64, phases: u32, gap: f64) -> StationMetric {
        StationMetric::new(id, "E1")
            .with_offsets(ot, ot, ot)
            .with_rms(rms)
            .with_phases(phases)
            .with_gap(gap)
    }

    #[test]
    fn test_three_station_ranking() {
        let dashboard = Dashboard::new();
        dashboard
            .push_station_metric(station("A", 0.1, 0.2, 20, 40.0))
            .unwrap();
        dashboard
            .push_station_metric(station("B", 0.5, 0.4, 10, 90.0))
            .unwrap();
        dashboard
            .push_station_metric(station("C", 0.1, 0.2, 25, 40.0))
            .unwrap();

        let ranking = dashboard.get_ranking("E1").unwrap();
        let ids: Vec<&str> = ranking.iter().map(|s| s.station_id.as_str()).collect();
        assert_eq!(ids, ["C", "A", "B"]);

        let snapshot = dashboard.get_snapshot().unwrap();
        assert_eq!(
            snapshot.ranking("E1").unwrap().selected.as_deref(),
            Some("C")
        );
    }

    #[test]
    fn test_rejected_metric_leaves_state_untouched() {
        let dashboard = Dashboard::new();
        let result = dashboard.push_station_metric(StationMetric::new("", "E1"));

        assert!(matches!(
            result,
            Err(MetricStoreError::Invalid(
                StationMetricValidationError::EmptyStationId
            ))
        ));
        assert_eq!(dashboard.version(), 0);
        assert!(dashboard.watched().is_empty());
    }

    #[test]
    fn test_superseded_metric_does_not_notify() {
        let dashboard = Dashboard::new();
        let observed = Utc::now();
        let metric = StationMetric::new("KLI", "E1").with_observed_at(observed);
        dashboard.push_station_metric(metric.clone()).unwrap();
        let version = dashboard.version();

        let outcome = dashboard.push_station_metric(metric).unwrap();
        assert_eq!(outcome, MetricSubmitOutcome::Superseded);
        assert_eq!(dashboard.version(), version);
    }

    #[test]
    fn test_auto_watch_on_first_accepted_metric() {
        let dashboard = Dashboard::new();
        dashboard
            .push_station_metric(StationMetric::new("KLI", "E7"))
            .unwrap();
        assert_eq!(dashboard.watched(), ["E7"]);
    }

    #[test]
    fn test_auto_watch_disabled() {
        let dashboard = Dashboard::from_config(DashboardConfig {
            auto_watch: false,
            ..DashboardConfig::default()
        });
        dashboard
            .push_station_metric(StationMetric::new("KLI", "E7"))
            .unwrap();

        assert!(dashboard.watched().is_empty());
        assert!(dashboard.get_snapshot().unwrap().rankings.is_empty());
        assert_eq!(dashboard.get_ranking("E7").unwrap().len(), 1);
    }

    #[test]
    fn test_station_codes_are_case_insensitive() {
        let dashboard = Dashboard::new();
        let t0 = Utc::now();

        dashboard
            .push_station_metric(station("kli", 0.1, 0.9, 10, 40.0).with_observed_at(t0))
            .unwrap();
        dashboard
            .push_station_metric(
                station("KLI", 0.1, 0.2, 10, 40.0).with_observed_at(t0 + Duration::seconds(1)),
            )
            .unwrap();
        dashboard
            .push_station_metric(station(" pgr ii ", 0.3, 0.4, 8, 60.0))
            .unwrap();

        let ranking = dashboard.get_ranking("E1").unwrap();
        let mut ids: Vec<&str> = ranking.iter().map(|s| s.station_id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, ["KLI", "PGR II"]);
        assert_eq!(dashboard.watched(), ["E1"]);
    }

    #[test]
    fn test_blank_station_id_is_rejected() {
        let dashboard = Dashboard::new();
        let result = dashboard.push_station_metric(StationMetric::new("   ", "E1"));

        assert!(matches!(
            result,
            Err(MetricStoreError::Invalid(
                StationMetricValidationError::EmptyStationId
            ))
        ));
        assert_eq!(dashboard.version(), 0);
        assert!(dashboard.get_ranking("E1").unwrap().is_empty());
    }

    #[test]
    fn test_event_id_is_trimmed_before_watching() {
        let dashboard = Dashboard::new();
        dashboard
            .push_station_metric(StationMetric::new("KLI", " E9 "))
            .unwrap();

        assert_eq!(dashboard.watched(), ["E9"]);
        assert_eq!(dashboard.get_ranking("E9").unwrap().len(), 1);
    }

    #[test]
    fn test_unvalidated_staleness_horizon_does_not_panic() {
        let dashboard = Dashboard::from_config(DashboardConfig {
            feeds: FeedConfig::new(5, u64::MAX),
            ..DashboardConfig::default()
        });
        dashboard
            .push_feed_entry(FeedEntry::new(FeedSource::Esdx, "BMKG", 2.0, Utc::now()))
            .unwrap();

        assert!(!dashboard.get_feed(FeedSource::Esdx).unwrap().is_stale);
    }

    #[test]
    fn test_feed_scenario_with_cap() {
        let dashboard = Dashboard::from_config(DashboardConfig {
            feeds: FeedConfig::new(5, 60),
            ..DashboardConfig::default()
        });
        let t0: DateTime<Utc> = "2025-05-14T00:00:00Z".parse().unwrap();
        let received = Utc::now();

        for minute in 0..6 {
            dashboard
                .push_feed_entry_at(
                    FeedEntry::new(
                        FeedSource::Esdx,
                        "Balai 2 Ciputat",
                        3.2,
                        t0 + Duration::minutes(minute),
                    ),
                    received,
                )
                .unwrap();
        }

        let view = dashboard.get_feed_at(FeedSource::Esdx, received).unwrap();
        assert_eq!(view.entries.len(), 5);
        assert_eq!(view.entries[0].event_time, t0 + Duration::minutes(5));
        assert_eq!(view.entries[4].event_time, t0 + Duration::minutes(1));
        assert!(!view.is_stale);
        assert_eq!(view.tally.medium, 6);
    }

    #[test]
    fn test_duplicate_feed_entry_notifies() {
        let dashboard = Dashboard::new();
        let entry = FeedEntry::new(FeedSource::EsdxStation, "BMKG Bengkulu", 5.2, Utc::now());

        dashboard.push_feed_entry(entry.clone()).unwrap();
        let outcome = dashboard.push_feed_entry(entry).unwrap();

        assert_eq!(outcome, FeedSubmitOutcome::Duplicate);
        assert_eq!(dashboard.version(), 2);
        let view = dashboard.get_feed(FeedSource::EsdxStation).unwrap();
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].severity_tier, SeverityTier::High);
    }

    #[test]
    fn test_unknown_event_and_empty_feed_are_not_errors() {
        let dashboard = Dashboard::new();
        assert!(dashboard.get_ranking("nope").unwrap().is_empty());

        let view = dashboard.get_feed(FeedSource::Esdx).unwrap();
        assert!(view.entries.is_empty());
        assert!(view.last_updated_at.is_none());
    }

    #[test]
    fn test_subscriber_sees_every_mutation() {
        let dashboard = Dashboard::new();
        let mut receiver = dashboard.subscribe();

        dashboard
            .push_station_metric(StationMetric::new("KLI", "E1"))
            .unwrap();
        dashboard
            .push_feed_entry(FeedEntry::new(FeedSource::Esdx, "BMKG", 2.0, Utc::now()))
            .unwrap();
        dashboard.unwatch("E1");

        let changes: Vec<ChangeKind> = std::iter::from_fn(|| receiver.try_recv().ok())
            .map(|notice| notice.change)
            .collect();
        assert_eq!(
            changes,
            [
                ChangeKind::Watch {
                    event_id: "E1".to_string(),
                    watched: true
                },
                ChangeKind::StationMetric {
                    event_id: "E1".to_string()
                },
                ChangeKind::FeedEntry {
                    source: FeedSource::Esdx
                },
                ChangeKind::Watch {
                    event_id: "E1".to_string(),
                    watched: false
                },
            ]
        );
    }

    #[test]
    fn test_configured_weights_reach_ranking() {
        let weights: RankingWeights = "0,0,0,1,0,0".parse().unwrap();
        let dashboard = Dashboard::from_config(DashboardConfig {
            weights,
            ..DashboardConfig::default()
        });
        // Only the RMS residual counts.
        dashboard
            .push_station_metric(station("A", 0.0, 0.5, 40, 10.0))
            .unwrap();
        dashboard
            .push_station_metric(station("B", 2.0, 0.1, 3, 300.0))
            .unwrap();

        assert_eq!(dashboard.get_ranking("E1").unwrap()[0].station_id, "B");
    }

    #[test]
    fn test_report_staleness_bumps_version() {
        let dashboard = Dashboard::new();
        let version = dashboard.report_staleness(FeedSource::Esdx, true);
        assert_eq!(version, 1);
        assert_eq!(dashboard.get_snapshot().unwrap().version, 1);
    }
}
