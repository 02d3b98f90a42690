//! Station metric storage trait and implementations.
//!
//! Provides the `MetricStore` trait for ingesting station metrics and reading
//! per-event rankings, and an `InMemoryMetricStore` implementation.
//!
//! Each event is an independent unit: writers to one event are serialized by
//! that event's writer lock, and readers load the event's current immutable
//! state without locking.

use arc_swap::ArcSwap;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use thiserror::Error;

use crate::config::RankingWeights;
use crate::models::{RankedStation, StationMetric, StationMetricValidationError};
use crate::ranking::rank_stations;

/// Errors that can occur during metric store operations.
#[derive(Debug, Error)]
pub enum MetricStoreError {
    /// The submitted metric failed validation.
    #[error("Invalid station metric: {0}")]
    Invalid(#[from] StationMetricValidationError),

    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on metric store")]
    LockError,
}

/// Result of a successful metric submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSubmitOutcome {
    /// The metric was stored and the event's ranking invalidated.
    Accepted,
    /// A metric with an equal or newer `observed_at` is already stored.
    Superseded,
}

/// Trait for station metric storage implementations.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait MetricStore: Send + Sync {
    /// Normalizes, validates and stores a metric, unless a newer one for the
    /// same `(station_id, event_id)` is already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the metric is invalid or the store cannot be locked.
    fn submit(&self, metric: StationMetric) -> Result<MetricSubmitOutcome, MetricStoreError>;

    /// Returns the current ranking of an event; empty for unknown events.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be locked.
    fn ranking(&self, event_id: &str) -> Result<Vec<RankedStation>, MetricStoreError>;

    /// Returns the ids of all events with at least one metric, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be locked.
    fn event_ids(&self) -> Result<Vec<String>, MetricStoreError>;
}

/// Immutable metric set of one event with its lazily computed ranking.
#[derive(Debug, Default)]
struct EventMetrics {
    metrics: BTreeMap<String, StationMetric>,
    ranking: OnceLock<Vec<RankedStation>>,
}

impl EventMetrics {
    fn new(metrics: BTreeMap<String, StationMetric>) -> Self {
        Self {
            metrics,
            ranking: OnceLock::new(),
        }
    }

    fn ranking(&self, weights: &RankingWeights) -> &[RankedStation] {
        self.ranking
            .get_or_init(|| rank_stations(self.metrics.values(), weights))
    }
}

#[derive(Debug, Default)]
struct EventUnit {
    writer: Mutex<()>,
    state: ArcSwap<EventMetrics>,
}

/// In-memory metric store implementation.
#[derive(Debug, Default)]
pub struct InMemoryMetricStore {
    events: RwLock<HashMap<String, Arc<EventUnit>>>,
    weights: RankingWeights,
}

impl InMemoryMetricStore {
    /// Creates a new empty store with equal ranking weights.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty store with the given ranking weights.
    #[must_use]
    pub fn with_weights(weights: RankingWeights) -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            weights,
        }
    }

    /// Creates a new in-memory metric store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the ranking weights in use.
    #[must_use]
    pub fn weights(&self) -> &RankingWeights {
        &self.weights
    }

    fn unit(&self, event_id: &str) -> Result<Option<Arc<EventUnit>>, MetricStoreError> {
        let events = self
            .events
            .read()
            .map_err(|_| MetricStoreError::LockError)?;
        Ok(events.get(event_id).cloned())
    }

    fn unit_or_create(&self, event_id: &str) -> Result<Arc<EventUnit>, MetricStoreError> {
        if let Some(unit) = self.unit(event_id)? {
            return Ok(unit);
        }
        let mut events = self
            .events
            .write()
            .map_err(|_| MetricStoreError::LockError)?;
        Ok(Arc::clone(events.entry(event_id.to_string()).or_default()))
    }
}

impl MetricStore for InMemoryMetricStore {
    fn submit(&self, metric: StationMetric) -> Result<MetricSubmitOutcome, MetricStoreError> {
        let metric = metric.normalized();
        metric.validate_metric()?;

        let unit = self.unit_or_create(&metric.event_id)?;
        let _writer = unit
            .writer
            .lock()
            .map_err(|_| MetricStoreError::LockError)?;

        let current = unit.state.load_full();
        if let Some(existing) = current.metrics.get(&metric.station_id) {
            if existing.observed_at >= metric.observed_at {
                tracing::debug!(
                    station_id = %metric.station_id,
                    event_id = %metric.event_id,
                    stored_at = %existing.observed_at,
                    submitted_at = %metric.observed_at,
                    "Station metric superseded by stored measurement"
                );
                return Ok(MetricSubmitOutcome::Superseded);
            }
        }

        let mut metrics = current.metrics.clone();
        metrics.insert(metric.station_id.clone(), metric);
        unit.state.store(Arc::new(EventMetrics::new(metrics)));

        Ok(MetricSubmitOutcome::Accepted)
    }

    fn ranking(&self, event_id: &str) -> Result<Vec<RankedStation>, MetricStoreError> {
        let Some(unit) = self.unit(event_id)? else {
            return Ok(Vec::new());
        };
        let state = unit.state.load_full();
        Ok(state.ranking(&self.weights).to_vec())
    }

    fn event_ids(&self) -> Result<Vec<String>, MetricStoreError> {
        let events = self
            .events
            .read()
            .map_err(|_| MetricStoreError::LockError)?;
        let mut ids: Vec<String> = events
            .iter()
            .filter(|(_, unit)| !unit.state.load().metrics.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
