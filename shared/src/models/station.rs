//! Station metric data model.
//!
//! Defines `StationMetric`, the canonical per-station quality measurement for a
//! seismic event, the raw wire form it is normalized from, and the derived
//! `RankedStation` produced by the ranking engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// One station's quality measurement for one seismic event.
///
/// The pair `(station_id, event_id)` identifies a measurement. When two
/// measurements share that pair, the one with the newer `observed_at` wins.
///
/// # Example
///
/// ```
/// use shared::models::StationMetric;
///
/// let metric = StationMetric::new("PGR II", "E1")
///     .with_offsets(0.1, 0.05, -0.02)
///     .with_rms(0.3)
///     .with_phases(18)
///     .with_gap(75.0);
///
/// assert!(metric.validate_metric().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationMetric {
    /// Station code (e.g. "PGR II").
    #[validate(length(min = 1, message = "Station id cannot be empty"))]
    pub station_id: String,

    /// Identifier of the seismic event this measurement belongs to.
    #[validate(length(min = 1, message = "Event id cannot be empty"))]
    pub event_id: String,

    /// Origin-time offset in seconds (signed).
    pub origin_time_offset_sec: f64,

    /// Latitude offset in degrees (signed).
    pub lat_offset_deg: f64,

    /// Longitude offset in degrees (signed).
    pub lon_offset_deg: f64,

    /// RMS travel-time residual in seconds.
    #[validate(range(min = 0.0, message = "RMS residual cannot be negative"))]
    pub rms_residual_sec: f64,

    /// Number of phases used by the solution.
    pub phase_count: u32,

    /// Largest azimuthal gap between adjacent stations, in degrees.
    #[validate(range(
        min = 0.0,
        exclusive_max = 360.0,
        message = "Azimuthal gap must be in [0, 360)"
    ))]
    pub azimuthal_gap_deg: f64,

    /// When the measurement was observed at the source.
    pub observed_at: DateTime<Utc>,
}

/// Errors that can occur during station metric validation.
#[derive(Debug, Error)]
pub enum StationMetricValidationError {
    /// The station id is empty.
    #[error("Station id cannot be empty")]
    EmptyStationId,

    /// The event id is empty.
    #[error("Event id cannot be empty")]
    EmptyEventId,

    /// A numeric field is NaN or infinite.
    #[error("Field '{0}' must be a finite number")]
    NonFinite(&'static str),

    /// The phase count is negative.
    #[error("Phase count cannot be negative (got {0})")]
    NegativePhaseCount(i64),

    /// The phase count does not fit the supported range.
    #[error("Phase count {0} is out of range")]
    PhaseCountOutOfRange(i64),

    /// The RMS residual is negative.
    #[error("RMS residual cannot be negative (got {0})")]
    NegativeResidual(f64),

    /// The azimuthal gap is outside `[0, 360)`.
    #[error("Azimuthal gap must be in [0, 360) (got {0})")]
    GapOutOfRange(f64),

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl StationMetric {
    /// Creates a new metric with zeroed measurements, observed now.
    #[must_use]
    pub fn new(station_id: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            event_id: event_id.into(),
            origin_time_offset_sec: 0.0,
            lat_offset_deg: 0.0,
            lon_offset_deg: 0.0,
            rms_residual_sec: 0.0,
            phase_count: 0,
            azimuthal_gap_deg: 0.0,
            observed_at: Utc::now(),
        }
    }

    /// Sets the origin-time, latitude and longitude offsets.
    #[must_use]
    pub fn with_offsets(mut self, origin_time_sec: f64, lat_deg: f64, lon_deg: f64) -> Self {
        self.origin_time_offset_sec = origin_time_sec;
        self.lat_offset_deg = lat_deg;
        self.lon_offset_deg = lon_deg;
        self
    }

    /// Sets the RMS residual.
    #[must_use]
    pub fn with_rms(mut self, rms_residual_sec: f64) -> Self {
        self.rms_residual_sec = rms_residual_sec;
        self
    }

    /// Sets the phase count.
    #[must_use]
    pub fn with_phases(mut self, phase_count: u32) -> Self {
        self.phase_count = phase_count;
        self
    }

    /// Sets the azimuthal gap.
    #[must_use]
    pub fn with_gap(mut self, azimuthal_gap_deg: f64) -> Self {
        self.azimuthal_gap_deg = azimuthal_gap_deg;
        self
    }

    /// Sets the observation timestamp.
    #[must_use]
    pub fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    /// Returns the metric with trimmed ids and an upper-cased station code.
    ///
    /// Station codes compare case-insensitively, so `pgr ii` and `PGR II`
    /// name the same station once normalized.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.station_id = self.station_id.trim().to_uppercase();
        self.event_id = self.event_id.trim().to_string();
        self
    }

    /// Validates the metric.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Either id is empty or blank
    /// - Any numeric field is NaN or infinite
    /// - The RMS residual is negative
    /// - The azimuthal gap is outside `[0, 360)`
    pub fn validate_metric(&self) -> Result<(), StationMetricValidationError> {
        if self.station_id.trim().is_empty() {
            return Err(StationMetricValidationError::EmptyStationId);
        }
        if self.event_id.trim().is_empty() {
            return Err(StationMetricValidationError::EmptyEventId);
        }

        let numeric = [
            ("origin_time_offset_sec", self.origin_time_offset_sec),
            ("lat_offset_deg", self.lat_offset_deg),
            ("lon_offset_deg", self.lon_offset_deg),
            ("rms_residual_sec", self.rms_residual_sec),
            ("azimuthal_gap_deg", self.azimuthal_gap_deg),
        ];
        if let Some((field, _)) = numeric.iter().find(|(_, v)| !v.is_finite()) {
            return Err(StationMetricValidationError::NonFinite(*field));
        }

        if self.rms_residual_sec < 0.0 {
            return Err(StationMetricValidationError::NegativeResidual(
                self.rms_residual_sec,
            ));
        }
        if !(0.0..360.0).contains(&self.azimuthal_gap_deg) {
            return Err(StationMetricValidationError::GapOutOfRange(
                self.azimuthal_gap_deg,
            ));
        }

        self.validate()?;
        Ok(())
    }
}

/// A station measurement as reported by an upstream collaborator.
///
/// This is the un-normalized form: ids may carry whitespace, the phase count
/// is signed and the observation time may be missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStationMeasurement {
    /// Station code as reported.
    pub station_id: String,
    /// Event identifier as reported.
    pub event_id: String,
    /// Origin-time offset in seconds.
    #[serde(default)]
    pub origin_time_offset_sec: f64,
    /// Latitude offset in degrees.
    #[serde(default)]
    pub lat_offset_deg: f64,
    /// Longitude offset in degrees.
    #[serde(default)]
    pub lon_offset_deg: f64,
    /// RMS residual in seconds.
    #[serde(default)]
    pub rms_residual_sec: f64,
    /// Phase count as reported (may be negative in malformed input).
    #[serde(default)]
    pub phase_count: i64,
    /// Azimuthal gap in degrees.
    #[serde(default)]
    pub azimuthal_gap_deg: f64,
    /// Observation time; defaults to the ingestion time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

impl RawStationMeasurement {
    /// Normalizes the raw measurement into a validated `StationMetric`.
    ///
    /// Ids are trimmed and the station code is upper-cased. A missing
    /// observation time is replaced with `received_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the phase count is negative or too large, or if the
    /// normalized metric fails [`StationMetric::validate_metric`].
    pub fn normalize(
        self,
        received_at: DateTime<Utc>,
    ) -> Result<StationMetric, StationMetricValidationError> {
        if self.phase_count < 0 {
            return Err(StationMetricValidationError::NegativePhaseCount(
                self.phase_count,
            ));
        }
        let phase_count = u32::try_from(self.phase_count)
            .map_err(|_| StationMetricValidationError::PhaseCountOutOfRange(self.phase_count))?;

        let metric = StationMetric {
            station_id: self.station_id,
            event_id: self.event_id,
            origin_time_offset_sec: self.origin_time_offset_sec,
            lat_offset_deg: self.lat_offset_deg,
            lon_offset_deg: self.lon_offset_deg,
            rms_residual_sec: self.rms_residual_sec,
            phase_count,
            azimuthal_gap_deg: self.azimuthal_gap_deg,
            observed_at: self.observed_at.unwrap_or(received_at),
        }
        .normalized();
        metric.validate_metric()?;
        Ok(metric)
    }
}

/// Normalized values of the six ranking criteria, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CriterionScores {
    /// `|origin_time_offset_sec|`, normalized.
    pub origin_time: f64,
    /// `|lat_offset_deg|`, normalized.
    pub latitude: f64,
    /// `|lon_offset_deg|`, normalized.
    pub longitude: f64,
    /// `rms_residual_sec`, normalized.
    pub rms: f64,
    /// Inverse phase count, normalized.
    pub phases: f64,
    /// `azimuthal_gap_deg`, normalized.
    pub azimuthal_gap: f64,
}

/// Per-criterion competition ranks (1 = best in that column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CriterionRanks {
    /// Rank by origin-time offset.
    pub origin_time: u32,
    /// Rank by latitude offset.
    pub latitude: u32,
    /// Rank by longitude offset.
    pub longitude: u32,
    /// Rank by RMS residual.
    pub rms: u32,
    /// Rank by phase count.
    pub phases: u32,
    /// Rank by azimuthal gap.
    pub azimuthal_gap: u32,
}

/// A station's position in the ranking of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedStation {
    /// Station code.
    pub station_id: String,
    /// Composite score in `[0, 1]`; lower is better.
    pub score: f64,
    /// 1-based rank.
    pub rank: u32,
    /// Normalized criterion values the score was built from.
    pub criteria: CriterionScores,
    /// Rank of this station on each individual criterion.
    pub criterion_ranks: CriterionRanks,
    /// The measurement that was ranked.
    pub metric: StationMetric,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(station_id: &str, event_id: &str) -> RawStationMeasurement {
        RawStationMeasurement {
            station_id: station_id.to_string(),
            event_id: event_id.to_string(),
            origin_time_offset_sec: 0.2,
            lat_offset_deg: -0.1,
            lon_offset_deg: 0.05,
            rms_residual_sec: 0.4,
            phase_count: 12,
            azimuthal_gap_deg: 80.0,
            observed_at: None,
        }
    }

    #[test]
    fn test_station_metric_builder() {
        let metric = StationMetric::new("KLI", "E1")
            .with_offsets(0.5, 0.3, 0.2)
            .with_rms(0.4)
            .with_phases(10)
            .with_gap(90.0);

        assert_eq!(metric.station_id, "KLI");
        assert_eq!(metric.event_id, "E1");
        assert_eq!(metric.lat_offset_deg, 0.3);
        assert_eq!(metric.phase_count, 10);
        assert!(metric.validate_metric().is_ok());
    }

    #[test]
    fn test_validation_empty_ids() {
        let result = StationMetric::new("", "E1").validate_metric();
        assert!(matches!(
            result,
            Err(StationMetricValidationError::EmptyStationId)
        ));

        let result = StationMetric::new("KLI", "").validate_metric();
        assert!(matches!(
            result,
            Err(StationMetricValidationError::EmptyEventId)
        ));
    }

    #[test]
    fn test_validation_blank_ids() {
        assert!(matches!(
            StationMetric::new("   ", "E1").validate_metric(),
            Err(StationMetricValidationError::EmptyStationId)
        ));
        assert!(matches!(
            StationMetric::new("KLI", "\t").validate_metric(),
            Err(StationMetricValidationError::EmptyEventId)
        ));
    }

    #[test]
    fn test_normalized_metric() {
        let metric = StationMetric::new(" pgr ii", "E1 ").normalized();
        assert_eq!(metric.station_id, "PGR II");
        assert_eq!(metric.event_id, "E1");
    }

    #[test]
    fn test_validation_non_finite() {
        let metric = StationMetric::new("KLI", "E1").with_offsets(f64::NAN, 0.0, 0.0);
        assert!(matches!(
            metric.validate_metric(),
            Err(StationMetricValidationError::NonFinite("origin_time_offset_sec"))
        ));

        let metric = StationMetric::new("KLI", "E1").with_rms(f64::INFINITY);
        assert!(matches!(
            metric.validate_metric(),
            Err(StationMetricValidationError::NonFinite("rms_residual_sec"))
        ));
    }

    #[test]
    fn test_validation_gap_range() {
        let ok = StationMetric::new("KLI", "E1").with_gap(359.9);
        assert!(ok.validate_metric().is_ok());

        let at_bound = StationMetric::new("KLI", "E1").with_gap(360.0);
        assert!(matches!(
            at_bound.validate_metric(),
            Err(StationMetricValidationError::GapOutOfRange(_))
        ));

        let negative = StationMetric::new("KLI", "E1").with_gap(-1.0);
        assert!(matches!(
            negative.validate_metric(),
            Err(StationMetricValidationError::GapOutOfRange(_))
        ));
    }

    #[test]
    fn test_validation_negative_rms() {
        let metric = StationMetric::new("KLI", "E1").with_rms(-0.1);
        assert!(matches!(
            metric.validate_metric(),
            Err(StationMetricValidationError::NegativeResidual(_))
        ));
    }

    #[test]
    fn test_normalize_trims_and_uppercases() {
        let received = Utc::now();
        let metric = raw("  pgr ii ", " E7 ").normalize(received).unwrap();

        assert_eq!(metric.station_id, "PGR II");
        assert_eq!(metric.event_id, "E7");
        assert_eq!(metric.phase_count, 12);
        assert_eq!(metric.observed_at, received);
    }

    #[test]
    fn test_normalize_keeps_observed_at() {
        let observed = "2025-05-14T04:55:00Z".parse::<DateTime<Utc>>().unwrap();
        let mut input = raw("LEM", "E1");
        input.observed_at = Some(observed);

        let metric = input.normalize(Utc::now()).unwrap();
        assert_eq!(metric.observed_at, observed);
    }

    #[test]
    fn test_normalize_rejects_negative_phase_count() {
        let mut input = raw("LEM", "E1");
        input.phase_count = -3;

        assert!(matches!(
            input.normalize(Utc::now()),
            Err(StationMetricValidationError::NegativePhaseCount(-3))
        ));
    }

    #[test]
    fn test_normalize_rejects_blank_ids() {
        assert!(matches!(
            raw("   ", "E1").normalize(Utc::now()),
            Err(StationMetricValidationError::EmptyStationId)
        ));
    }

    #[test]
    fn test_raw_deserialization_defaults() {
        let json = r#"{"station_id": "TNG", "event_id": "E2", "phase_count": 7}"#;
        let input: RawStationMeasurement = serde_json::from_str(json).unwrap();

        assert_eq!(input.phase_count, 7);
        assert_eq!(input.rms_residual_sec, 0.0);
        assert!(input.observed_at.is_none());
    }
}
