//! Feed entry data model.
//!
//! Defines the earthquake notices published by upstream feed sources, their
//! severity classification and the per-source channel state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

/// Upstream channel an earthquake notice arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedSource {
    /// Regional network notices ("ESDX").
    Esdx,
    /// Station-level notices ("ESDX STASIUN").
    #[serde(alias = "ESDX STASIUN")]
    EsdxStation,
}

impl FeedSource {
    /// All known feed sources, in display order.
    pub const ALL: [Self; 2] = [Self::Esdx, Self::EsdxStation];

    /// Returns the wire name of the source.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Esdx => "ESDX",
            Self::EsdxStation => "ESDX_STATION",
        }
    }

    /// Returns the panel title shown on the dashboard.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Esdx => "ESDX",
            Self::EsdxStation => "ESDX STASIUN",
        }
    }
}

impl std::fmt::Display for FeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a feed source name is not recognized.
#[derive(Debug, Error)]
#[error("Unknown feed source: '{0}'")]
pub struct UnknownFeedSource(pub String);

impl FromStr for FeedSource {
    type Err = UnknownFeedSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "ESDX" => Ok(Self::Esdx),
            "ESDX_STATION" | "ESDX_STASIUN" => Ok(Self::EsdxStation),
            _ => Err(UnknownFeedSource(s.to_string())),
        }
    }
}

/// Severity tier derived from an event's magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityTier {
    /// Magnitude 5.0 and above.
    High,
    /// Magnitude in `[3.0, 5.0)`.
    Medium,
    /// Magnitude in `[2.0, 3.0)`.
    Low,
    /// Everything below 2.0.
    #[default]
    Info,
}

impl SeverityTier {
    /// Classifies a magnitude into its tier.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::models::SeverityTier;
    ///
    /// assert_eq!(SeverityTier::classify(5.2), SeverityTier::High);
    /// assert_eq!(SeverityTier::classify(2.3), SeverityTier::Low);
    /// assert_eq!(SeverityTier::classify(1.0), SeverityTier::Info);
    /// ```
    #[must_use]
    pub fn classify(magnitude: f64) -> Self {
        if magnitude >= 5.0 {
            Self::High
        } else if magnitude >= 3.0 {
            Self::Medium
        } else if magnitude >= 2.0 {
            Self::Low
        } else {
            Self::Info
        }
    }

    /// Returns the display color band for the tier.
    #[must_use]
    pub const fn color(&self) -> &'static str {
        match self {
            Self::High => "red",
            Self::Medium => "yellow",
            Self::Low => "green",
            Self::Info => "gray",
        }
    }
}

impl std::fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
            Self::Info => write!(f, "INFO"),
        }
    }
}

/// One earthquake notice from one feed source.
///
/// # Example
///
/// ```
/// use shared::models::{FeedEntry, FeedSource, SeverityTier};
/// use chrono::Utc;
///
/// let entry = FeedEntry::new(FeedSource::Esdx, "Balai 2 Ciputat", 3.9, Utc::now())
///     .with_epicenter(-5.57, 105.60);
///
/// assert_eq!(entry.severity_tier, SeverityTier::Medium);
/// assert!(entry.validate_entry().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FeedEntry {
    /// Source channel.
    pub feed_source: FeedSource,

    /// Reporting location label (e.g. "BMKG Bengkulu").
    #[validate(length(
        min = 1,
        max = 256,
        message = "Location label must be 1 to 256 characters"
    ))]
    pub location_label: String,

    /// Event magnitude.
    pub magnitude: f64,

    /// Event origin time.
    pub event_time: DateTime<Utc>,

    /// Correlation id; empty when the source does not provide one.
    #[serde(default)]
    pub event_id: String,

    /// Tier derived from `magnitude` when the entry is accepted.
    #[serde(default)]
    pub severity_tier: SeverityTier,

    /// Epicenter latitude in degrees, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    /// Epicenter longitude in degrees, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// Errors that can occur during feed entry validation.
#[derive(Debug, Error)]
pub enum FeedEntryValidationError {
    /// The location label is empty.
    #[error("Location label cannot be empty")]
    EmptyLocation,

    /// The magnitude is NaN or infinite.
    #[error("Magnitude must be a finite number")]
    NonFiniteMagnitude,

    /// The latitude is non-finite or outside `[-90, 90]`.
    #[error("Latitude must be within [-90, 90] (got {0})")]
    InvalidLatitude(f64),

    /// The longitude is non-finite or outside `[-180, 180]`.
    #[error("Longitude must be within [-180, 180] (got {0})")]
    InvalidLongitude(f64),

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl FeedEntry {
    /// Creates a new entry and classifies its severity.
    #[must_use]
    pub fn new(
        feed_source: FeedSource,
        location_label: impl Into<String>,
        magnitude: f64,
        event_time: DateTime<Utc>,
    ) -> Self {
        Self {
            feed_source,
            location_label: location_label.into(),
            magnitude,
            event_time,
            event_id: String::new(),
            severity_tier: SeverityTier::classify(magnitude),
            latitude: None,
            longitude: None,
        }
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = event_id.into();
        self
    }

    /// Sets the epicenter coordinates.
    #[must_use]
    pub fn with_epicenter(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Trims the label and re-derives the severity tier from the magnitude.
    #[must_use]
    pub fn classified(mut self) -> Self {
        let trimmed = self.location_label.trim();
        if trimmed.len() != self.location_label.len() {
            self.location_label = trimmed.to_string();
        }
        self.severity_tier = SeverityTier::classify(self.magnitude);
        self
    }

    /// Validates the entry.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The label is blank or longer than 256 characters
    /// - The magnitude is not finite
    /// - The epicenter is out of range
    pub fn validate_entry(&self) -> Result<(), FeedEntryValidationError> {
        if self.location_label.trim().is_empty() {
            return Err(FeedEntryValidationError::EmptyLocation);
        }
        if !self.magnitude.is_finite() {
            return Err(FeedEntryValidationError::NonFiniteMagnitude);
        }
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(FeedEntryValidationError::InvalidLatitude(lat));
            }
        }
        if let Some(lon) = self.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(FeedEntryValidationError::InvalidLongitude(lon));
            }
        }
        self.validate()?;
        Ok(())
    }

    /// Returns true if `other` reports the same event on the same channel.
    ///
    /// Two entries match when source and label are equal and their event times
    /// agree to the second.
    #[must_use]
    pub fn is_duplicate_of(&self, other: &Self) -> bool {
        self.feed_source == other.feed_source
            && self.location_label == other.location_label
            && self.event_time.timestamp() == other.event_time.timestamp()
    }
}

/// Running per-tier counts of accepted entries for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedTally {
    /// Accepted `HIGH` entries.
    pub high: u64,
    /// Accepted `MEDIUM` entries.
    pub medium: u64,
    /// Accepted `LOW` entries.
    pub low: u64,
    /// Accepted `INFO` entries.
    pub info: u64,
}

impl FeedTally {
    /// Counts one accepted entry of the given tier.
    pub fn record(&mut self, tier: SeverityTier) {
        match tier {
            SeverityTier::High => self.high += 1,
            SeverityTier::Medium => self.medium += 1,
            SeverityTier::Low => self.low += 1,
            SeverityTier::Info => self.info += 1,
        }
    }
}

/// State of one feed channel.
///
/// Values of this type are never mutated once published; the feed store
/// builds a replacement for every accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedChannelState {
    /// Channel this state belongs to.
    pub source: FeedSource,
    /// Entries, most recent `event_time` first.
    pub entries: Vec<FeedEntry>,
    /// When the channel last received a submission (including duplicates).
    pub last_updated_at: DateTime<Utc>,
    /// Per-tier counts of accepted entries.
    pub tally: FeedTally,
}

impl FeedChannelState {
    /// Creates an empty channel.
    #[must_use]
    pub fn new(source: FeedSource, created_at: DateTime<Utc>) -> Self {
        Self {
            source,
            entries: Vec::new(),
            last_updated_at: created_at,
            tally: FeedTally::default(),
        }
    }

    /// Returns true if the channel has not been updated within `horizon`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, horizon: Duration) -> bool {
        now - self.last_updated_at > horizon
    }

    /// Whole seconds elapsed since the last update, never negative.
    #[must_use]
    pub fn seconds_since_update(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_updated_at).num_seconds().max(0)
    }

    /// Returns the newest entry, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&FeedEntry> {
        self.entries.first()
    }
}
