//! Data models for the Quakeboard dashboard backend.
//!
//! This module contains the station metrics, feed entries and the read models
//! composed from them.

pub mod feed;
pub mod snapshot;
pub mod station;

pub use feed::{
    FeedChannelState, FeedEntry, FeedEntryValidationError, FeedSource, FeedTally, SeverityTier,
    UnknownFeedSource,
};
pub use snapshot::{DashboardSnapshot, EventRanking, FeedView};
pub use station::{
    CriterionRanks, CriterionScores, RankedStation, RawStationMeasurement, StationMetric,
    StationMetricValidationError,
};
