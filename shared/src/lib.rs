//! Quakeboard Shared Library
//!
//! This crate contains the core of the Quakeboard earthquake monitoring
//! dashboard: station quality ranking, bounded feed channels and the
//! snapshot publisher that composes them for the presentation layer.
//!
//! # Modules
//!
//! - [`models`] - Station metrics, feed entries and snapshot read models
//! - [`config`] - Ranking weights and feed channel settings
//! - [`ranking`] - Station quality ranking and selection
//! - [`storage`] - Storage traits and in-memory implementations
//! - [`publisher`] - Snapshot composition and change notification
//! - [`dashboard`] - The facade tying it all together
//!
//! # Example
//!
//! ```
//! use shared::models::{FeedEntry, FeedSource, SeverityTier};
//! use chrono::Utc;
//!
//! let entry = FeedEntry::new(FeedSource::EsdxStation, "BMKG Bengkulu", 5.2, Utc::now());
//!
//! assert_eq!(entry.severity_tier, SeverityTier::High);
//! assert!(entry.validate_entry().is_ok());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod dashboard;
pub mod models;
pub mod publisher;
pub mod ranking;
pub mod storage;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
