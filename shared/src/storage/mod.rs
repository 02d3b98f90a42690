//! Storage traits and implementations.
//!
//! This module provides the stores behind the dashboard. The `MetricStore`
//! trait holds station metrics per event and serves their rankings; the
//! `FeedStore` trait holds the bounded feed channels. Both ship with
//! in-memory implementations whose units are swapped wholesale on write.

pub mod feed_store;
pub mod metric_store;

pub use feed_store::{
    merge_entry, FeedStore, FeedStoreError, FeedSubmitOutcome, InMemoryFeedStore,
};
pub use metric_store::{InMemoryMetricStore, MetricStore, MetricStoreError, MetricSubmitOutcome};
