//! Feed channel storage trait and implementations.
//!
//! Provides the `FeedStore` trait for accepting earthquake notices per feed
//! source and an `InMemoryFeedStore` implementation. Every channel keeps a
//! bounded, most-recent-first list of entries.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;

use crate::config::DEFAULT_FEED_CAPACITY;
use crate::models::{FeedChannelState, FeedEntry, FeedEntryValidationError, FeedSource};

/// Errors that can occur during feed store operations.
#[derive(Debug, Error)]
pub enum FeedStoreError {
    /// The submitted entry failed validation.
    #[error("Invalid feed entry: {0}")]
    Invalid(#[from] FeedEntryValidationError),

    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on feed store")]
    LockError,
}

/// Result of a successful feed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSubmitOutcome {
    /// The entry was inserted into its channel.
    Accepted,
    /// The channel already holds the same notice; only liveness was refreshed.
    Duplicate,
}

/// Trait for feed channel storage implementations.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait FeedStore: Send + Sync {
    /// Classifies, validates and merges an entry into its channel.
    ///
    /// `received_at` becomes the channel's `last_updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is invalid or the store cannot be locked.
    fn submit(
        &self,
        entry: FeedEntry,
        received_at: DateTime<Utc>,
    ) -> Result<FeedSubmitOutcome, FeedStoreError>;

    /// Returns the current state of a channel, if it received anything yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be locked.
    fn channel(&self, source: FeedSource)
        -> Result<Option<Arc<FeedChannelState>>, FeedStoreError>;
}

/// Merges `entry` into `channel`, producing the replacement state.
///
/// A duplicate only refreshes `last_updated_at`. Otherwise the entry is
/// inserted after every entry with an equal or newer `event_time`, and the
/// oldest entries beyond `capacity` are evicted. An entry that would land past
/// `capacity` is dropped without being tallied, so a retransmitted notice that
/// was already evicted cannot inflate the counts.
#[must_use]
pub fn merge_entry(
    channel: &FeedChannelState,
    entry: FeedEntry,
    received_at: DateTime<Utc>,
    capacity: usize,
) -> (FeedChannelState, FeedSubmitOutcome) {
    let mut next = channel.clone();
    next.last_updated_at = channel.last_updated_at.max(received_at);

    if channel.entries.iter().any(|e| e.is_duplicate_of(&entry)) {
        return (next, FeedSubmitOutcome::Duplicate);
    }

    let position = next
        .entries
        .iter()
        .position(|e| e.event_time < entry.event_time)
        .unwrap_or(next.entries.len());
    if position >= capacity {
        tracing::debug!(
            source = %next.source,
            event_time = %entry.event_time,
            capacity,
            "Feed entry older than every retained entry, not kept"
        );
        return (next, FeedSubmitOutcome::Accepted);
    }

    next.tally.record(entry.severity_tier);
    next.entries.insert(position, entry);

    if next.entries.len() > capacity {
        let evicted = next.entries.len() - capacity;
        next.entries.truncate(capacity);
        tracing::debug!(
            source = %next.source,
            evicted,
            capacity,
            "Evicted oldest feed entries"
        );
    }

    (next, FeedSubmitOutcome::Accepted)
}

#[derive(Debug)]
struct ChannelUnit {
    writer: Mutex<()>,
    state: ArcSwap<FeedChannelState>,
}

/// In-memory feed store implementation.
#[derive(Debug)]
pub struct InMemoryFeedStore {
    channels: RwLock<HashMap<FeedSource, Arc<ChannelUnit>>>,
    capacity: usize,
}

impl InMemoryFeedStore {
    /// Creates a new empty store with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Creates a new empty store keeping at most `capacity` entries per channel.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Creates a new in-memory feed store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the per-channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn unit(&self, source: FeedSource) -> Result<Option<Arc<ChannelUnit>>, FeedStoreError> {
        let channels = self
            .channels
            .read()
            .map_err(|_| FeedStoreError::LockError)?;
        Ok(channels.get(&source).cloned())
    }

    fn unit_or_create(
        &self,
        source: FeedSource,
        created_at: DateTime<Utc>,
    ) -> Result<Arc<ChannelUnit>, FeedStoreError> {
        if let Some(unit) = self.unit(source)? {
            return Ok(unit);
        }
        let mut channels = self
            .channels
            .write()
            .map_err(|_| FeedStoreError::LockError)?;
        let unit = channels.entry(source).or_insert_with(|| {
            tracing::info!(%source, "Feed channel created");
            Arc::new(ChannelUnit {
                writer: Mutex::new(()),
                state: ArcSwap::from_pointee(FeedChannelState::new(source, created_at)),
            })
        });
        Ok(Arc::clone(unit))
    }
}

impl Default for InMemoryFeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedStore for InMemoryFeedStore {
    fn submit(
        &self,
        entry: FeedEntry,
        received_at: DateTime<Utc>,
    ) -> Result<FeedSubmitOutcome, FeedStoreError> {
        let entry = entry.classified();
        entry.validate_entry()?;

        let unit = self.unit_or_create(entry.feed_source, received_at)?;
        let _writer = unit.writer.lock().map_err(|_| FeedStoreError::LockError)?;

        let current = unit.state.load_full();
        let (next, outcome) = merge_entry(&current, entry, received_at, self.capacity);
        unit.state.store(Arc::new(next));

        Ok(outcome)
    }

    fn channel(
        &self,
        source: FeedSource,
    ) -> Result<Option<Arc<FeedChannelState>>, FeedStoreError> {
        Ok(self.unit(source)?.map(|unit| unit.state.load_full()))
    }
}
