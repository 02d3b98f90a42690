//! Background monitors.
//!
//! This module provides tasks that watch the dashboard itself, such as the
//! feed liveness monitor that announces staleness transitions.

pub mod liveness;

pub use liveness::{FeedLiveness, LivenessMonitor, LivenessReport};
