//! Station quality ranking.
//!
//! - [`engine`] scores and orders the candidate stations of one event
//! - [`selection`] derives the highlighted station from a ranking

pub mod engine;
pub mod selection;

pub use engine::{criterion_rank, rank_stations};
pub use selection::{pinned_station, select_station};
