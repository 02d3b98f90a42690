//! Derives the highlighted station from a ranking.
//!
//! Selection is never stored: it is recomputed from the current ranking and
//! an optional pin chosen by the user.

use crate::models::RankedStation;

/// Returns the ranked station a pin names, if it is present.
///
/// The pin is matched case-insensitively, ignoring surrounding whitespace.
#[must_use]
pub fn pinned_station<'a>(
    ranking: &'a [RankedStation],
    pin: Option<&str>,
) -> Option<&'a RankedStation> {
    pin.map(|p| p.trim().to_uppercase())
        .filter(|p| !p.is_empty())
        .and_then(|p| ranking.iter().find(|s| s.station_id.to_uppercase() == p))
}

/// Returns the station to highlight.
///
/// A pin that names a station present in the ranking wins; otherwise the
/// rank-1 station is selected. Returns `None` for an empty ranking.
#[must_use]
pub fn select_station<'a>(
    ranking: &'a [RankedStation],
    pin: Option<&str>,
) -> Option<&'a RankedStation> {
    pinned_station(ranking, pin).or_else(|| ranking.first())
}
