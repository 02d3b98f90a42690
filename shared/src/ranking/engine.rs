//! Station scoring and ordering.
//!
//! Every criterion is min–max scaled to `[0, 1]` across the candidate set; a
//! criterion without spread contributes `0`. The composite score is the
//! weighted mean of the scaled values, lower is better.

use std::cmp::Ordering;

use crate::config::{Criterion, RankingWeights};
use crate::models::{CriterionRanks, CriterionScores, RankedStation, StationMetric};

/// Raw criterion values of one metric, in [`Criterion::ALL`] order.
///
/// Smaller is better for every value. The phase count enters as
/// `1 / (phase_count + 1)` so that zero phases stays finite.
#[must_use]
fn criterion_values(metric: &StationMetric) -> [f64; 6] {
    [
        metric.origin_time_offset_sec.abs(),
        metric.lat_offset_deg.abs(),
        metric.lon_offset_deg.abs(),
        metric.rms_residual_sec,
        1.0 / (f64::from(metric.phase_count) + 1.0),
        metric.azimuthal_gap_deg,
    ]
}

/// Min–max scales each column of `raw` into `[0, 1]`.
fn normalize(raw: &[[f64; 6]]) -> Vec<[f64; 6]> {
    let mut bounds = [(f64::INFINITY, f64::NEG_INFINITY); 6];
    for values in raw {
        for (bound, value) in bounds.iter_mut().zip(values) {
            bound.0 = bound.0.min(*value);
            bound.1 = bound.1.max(*value);
        }
    }

    raw.iter()
        .map(|values| {
            let mut scaled = [0.0; 6];
            for (i, value) in values.iter().enumerate() {
                let (min, max) = bounds[i];
                let spread = max - min;
                if spread > 0.0 {
                    scaled[i] = (value - min) / spread;
                }
            }
            scaled
        })
        .collect()
}

fn weighted_mean(scaled: &[f64; 6], weights: &RankingWeights) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    let sum: f64 = weights
        .as_array()
        .iter()
        .zip(scaled)
        .map(|(w, v)| w * v)
        .sum();
    sum / total
}

/// Competition rank of candidate `index` on column `column`.
fn competition_rank(raw: &[[f64; 6]], index: usize, column: usize) -> u32 {
    let value = raw[index][column];
    let better = raw.iter().filter(|other| other[column] < value).count();
    u32::try_from(better + 1).unwrap_or(u32::MAX)
}

/// Total order used for ranking: score, then more phases, then smaller gap,
/// then station id.
fn compare(a: &RankedStation, b: &RankedStation) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| b.metric.phase_count.cmp(&a.metric.phase_count))
        .then_with(|| {
            a.metric
                .azimuthal_gap_deg
                .total_cmp(&b.metric.azimuthal_gap_deg)
        })
        .then_with(|| a.station_id.cmp(&b.station_id))
}

/// Ranks the given metrics of a single event.
///
/// The result is independent of the iteration order of `metrics`. An empty
/// input yields an empty ranking.
///
/// # Examples
///
/// ```
/// use shared::config::RankingWeights;
/// use shared::models::StationMetric;
/// use shared::ranking::rank_stations;
///
/// let metrics = vec![
///     StationMetric::new("KLI", "E1").with_rms(0.9).with_phases(8).with_gap(120.0),
///     StationMetric::new("LEM", "E1").with_rms(0.2).with_phases(30).with_gap(40.0),
/// ];
///
/// let ranking = rank_stations(&metrics, &RankingWeights::default());
/// assert_eq!(ranking[0].station_id, "LEM");
/// assert_eq!(ranking[0].rank, 1);
/// ```
#[must_use]
pub fn rank_stations<'a, I>(metrics: I, weights: &RankingWeights) -> Vec<RankedStation>
where
    I: IntoIterator<Item = &'a StationMetric>,
{
    let candidates: Vec<&StationMetric> = metrics.into_iter().collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let raw: Vec<[f64; 6]> = candidates.iter().map(|m| criterion_values(m)).collect();
    let scaled = normalize(&raw);

    let mut ranked: Vec<RankedStation> = candidates
        .iter()
        .enumerate()
        .map(|(i, metric)| {
            let s = scaled[i];
            RankedStation {
                station_id: metric.station_id.clone(),
                score: weighted_mean(&s, weights),
                rank: 0,
                criteria: CriterionScores {
                    origin_time: s[0],
                    latitude: s[1],
                    longitude: s[2],
                    rms: s[3],
                    phases: s[4],
                    azimuthal_gap: s[5],
                },
                criterion_ranks: CriterionRanks {
                    origin_time: competition_rank(&raw, i, 0),
                    latitude: competition_rank(&raw, i, 1),
                    longitude: competition_rank(&raw, i, 2),
                    rms: competition_rank(&raw, i, 3),
                    phases: competition_rank(&raw, i, 4),
                    azimuthal_gap: competition_rank(&raw, i, 5),
                },
                metric: (*metric).clone(),
            }
        })
        .collect();

    ranked.sort_by(compare);
    for (position, station) in ranked.iter_mut().enumerate() {
        station.rank = u32::try_from(position + 1).unwrap_or(u32::MAX);
    }

    tracing::trace!(
        candidates = ranked.len(),
        best = ranked.first().map(|s| s.station_id.as_str()),
        "Ranked stations"
    );

    ranked
}

/// Returns the per-column rank of `criterion` for a ranked station.
#[must_use]
pub fn criterion_rank(station: &RankedStation, criterion: Criterion) -> u32 {
    match criterion {
        Criterion::OriginTime => station.criterion_ranks.origin_time,
        Criterion::Latitude => station.criterion_ranks.latitude,
        Criterion::Longitude => station.criterion_ranks.longitude,
        Criterion::Rms => station.criterion_ranks.rms,
        Criterion::Phases => station.criterion_ranks.phases,
        Criterion::AzimuthalGap => station.criterion_ranks.azimuthal_gap,
    }
}
