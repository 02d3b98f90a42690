//! Ranking weight configuration.
//!
//! The composite station score is a weighted mean of six normalized criteria.
//! Equal weights (the default) give the plain mean.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One of the six station quality criteria shown in the WEIGHTING table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Absolute origin-time offset.
    OriginTime,
    /// Absolute latitude offset.
    Latitude,
    /// Absolute longitude offset.
    Longitude,
    /// RMS residual.
    Rms,
    /// Inverse phase count.
    Phases,
    /// Azimuthal gap.
    AzimuthalGap,
}

impl Criterion {
    /// All criteria, in WEIGHTING column order.
    pub const ALL: [Self; 6] = [
        Self::OriginTime,
        Self::Latitude,
        Self::Longitude,
        Self::Rms,
        Self::Phases,
        Self::AzimuthalGap,
    ];

    /// Column header used on the dashboard.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::OriginTime => "+/- H",
            Self::Latitude => "+/- Lat",
            Self::Longitude => "+/- Lon",
            Self::Rms => "RMS",
            Self::Phases => "Phase",
            Self::AzimuthalGap => "Az",
        }
    }
}

/// Weight coefficients for the six ranking criteria.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    /// Weight of the origin-time offset.
    pub origin_time: f64,
    /// Weight of the latitude offset.
    pub latitude: f64,
    /// Weight of the longitude offset.
    pub longitude: f64,
    /// Weight of the RMS residual.
    pub rms: f64,
    /// Weight of the inverse phase count.
    pub phases: f64,
    /// Weight of the azimuthal gap.
    pub azimuthal_gap: f64,
}

impl RankingWeights {
    /// Creates weights from an array in [`Criterion::ALL`] order.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::config::RankingWeights;
    ///
    /// let weights = RankingWeights::from_array([2.0, 1.0, 1.0, 1.0, 1.0, 0.0]);
    /// assert_eq!(weights.origin_time, 2.0);
    /// assert_eq!(weights.azimuthal_gap, 0.0);
    /// ```
    #[must_use]
    pub const fn from_array(values: [f64; 6]) -> Self {
        Self {
            origin_time: values[0],
            latitude: values[1],
            longitude: values[2],
            rms: values[3],
            phases: values[4],
            azimuthal_gap: values[5],
        }
    }

    /// Returns the weights in [`Criterion::ALL`] order.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 6] {
        [
            self.origin_time,
            self.latitude,
            self.longitude,
            self.rms,
            self.phases,
            self.azimuthal_gap,
        ]
    }

    /// Returns the weight of a single criterion.
    #[must_use]
    pub const fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::OriginTime => self.origin_time,
            Criterion::Latitude => self.latitude,
            Criterion::Longitude => self.longitude,
            Criterion::Rms => self.rms,
            Criterion::Phases => self.phases,
            Criterion::AzimuthalGap => self.azimuthal_gap,
        }
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Validates the weights.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Any weight is negative or not finite
    /// - All weights are zero
    pub fn validate(&self) -> Result<(), String> {
        for criterion in Criterion::ALL {
            let weight = self.get(criterion);
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!(
                    "Weight for '{}' must be a finite non-negative number",
                    criterion.column()
                ));
            }
        }
        if self.total() <= 0.0 {
            return Err("At least one ranking weight must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for RankingWeights {
    /// Equal weight on every criterion.
    fn default() -> Self {
        Self::from_array([1.0; 6])
    }
}

impl FromStr for RankingWeights {
    type Err = String;

    /// Parses six comma-separated weights, e.g. `"1,1,1,2,1,0.5"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|e| format!("Invalid weight '{}': {e}", part.trim()))
            })
            .collect::<Result<Vec<f64>, String>>()?;

        let values: [f64; 6] = values
            .try_into()
            .map_err(|v: Vec<f64>| format!("Expected 6 weights, got {}", v.len()))?;

        let weights = Self::from_array(values);
        weights.validate()?;
        Ok(weights)
    }
}
