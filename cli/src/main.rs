//! Quakeboard CLI
//!
//! Command-line interface for ranking station measurements offline and
//! classifying magnitudes, using the same core as the Quakeboard server.
//!
//! # Usage
//!
//! ```bash
//! quakeboard --help
//! quakeboard rank --file metrics.json --pin "PGR II"
//! quakeboard rank --file metrics.json --json
//! quakeboard classify 5.2
//! ```

#![deny(unsafe_code)]

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use shared::config::{Criterion, RankingWeights};
use shared::models::{EventRanking, RawStationMeasurement, SeverityTier};
use shared::ranking::{criterion_rank, select_station};
use shared::storage::{InMemoryMetricStore, MetricStore};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Quakeboard CLI - Seismic station ranking and magnitude classification
#[derive(Parser)]
#[command(name = "quakeboard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank station measurements per event and print the WEIGHTING table
    Rank {
        /// JSON file holding one measurement or an array of measurements
        #[arg(short, long)]
        file: PathBuf,

        /// Station to highlight instead of rank 1
        #[arg(short, long)]
        pin: Option<String>,

        /// Ranking weights, six comma-separated values
        #[arg(
            short,
            long,
            env = "QUAKEBOARD_RANKING_WEIGHTS",
            default_value = "1,1,1,1,1,1"
        )]
        weights: RankingWeights,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the severity tier of a magnitude
    Classify {
        /// Event magnitude
        #[arg(allow_negative_numbers = true)]
        magnitude: f64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// A measurement file holds a single measurement or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum MeasurementFile {
    Single(RawStationMeasurement),
    Batch(Vec<RawStationMeasurement>),
}

/// Result of `classify`.
#[derive(Debug, Serialize)]
struct Classification {
    magnitude: f64,
    tier: SeverityTier,
    color: &'static str,
}

fn load_measurements(path: &Path) -> anyhow::Result<Vec<RawStationMeasurement>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: MeasurementFile = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(match file {
        MeasurementFile::Single(m) => vec![m],
        MeasurementFile::Batch(m) => m,
    })
}

/// Normalizes the measurements and ranks every event they mention.
///
/// A row replaces an earlier row for the same station only when its
/// `observed_at` is newer. Rows without one are stamped with `received_at`,
/// so among those the first row wins. The `selected` station honors `pin`.
fn rank_events(
    measurements: Vec<RawStationMeasurement>,
    weights: RankingWeights,
    pin: Option<&str>,
    received_at: DateTime<Utc>,
) -> anyhow::Result<Vec<EventRanking>> {
    let store = InMemoryMetricStore::with_weights(weights);

    for (index, raw) in measurements.into_iter().enumerate() {
        let metric = raw
            .normalize(received_at)
            .with_context(|| format!("Measurement #{index} is invalid"))?;
        store.submit(metric)?;
    }

    let mut rankings = Vec::new();
    for event_id in store.event_ids()? {
        let mut ranking = EventRanking::new(event_id.clone(), store.ranking(&event_id)?);
        ranking.selected = select_station(&ranking.stations, pin).map(|s| s.station_id.clone());
        tracing::debug!(%event_id, stations = ranking.stations.len(), "Event ranked");
        rankings.push(ranking);
    }
    Ok(rankings)
}

fn render_table(ranking: &EventRanking) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "WEIGHTING  {}", ranking.event_id);

    let _ = write!(out, "  {:<10}", "SITE");
    for criterion in Criterion::ALL {
        let _ = write!(out, "{:>9}", criterion.column());
    }
    let _ = writeln!(out, "{:>6}{:>8}", "Rank", "Score");

    for station in &ranking.stations {
        let marker = if ranking.selected.as_deref() == Some(station.station_id.as_str()) {
            '*'
        } else {
            ' '
        };
        let _ = write!(out, "{marker} {:<10}", station.station_id);
        for criterion in Criterion::ALL {
            let _ = write!(out, "{:>9}", criterion_rank(station, criterion));
        }
        let _ = writeln!(out, "{:>6}{:>8.3}", station.rank, station.score);
    }

    if ranking.stations.is_empty() {
        let _ = writeln!(out, "  (no stations)");
    }
    out
}

fn classify(magnitude: f64) -> anyhow::Result<Classification> {
    if !magnitude.is_finite() {
        bail!("Magnitude must be a finite number");
    }
    let tier = SeverityTier::classify(magnitude);
    Ok(Classification {
        magnitude,
        tier,
        color: tier.color(),
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Rank {
            file,
            pin,
            weights,
            json,
        }) => {
            let measurements = load_measurements(&file)?;
            let rankings = rank_events(measurements, weights, pin.as_deref(), Utc::now())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&rankings)?);
            } else if rankings.is_empty() {
                println!("No measurements in {}", file.display());
            } else {
                for ranking in &rankings {
                    println!("{}", render_table(ranking));
                }
            }
        }
        Some(Commands::Classify { magnitude, json }) => {
            let classification = classify(magnitude)?;
            if json {
                println!("{}", serde_json::to_string(&classification)?);
            } else {
                println!(
                    "M{:.1} -> {} ({})",
                    classification.magnitude, classification.tier, classification.color
                );
            }
        }
        None => {
            println!("Quakeboard CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
