//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{anyhow, Context, Result};
use shared::config::{DashboardConfig, FeedConfig, RankingWeights};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Default interval between liveness checks, in seconds.
pub const DEFAULT_LIVENESS_INTERVAL_SECS: u64 = 5;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" | "" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(anyhow!("Unknown log format '{other}' (expected 'pretty' or 'json')")),
        }
    }
}

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `QUAKEBOARD_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `QUAKEBOARD_PORT`: The port to listen on (default: 8080)
/// - `QUAKEBOARD_FEED_CAPACITY`: Entries kept per feed channel (default: 5)
/// - `QUAKEBOARD_STALENESS_SECS`: Staleness horizon in seconds (default: 60)
/// - `QUAKEBOARD_AUTO_WATCH`: Watch events on their first metric (default: true)
/// - `QUAKEBOARD_NOTIFY_CAPACITY`: Change-notification buffer (default: 64)
/// - `QUAKEBOARD_RANKING_WEIGHTS`: Six comma-separated weights (default: "1,1,1,1,1,1")
/// - `QUAKEBOARD_LIVENESS_INTERVAL_SECS`: Liveness check interval (default: 5)
/// - `QUAKEBOARD_LOG_FORMAT`: "pretty" or "json" (default: "pretty")
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Dashboard core settings.
    pub dashboard: DashboardConfig,
    /// How often feed liveness is checked.
    pub liveness_interval: Duration,
    /// Log output format.
    pub log_format: LogFormat,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_var(name)
        .map(|v| v.trim().parse::<T>())
        .transpose()
        .with_context(|| format!("Invalid value for {name}"))
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Any variable is set but cannot be parsed
    /// - The resulting dashboard configuration is invalid
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let host = env_var("QUAKEBOARD_HOST").unwrap_or(defaults.host);
        let port = parse_env::<u16>("QUAKEBOARD_PORT")?.unwrap_or(defaults.port);

        let feeds = FeedConfig::new(
            parse_env("QUAKEBOARD_FEED_CAPACITY")?.unwrap_or(defaults.dashboard.feeds.capacity),
            parse_env("QUAKEBOARD_STALENESS_SECS")?
                .unwrap_or(defaults.dashboard.feeds.staleness_secs),
        );

        let weights = env_var("QUAKEBOARD_RANKING_WEIGHTS")
            .map(|v| v.parse::<RankingWeights>())
            .transpose()
            .map_err(|e| anyhow!("Invalid value for QUAKEBOARD_RANKING_WEIGHTS: {e}"))?
            .unwrap_or(defaults.dashboard.weights);

        let dashboard = DashboardConfig {
            weights,
            feeds,
            auto_watch: parse_env("QUAKEBOARD_AUTO_WATCH")?
                .unwrap_or(defaults.dashboard.auto_watch),
            notify_capacity: parse_env("QUAKEBOARD_NOTIFY_CAPACITY")?
                .unwrap_or(defaults.dashboard.notify_capacity),
        };
        dashboard.validate().map_err(|e| anyhow!(e))?;

        let liveness_interval = Duration::from_secs(
            parse_env("QUAKEBOARD_LIVENESS_INTERVAL_SECS")?
                .unwrap_or(DEFAULT_LIVENESS_INTERVAL_SECS)
                .max(1),
        );

        let log_format = env_var("QUAKEBOARD_LOG_FORMAT")
            .map(|v| v.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            dashboard,
            liveness_interval,
            log_format,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port combination is not a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            dashboard: DashboardConfig::default(),
            liveness_interval: Duration::from_secs(DEFAULT_LIVENESS_INTERVAL_SECS),
            log_format: LogFormat::default(),
        }
    }
}
