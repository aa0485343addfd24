use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section falls back to its `Default`, so a missing `config.toml` still
/// yields a runnable service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub database: Database,
    pub log: Log,
    pub analytics: Analytics,
}

/// Where the HTTP service listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

/// Connection pool sizing. The connection string itself comes from `DATABASE_URL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, a daily rolling log file is written here as well as to stdout.
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Analytics {
    pub thresholds: Thresholds,
    pub lookback: Lookback,
}

/// Business-rule constants for the health and anomaly calculations.
///
/// These values are empirical. They are kept configurable rather than derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// A reading is anomalous when `|z| > z_score`.
    pub z_score: f64,
    /// Multiplier mapping the stddev slope onto the 0-100 health scale.
    pub health_scale: f64,
    /// Health strictly below this is high urgency.
    pub high_urgency_below: f64,
    /// Health strictly below this (and not high) is medium urgency.
    pub medium_urgency_below: f64,
    /// A healthy loom with a slope strictly above this gets the preventive-maintenance advice.
    pub rising_trend_above: f64,
}

/// How far back each computation looks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lookback {
    pub anomaly_hours: i64,
    pub maintenance_days: i64,
    pub summary_hours: i64,
}

// --- Default Implementations ---

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            z_score: 3.0,
            health_scale: 10_000.0,
            high_urgency_below: 50.0,
            medium_urgency_below: 70.0,
            rising_trend_above: 0.001,
        }
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Self {
            anomaly_hours: 24,
            maintenance_days: 30,
            summary_hours: 24,
        }
    }
}

impl Server {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server address: {e}")))
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("z_score", self.z_score),
            ("health_scale", self.health_scale),
            ("high_urgency_below", self.high_urgency_below),
            ("medium_urgency_below", self.medium_urgency_below),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "thresholds.{name} must be a positive number, got {value}"
                )));
            }
        }
        if !self.rising_trend_above.is_finite() || self.rising_trend_above < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "thresholds.rising_trend_above must be non-negative, got {}",
                self.rising_trend_above
            )));
        }
        if self.high_urgency_below >= self.medium_urgency_below || self.medium_urgency_below > 100.0 {
            return Err(ConfigError::Invalid(format!(
                "expected high_urgency_below < medium_urgency_below <= 100, got {} and {}",
                self.high_urgency_below, self.medium_urgency_below
            )));
        }
        Ok(())
    }
}

impl Lookback {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("anomaly_hours", self.anomaly_hours),
            ("maintenance_days", self.maintenance_days),
            ("summary_hours", self.summary_hours),
        ] {
            if value <= 0 {
                return Err(ConfigError::Invalid(format!(
                    "lookback.{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analytics.thresholds.validate()?;
        self.analytics.lookback.validate()?;
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        self.server.socket_addr()?;
        Ok(())
    }
}
