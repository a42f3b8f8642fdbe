use crate::error::ConfigError;
use crate::events::Node;
use crate::scheduler::SchedulerConfig;
use crate::status::DEFAULT_STALENESS_HOURS;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Endpoint value selecting the in-process store instead of HTTP
pub const MEMORY_ENDPOINT: &str = "memory";

/// Application configuration loaded from TOML
///
/// Every section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub destination: DestinationConfig,
    pub status: StatusConfig,
    /// Static fleet; when empty the node directory is queried instead
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub interval_seconds: u64,
    /// `None` runs until interrupted
    pub cycles: Option<u64>,
    /// `None` seeds from OS entropy
    pub seed: Option<u64>,
    pub submit_timeout_seconds: u64,
    /// Offset used to derive local hour of day for time-of-day profiles
    pub utc_offset_minutes: i32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 2,
            cycles: None,
            seed: None,
            submit_timeout_seconds: 5,
            utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// Base URL of the ingestion API, or `"memory"`
    pub endpoint: String,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
        }
    }
}

impl DestinationConfig {
    pub fn is_memory(&self) -> bool {
        self.endpoint.eq_ignore_ascii_case(MEMORY_ENDPOINT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub staleness_hours: i64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            staleness_hours: DEFAULT_STALENESS_HOURS,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// `ConfigError::NotFound` when the file does not exist, so callers can
    /// fall back to defaults; every other variant means the file is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot drive a simulation
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.interval_seconds == 0 {
            return Err(invalid("simulation.interval_seconds", "must be at least 1"));
        }
        if sim.submit_timeout_seconds == 0 {
            return Err(invalid("simulation.submit_timeout_seconds", "must be at least 1"));
        }
        if sim.cycles == Some(0) {
            return Err(invalid("simulation.cycles", "must be at least 1 when set"));
        }
        if self.utc_offset().is_none() {
            return Err(invalid(
                "simulation.utc_offset_minutes",
                format!("{} is outside +/-24h", sim.utc_offset_minutes),
            ));
        }
        if self.status.staleness_hours <= 0 {
            return Err(invalid("status.staleness_hours", "must be positive"));
        }

        if !self.destination.is_memory() {
            let endpoint = &self.destination.endpoint;
            let url = reqwest::Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidEndpoint {
                    endpoint: endpoint.clone(),
                    reason: format!("expected http(s) or '{}'", MEMORY_ENDPOINT),
                });
            }
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(ConfigError::DuplicateNode(node.id));
            }
            if !(-90.0..=90.0).contains(&node.location.latitude)
                || !(-180.0..=180.0).contains(&node.location.longitude)
            {
                return Err(ConfigError::InvalidCoordinates(node.id));
            }
        }

        Ok(())
    }

    /// Fixed offset for local hour derivation; `None` if out of range
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.simulation.utc_offset_minutes.checked_mul(60)?)
    }

    pub fn staleness(&self) -> chrono::Duration {
        chrono::Duration::hours(self.status.staleness_hours)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.simulation.interval_seconds),
            cycles: self.simulation.cycles,
            submit_timeout: Duration::from_secs(self.simulation.submit_timeout_seconds),
        }
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}
