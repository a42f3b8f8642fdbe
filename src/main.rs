use anyhow::{Context, Result};
use aquanexus::aggregator::{AggregationStats, GroupBy};
use aquanexus::alerts::AlertEngine;
use aquanexus::config::Config;
use aquanexus::error::ConfigError;
use aquanexus::events::{Category, Node, StatusValue};
use aquanexus::generator::TelemetryGenerator;
use aquanexus::scheduler::{SimulationScheduler, StopHandle};
use aquanexus::status::StatusClassifier;
use aquanexus::store::{HttpIngestClient, InMemoryStore, NodeDirectory};
use chrono::Utc;
use clap::Parser;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line arguments for the telemetry simulator
#[derive(Parser, Debug)]
#[command(
    name = "aquanexus",
    about = "Aqua Nexus - context-aware water telemetry simulator",
    long_about = "Generates synthetic telemetry for urban, industrial and rural water nodes \
                  and submits it to an ingestion API at a fixed interval. Use '--url memory' \
                  to run against an in-process store and log the resulting alerts and stats."
)]
struct Cli {
    /// Ingestion API base URL, or "memory"
    #[arg(short, long, value_name = "URL")]
    url: Option<String>,

    /// Seconds between cycles
    #[arg(short, long, value_name = "SECONDS")]
    interval: Option<u64>,

    /// Number of cycles to run (default: until interrupted)
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,

    /// Seed for reproducible telemetry
    #[arg(long)]
    seed: Option<u64>,

    /// Only simulate nodes of this category
    #[arg(long, value_name = "CATEGORY")]
    node_type: Option<Category>,

    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,
}

impl Cli {
    /// Reject flag values that could never drive a run
    ///
    /// Config-file problems are reported later by [`load_config`].
    fn validate(&self) -> Result<(), String> {
        if let Some(path) = self.config.as_deref().filter(|p| p.exists()) {
            if !path.is_file() {
                return Err(format!("--config {} is not a file", path.display()));
            }
        }
        if self.interval == Some(0) {
            return Err("--interval must be at least 1 second".to_string());
        }
        if self.cycles == Some(0) {
            return Err("--cycles must be at least 1".to_string());
        }
        if let Some(url) = self.url.as_deref().filter(|u| u.trim().is_empty()) {
            return Err(format!("--url '{}' is empty", url));
        }
        Ok(())
    }

    /// Command-line flags take precedence over the config file
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.destination.endpoint = url.clone();
        }
        if let Some(interval) = self.interval {
            config.simulation.interval_seconds = interval;
        }
        if let Some(cycles) = self.cycles {
            config.simulation.cycles = Some(cycles);
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = Some(seed);
        }
    }
}

/// Load the config file, falling back to defaults only when it is absent
///
/// A file that exists but cannot be read, parsed or validated is an error.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        info!("No config file given, using defaults");
        return Ok(Config::default());
    };

    match Config::from_file(path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Err(ConfigError::NotFound(_)) => {
            warn!("{} not found, using defaults", path.display());
            Ok(Config::default())
        }
        Err(e) => Err(e).with_context(|| format!("Invalid config file {}", path.display())),
    }
}

/// Fleet used with the in-process store when no nodes are configured
fn demo_fleet() -> Vec<Node> {
    vec![
        Node::new(1, "Delhi - Connaught Place", Category::Urban, 28.6315, 77.2167)
            .with_district("New Delhi"),
        Node::new(2, "Gurgaon - Cyber City", Category::Urban, 28.4949, 77.0887)
            .with_district("Gurgaon"),
        Node::new(3, "Delhi - Okhla Phase II", Category::Industrial, 28.5355, 77.2739)
            .with_facility_type("textile"),
        Node::new(4, "Gurgaon - Manesar", Category::Industrial, 28.3540, 76.9370)
            .with_facility_type("pharma"),
        Node::new(5, "Delhi - Najafgarh", Category::Rural, 28.6090, 76.9855)
            .with_district("South West Delhi"),
        Node::new(6, "Gurgaon - Sohna", Category::Rural, 28.2477, 77.0657)
            .with_district("South Haryana"),
    ]
}

fn filter_nodes(nodes: Vec<Node>, category: Option<Category>) -> Vec<Node> {
    nodes
        .into_iter()
        .filter(|n| category.map_or(true, |c| n.category == c))
        .collect()
}

fn install_stop_handler(handle: StopHandle) -> Result<()> {
    ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), stopping after the current cycle...");
        handle.stop();
    })
    .context("Error setting SIGINT handler for graceful shutdown")
}

/// Log alerts and rollups for everything recorded in the in-process store
fn log_store_summary(store: &InMemoryStore, classifier: StatusClassifier) {
    let snapshots = store.snapshots();
    let now = Utc::now();

    let report = AlertEngine::new(classifier).report(&snapshots, None, now);
    info!(
        "{} alerts across {} nodes ({} violations)",
        report.alerts.len(),
        report.nodes_affected,
        report.total_violations
    );
    for alert in &report.alerts {
        info!(
            "[{:?}] {}: {} ({} vs {})",
            alert.severity, alert.title, alert.message, alert.value_display, alert.threshold_display
        );
    }

    let aggregation = AggregationStats::new(classifier);
    let stats = aggregation.aggregate(&snapshots, Some(GroupBy::Category), now);
    info!(
        "Fleet status: {} nodes, normal={}, warning={}, critical={}, offline={}",
        stats.overall.total,
        stats.overall.status_count(StatusValue::Normal),
        stats.overall.status_count(StatusValue::Warning),
        stats.overall.status_count(StatusValue::Critical),
        stats.overall.status_count(StatusValue::Offline)
    );
    match serde_json::to_string_pretty(&stats) {
        Ok(json) => debug!("Stats: {}", json),
        Err(e) => warn!("Failed to serialize stats: {}", e),
    }

    let compliance = aggregation.compliance(&snapshots, now);
    if !compliance.facilities.is_empty() {
        info!(
            "Industrial compliance score {} ({} critical, {} warning, average pH {})",
            compliance.compliance_score,
            compliance.critical_violations,
            compliance.warning_violations,
            compliance
                .average_ph
                .map_or_else(|| "n/a".to_string(), |ph| format!("{:.2}", ph))
        );
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config
        .validate()
        .context("Invalid configuration after applying command-line flags")?;

    let classifier = StatusClassifier::new(config.staleness());
    let offset = config
        .utc_offset()
        .context("simulation.utc_offset_minutes out of range")?;
    let generator = match config.simulation.seed {
        Some(seed) => {
            info!("Using seed {}", seed);
            TelemetryGenerator::seeded(seed)
        }
        None => TelemetryGenerator::from_entropy(),
    }
    .with_local_offset(offset);

    if config.destination.is_memory() {
        let configured = if config.nodes.is_empty() {
            info!("No nodes configured, using the demo fleet");
            demo_fleet()
        } else {
            config.nodes.clone()
        };
        let nodes = filter_nodes(configured, cli.node_type);
        let store = Arc::new(InMemoryStore::with_nodes(classifier, nodes.clone()));

        let mut scheduler =
            SimulationScheduler::new(generator, store.clone(), config.scheduler_config());
        install_stop_handler(scheduler.stop_handle())?;
        scheduler.run(&nodes).await;
        scheduler.monitor().log_metrics();

        log_store_summary(&store, classifier);
    } else {
        let endpoint = config.destination.endpoint.clone();
        let client = Arc::new(
            HttpIngestClient::new(&endpoint, config.scheduler_config().submit_timeout)
                .context("Failed to create HTTP client")?,
        );

        let nodes = if config.nodes.is_empty() {
            info!("Fetching nodes from {}", endpoint);
            client
                .list_nodes(cli.node_type)
                .await
                .with_context(|| format!("Failed to fetch nodes from {}", endpoint))?
        } else {
            filter_nodes(config.nodes.clone(), cli.node_type)
        };
        info!("Loaded {} nodes", nodes.len());

        let mut scheduler =
            SimulationScheduler::new(generator, client.clone(), config.scheduler_config());
        install_stop_handler(scheduler.stop_handle())?;
        scheduler.run(&nodes).await;
        scheduler.monitor().log_metrics();
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting Aqua Nexus telemetry simulator");

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    info!("Simulator shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["aquanexus"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_cli_validation_with_existing_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[simulation]\ninterval_seconds = 2").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        assert!(cli(&["--config", &path]).validate().is_ok());
        assert!(load_config(Some(file.path())).is_ok());
    }

    #[test]
    fn test_cli_validation_with_missing_file() {
        // Missing files are handled gracefully
        assert!(cli(&["--config", "/nonexistent/config.toml"]).validate().is_ok());
    }

    #[test]
    fn test_cli_validation_with_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap().to_string();
        assert!(cli(&["--config", &path]).validate().is_err());
    }

    #[test]
    fn test_cli_validation_rejects_zero_interval_and_cycles() {
        assert!(cli(&["--interval", "0"]).validate().is_err());
        assert!(cli(&["--cycles", "0"]).validate().is_err());
        assert!(cli(&["--interval", "2", "--cycles", "3"]).validate().is_ok());
    }

    #[test]
    fn test_cli_validation_rejects_blank_url() {
        assert!(cli(&["--url", " "]).validate().is_err());
        assert!(cli(&["--url", "memory"]).validate().is_ok());
    }

    #[test]
    fn test_node_type_parsing() {
        assert_eq!(cli(&["--node-type", "Rural"]).node_type, Some(Category::Rural));
        assert!(Cli::try_parse_from(["aquanexus", "--node-type", "coastal"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::from_toml_str(
            "[simulation]\ninterval_seconds = 10\nseed = 1\n[destination]\nendpoint = \"http://api:8000\"",
        )
        .unwrap();

        cli(&["--url", "memory", "--cycles", "3", "--seed", "9"]).apply_overrides(&mut config);

        assert!(config.destination.is_memory());
        assert_eq!(config.simulation.interval_seconds, 10);
        assert_eq!(config.simulation.cycles, Some(3));
        assert_eq!(config.simulation.seed, Some(9));
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert_eq!(load_config(Some(&missing)).unwrap(), Config::default());
        assert_eq!(load_config(None).unwrap(), Config::default());
    }

    #[test]
    fn test_load_config_rejects_invalid_file() {
        let cases = [
            "[simulation]\ninterval_seconds = 0",
            "[simulation]\ncycles = 0",
            "[destination]\nendpoint = \"not a url\"",
            "[[nodes]]\nid = 1\nname = \"A\"\nnode_type = \"rural\"\nlatitude = 1.0\nlongitude = 1.0\n\
             [[nodes]]\nid = 1\nname = \"B\"\nnode_type = \"rural\"\nlatitude = 2.0\nlongitude = 2.0",
            "[simulation",
        ];
        for text in cases {
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "{}", text).unwrap();
            let err = load_config(Some(file.path())).unwrap_err();
            assert!(
                format!("{:#}", err).contains("Invalid config file"),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_demo_fleet_is_a_valid_config() {
        let config = Config {
            nodes: demo_fleet(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        for category in Category::ALL {
            assert!(config.nodes.iter().any(|n| n.category == category));
        }
        assert_eq!(filter_nodes(demo_fleet(), Some(Category::Rural)).len(), 2);
    }
}
