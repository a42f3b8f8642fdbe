/// TOML configuration
#[allow(clippy::module_inception)]
pub mod config;

pub use config::{Config, DestinationConfig, SimulationConfig, StatusConfig, MEMORY_ENDPOINT};
