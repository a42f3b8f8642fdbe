/// Error types for the telemetry core
pub mod error;

/// Core domain types: nodes, readings, statuses
pub mod events;

/// Per-category context profiles
pub mod profiles;

/// Context-aware synthetic telemetry generation
pub mod generator;

/// Status classification and the shared threshold table
pub mod status;

/// Alert derivation
pub mod alerts;

/// Rollups, compliance and trends
pub mod aggregator;

/// Ingestion sink, node directory and reading store interfaces
pub mod store;

/// Periodic simulation driver
pub mod scheduler;

/// Run-level simulation monitoring
pub mod monitoring;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use error::{ClassificationError, ConfigError, DirectoryError, GenerationError, SubmissionError};
pub use events::{Category, Field, Node, NodeSnapshot, Severity, StatusValue, TelemetryReading};
