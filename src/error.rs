use crate::events::{Category, Field, NodeId};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while generating a synthetic reading
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("No context profile registered for category: {0}")]
    MissingProfile(Category),

    #[error("Profile for {category} defines no range for {field}")]
    MissingRange { category: Category, field: Field },

    #[error("Invalid range for {field}: [{min}, {max}]")]
    InvalidRange { field: Field, min: f64, max: f64 },

    #[error("Invalid anomaly specification for {0}")]
    InvalidAnomaly(Field),
}

/// Errors that can occur when handing a reading to the ingestion sink
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Ingestion rejected reading: {0}")]
    Rejected(String),

    #[error("Submission timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Submission task failed: {0}")]
    TaskFailed(String),
}

/// Reasons a reading cannot be classified
///
/// These never escape the classifier: any of them maps to `offline`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("No reading available")]
    MissingReading,

    #[error("Reading is older than {max_age_hours}h")]
    Stale { max_age_hours: i64 },

    #[error("Reading category {found} does not match node category {expected}")]
    CategoryMismatch { expected: Category, found: Category },

    #[error("Required field missing: {0}")]
    MissingField(Field),

    #[error("Field {0} is not a finite number")]
    NonFiniteValue(Field),
}

/// Errors that can occur when listing nodes from a directory
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Node directory returned error: {0}")]
    Rejected(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Problems with the TOML configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("destination.endpoint '{endpoint}' is not usable: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Node {0} is listed more than once")]
    DuplicateNode(NodeId),

    #[error("Node {0} has coordinates outside the valid range")]
    InvalidCoordinates(NodeId),
}
