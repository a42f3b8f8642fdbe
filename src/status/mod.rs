/// Status classification
pub mod classifier;

/// Threshold table shared with the alert engine
pub mod thresholds;

pub use classifier::{StatusClassifier, DEFAULT_STALENESS_HOURS};
pub use thresholds::{evaluate, rules_for, Breach, Comparison, ThresholdRule};
