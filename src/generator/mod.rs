/// Synthetic telemetry generation
pub mod telemetry_generator;

pub use telemetry_generator::{GeneratedReading, TelemetryGenerator};
