/// Alert derivation from latest telemetry
pub mod alert_engine;

pub use alert_engine::{Advisory, AdvisoryRule, AlertEngine, AlertRecord, AlertReport};
