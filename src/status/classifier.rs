use crate::error::ClassificationError;
use crate::events::{Category, NodeSnapshot, Severity, StatusValue, TelemetryReading, Timestamp};
use crate::status::thresholds::{self, Breach};
use chrono::Duration;

/// Default window after which a reading no longer describes the node
pub const DEFAULT_STALENESS_HOURS: i64 = 24;

/// Maps a node's latest reading to its operating status
///
/// Pure and total: every input yields a status, and anything that cannot be
/// judged (no reading, stale, wrong category, malformed) is `offline`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusClassifier {
    staleness: Duration,
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_STALENESS_HOURS))
    }
}

impl StatusClassifier {
    pub fn new(staleness: Duration) -> Self {
        Self { staleness }
    }

    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    /// Validate a reading for classification and return it
    pub fn check<'a>(
        &self,
        category: Category,
        reading: Option<&'a TelemetryReading>,
        now: Timestamp,
    ) -> Result<&'a TelemetryReading, ClassificationError> {
        let reading = reading.ok_or(ClassificationError::MissingReading)?;

        if reading.category != category {
            return Err(ClassificationError::CategoryMismatch {
                expected: category,
                found: reading.category,
            });
        }

        if now - reading.timestamp > self.staleness {
            return Err(ClassificationError::Stale {
                max_age_hours: self.staleness.num_hours(),
            });
        }

        for field in category.required_fields() {
            match reading.get(*field) {
                None => return Err(ClassificationError::MissingField(*field)),
                Some(v) if !v.is_finite() => {
                    return Err(ClassificationError::NonFiniteValue(*field))
                }
                Some(_) => {}
            }
        }

        // Optional fields are still judged by the threshold table
        if let Some((field, _)) = reading.values().find(|(_, v)| !v.is_finite()) {
            return Err(ClassificationError::NonFiniteValue(field));
        }

        Ok(reading)
    }

    /// Threshold breaches of a valid reading; empty if the reading fails [`check`](Self::check)
    pub fn breaches(
        &self,
        category: Category,
        reading: Option<&TelemetryReading>,
        now: Timestamp,
    ) -> Vec<Breach> {
        match self.check(category, reading, now) {
            Ok(reading) => thresholds::evaluate(category, reading),
            Err(_) => Vec::new(),
        }
    }

    pub fn classify(
        &self,
        category: Category,
        reading: Option<&TelemetryReading>,
        now: Timestamp,
    ) -> StatusValue {
        let reading = match self.check(category, reading, now) {
            Ok(reading) => reading,
            Err(_) => return StatusValue::Offline,
        };

        let worst = thresholds::evaluate(category, reading)
            .iter()
            .map(Breach::severity)
            .max();

        match worst {
            Some(Severity::Critical) => StatusValue::Critical,
            Some(Severity::Warning) => StatusValue::Warning,
            Some(Severity::Info) | None => StatusValue::Normal,
        }
    }

    pub fn classify_snapshot(&self, snapshot: &NodeSnapshot, now: Timestamp) -> StatusValue {
        self.classify(snapshot.node.category, snapshot.latest.as_ref(), now)
    }
}
