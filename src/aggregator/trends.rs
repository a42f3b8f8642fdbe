//! Monthly trend series over historical readings

use crate::events::{Field, TelemetryReading};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean of one field over one calendar month (UTC)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendPoint {
    /// `YYYY-MM`
    pub month: String,
    pub mean: f64,
    pub samples: usize,
}

/// Group readings by calendar month and average `field`
///
/// Readings without a finite value for `field` are ignored; months with no
/// samples are omitted. Points are ordered by month ascending.
pub fn monthly_trend(readings: &[TelemetryReading], field: Field) -> Vec<TrendPoint> {
    let mut months: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();

    for reading in readings {
        let value = match reading.get(field) {
            Some(v) if v.is_finite() => v,
            _ => continue,
        };
        let key = (reading.timestamp.year(), reading.timestamp.month());
        let entry = months.entry(key).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    months
        .into_iter()
        .map(|((year, month), (sum, samples))| TrendPoint {
            month: format!("{:04}-{:02}", year, month),
            mean: sum / samples as f64,
            samples,
        })
        .collect()
}
