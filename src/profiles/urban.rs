//! Urban distribution network profile
//!
//! Demand follows the daily cycle: flow is high during the morning and
//! evening peaks and low otherwise. Pressure is stable around 65 PSI with
//! occasional leak-induced drops.

use super::{AnomalySpec, ContextProfile, ValueRange};
use crate::events::{Category, Field};

const FIELDS: [Field; 5] = [
    Field::FlowRate,
    Field::Pressure,
    Field::PhLevel,
    Field::Temperature,
    Field::Turbidity,
];

const PEAK_FLOW: ValueRange = ValueRange::new(40.0, 60.0);
const OFF_PEAK_FLOW: ValueRange = ValueRange::new(15.0, 25.0);

/// Profile for urban distribution nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct UrbanProfile;

impl UrbanProfile {
    /// Peak demand windows: 06:00-09:00 and 17:00-20:00
    pub fn is_peak_hour(hour: u32) -> bool {
        (6..9).contains(&hour) || (17..20).contains(&hour)
    }
}

impl ContextProfile for UrbanProfile {
    fn category(&self) -> Category {
        Category::Urban
    }

    fn fields(&self) -> &'static [Field] {
        &FIELDS
    }

    fn range_for(&self, field: Field, hour: u32) -> Option<ValueRange> {
        match field {
            Field::FlowRate if Self::is_peak_hour(hour) => Some(PEAK_FLOW),
            Field::FlowRate => Some(OFF_PEAK_FLOW),
            Field::Pressure => Some(ValueRange::new(60.0, 70.0)),
            Field::PhLevel => Some(ValueRange::new(7.0, 7.5)),
            Field::Temperature => Some(ValueRange::new(20.0, 23.0)),
            Field::Turbidity => Some(ValueRange::new(2.0, 5.0)),
            _ => None,
        }
    }

    fn anomaly_for(&self, field: Field) -> Option<AnomalySpec> {
        match field {
            Field::Pressure => Some(AnomalySpec {
                probability: 0.05,
                range: ValueRange::new(20.0, 35.0),
                label: "leak",
            }),
            Field::FlowRate => Some(AnomalySpec {
                probability: 0.05,
                range: ValueRange::new(5.0, 15.0),
                label: "flow_drop",
            }),
            _ => None,
        }
    }
}
