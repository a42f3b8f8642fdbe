//! Industrial effluent profile
//!
//! Process flow is stable and pressurised; the notable behaviour is an
//! occasional contamination event pushing pH to 11.

use super::{AnomalySpec, ContextProfile, ValueRange};
use crate::events::{Category, Field};

const FIELDS: [Field; 5] = [
    Field::FlowRate,
    Field::Pressure,
    Field::PhLevel,
    Field::Temperature,
    Field::Turbidity,
];

/// pH reported during a contamination spike
pub const CONTAMINATION_PH: f64 = 11.0;

/// Profile for industrial effluent nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct IndustrialProfile;

impl ContextProfile for IndustrialProfile {
    fn category(&self) -> Category {
        Category::Industrial
    }

    fn fields(&self) -> &'static [Field] {
        &FIELDS
    }

    fn range_for(&self, field: Field, _hour: u32) -> Option<ValueRange> {
        match field {
            Field::FlowRate => Some(ValueRange::new(95.0, 105.0)),
            Field::Pressure => Some(ValueRange::new(80.0, 90.0)),
            Field::PhLevel => Some(ValueRange::new(6.5, 8.5)),
            Field::Temperature => Some(ValueRange::new(35.0, 45.0)),
            Field::Turbidity => Some(ValueRange::new(10.0, 20.0)),
            _ => None,
        }
    }

    fn anomaly_for(&self, field: Field) -> Option<AnomalySpec> {
        match field {
            Field::PhLevel => Some(AnomalySpec {
                probability: 0.10,
                range: ValueRange::fixed(CONTAMINATION_PH),
                label: "contamination_spike",
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_ignore_hour() {
        let profile = IndustrialProfile;
        for field in FIELDS {
            assert_eq!(profile.range_for(field, 0), profile.range_for(field, 18));
        }
    }

    #[test]
    fn test_contamination_spike_is_fixed_value() {
        let spike = IndustrialProfile.anomaly_for(Field::PhLevel).unwrap();
        assert_eq!(spike.range.min, CONTAMINATION_PH);
        assert_eq!(spike.range.max, CONTAMINATION_PH);
        assert_eq!(spike.probability, 0.10);
    }
}
