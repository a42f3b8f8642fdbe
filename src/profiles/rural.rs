//! Rural groundwater profile
//!
//! Groundwater changes slowly, so aquifer depth and recharge rate are modelled
//! as bounded random walks rather than independent draws. The water table is
//! derived from the aquifer depth.

use super::{AnomalySpec, ContextProfile, Sampling, ValueRange};
use crate::events::{Category, Field};

const FIELDS: [Field; 4] = [
    Field::AquiferDepth,
    Field::WaterTable,
    Field::RechargeRate,
    Field::Pressure,
];

const AQUIFER_BOUNDS: ValueRange = ValueRange::new(40.0, 100.0);
const AQUIFER_START: ValueRange = ValueRange::new(70.0, 95.0);
const AQUIFER_STEP_M: f64 = 0.5;

const WATER_TABLE_FACTOR: f64 = 0.25;
const WATER_TABLE_NOISE_M: f64 = 0.5;

const RECHARGE_BOUNDS: ValueRange = ValueRange::new(8.0, 16.0);
const RECHARGE_STEP: f64 = 0.25;

/// Profile for rural groundwater stations
#[derive(Debug, Clone, Copy, Default)]
pub struct RuralProfile;

impl ContextProfile for RuralProfile {
    fn category(&self) -> Category {
        Category::Rural
    }

    fn fields(&self) -> &'static [Field] {
        &FIELDS
    }

    fn range_for(&self, field: Field, _hour: u32) -> Option<ValueRange> {
        match field {
            Field::AquiferDepth => Some(AQUIFER_BOUNDS),
            Field::WaterTable => Some(ValueRange::new(
                AQUIFER_BOUNDS.min * WATER_TABLE_FACTOR - WATER_TABLE_NOISE_M,
                AQUIFER_BOUNDS.max * WATER_TABLE_FACTOR + WATER_TABLE_NOISE_M,
            )),
            Field::RechargeRate => Some(RECHARGE_BOUNDS),
            // pressure tank system
            Field::Pressure => Some(ValueRange::new(40.0, 50.0)),
            _ => None,
        }
    }

    fn anomaly_for(&self, field: Field) -> Option<AnomalySpec> {
        match field {
            Field::RechargeRate => Some(AnomalySpec {
                probability: 0.10,
                range: ValueRange::new(2.0, 4.0),
                label: "recharge_drop",
            }),
            _ => None,
        }
    }

    fn sampling(&self, field: Field) -> Sampling {
        match field {
            Field::AquiferDepth => Sampling::RandomWalk {
                start: AQUIFER_START,
                step: AQUIFER_STEP_M,
            },
            Field::RechargeRate => Sampling::RandomWalk {
                start: RECHARGE_BOUNDS,
                step: RECHARGE_STEP,
            },
            Field::WaterTable => Sampling::Derived {
                source: Field::AquiferDepth,
                factor: WATER_TABLE_FACTOR,
                noise: WATER_TABLE_NOISE_M,
            },
            _ => Sampling::Uniform,
        }
    }
}
