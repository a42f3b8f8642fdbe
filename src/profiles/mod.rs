//! Context profiles describing how each node category behaves
//!
//! A profile answers two questions for the generator: which range a field's
//! baseline value is drawn from at a given hour, and which anomaly (if any)
//! may replace that draw. Each category lives in its own module behind the
//! common [`ContextProfile`] trait.

pub mod industrial;
pub mod rural;
pub mod urban;

pub use industrial::IndustrialProfile;
pub use rural::RuralProfile;
pub use urban::UrbanProfile;

use crate::events::{Category, Field};
use serde::{Deserialize, Serialize};

/// Closed interval a value is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Degenerate range that always yields `value`
    pub const fn fixed(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// `true` if the bounds are finite and ordered
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Replacement distribution used when an anomaly fires
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalySpec {
    /// Per-tick probability in [0, 1]
    pub probability: f64,
    pub range: ValueRange,
    /// Short label carried by the anomaly event, e.g. "leak"
    pub label: &'static str,
}

/// How a field's baseline value evolves from tick to tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampling {
    /// Independent uniform draw every tick
    Uniform,
    /// Bounded random walk; the first value is drawn from `start`
    RandomWalk { start: ValueRange, step: f64 },
    /// `source * factor` plus uniform noise in `[-noise, noise]`
    Derived {
        source: Field,
        factor: f64,
        noise: f64,
    },
}

/// Capability shared by every category profile
pub trait ContextProfile: Send + Sync {
    /// Category this profile describes
    fn category(&self) -> Category;

    /// Fields generated for this category, in generation order
    ///
    /// Derived fields must come after their source.
    fn fields(&self) -> &'static [Field];

    /// Baseline range for `field` at the given hour of day (0-23)
    fn range_for(&self, field: Field, hour: u32) -> Option<ValueRange>;

    /// Anomaly specification for `field`, if the field has one
    fn anomaly_for(&self, field: Field) -> Option<AnomalySpec>;

    /// Sampling model for `field`
    fn sampling(&self, _field: Field) -> Sampling {
        Sampling::Uniform
    }
}

static URBAN: UrbanProfile = UrbanProfile;
static INDUSTRIAL: IndustrialProfile = IndustrialProfile;
static RURAL: RuralProfile = RuralProfile;

/// Built-in profile for a category
pub fn profile_for(category: Category) -> &'static dyn ContextProfile {
    match category {
        Category::Urban => &URBAN,
        Category::Industrial => &INDUSTRIAL,
        Category::Rural => &RURAL,
    }
}
