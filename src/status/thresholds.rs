//! Category-specific threshold table
//!
//! Both the status classifier and the alert engine evaluate readings against
//! this table, so a node's status and its alerts can never disagree. Rules for
//! the same field are listed most severe first; only the first matching rule
//! per field fires.

use crate::events::{Category, Field, Severity, TelemetryReading};
use serde::Serialize;

/// Comparison a rule applies to a field value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Comparison {
    /// Breached when the value is strictly below the limit
    Below(f64),
    /// Breached when the value is strictly above the limit
    Above(f64),
    /// Breached when the value leaves the closed band
    Outside { min: f64, max: f64 },
}

impl Comparison {
    pub fn is_breached(&self, value: f64) -> bool {
        match *self {
            Comparison::Below(limit) => value < limit,
            Comparison::Above(limit) => value > limit,
            Comparison::Outside { min, max } => value < min || value > max,
        }
    }

    /// The limit the value crossed
    pub fn limit_for(&self, value: f64) -> f64 {
        match *self {
            Comparison::Below(limit) | Comparison::Above(limit) => limit,
            Comparison::Outside { min, max } => {
                if value < min {
                    min
                } else {
                    max
                }
            }
        }
    }

    /// Human readable limit, e.g. "30 PSI" or "6.0-9.0"
    pub fn describe(&self, field: Field) -> String {
        let unit = field.unit();
        let text = match *self {
            Comparison::Below(limit) | Comparison::Above(limit) => format!("{}", limit),
            Comparison::Outside { min, max } => format!("{:.1}-{:.1}", min, max),
        };
        if unit.is_empty() {
            text
        } else {
            format!("{} {}", text, unit)
        }
    }
}

/// One row of the threshold table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdRule {
    /// Alert type, also used in alert identifiers
    pub kind: &'static str,
    pub field: Field,
    pub severity: Severity,
    pub comparison: Comparison,
    pub title: &'static str,
    /// Message stem; the alert engine appends the node name
    pub message: &'static str,
}

/// A rule that fired for a reading
#[derive(Debug, Clone, PartialEq)]
pub struct Breach {
    pub rule: &'static ThresholdRule,
    pub value: f64,
}

impl Breach {
    pub fn severity(&self) -> Severity {
        self.rule.severity
    }

    pub fn threshold(&self) -> f64 {
        self.rule.comparison.limit_for(self.value)
    }
}

const PRESSURE_CRITICAL: ThresholdRule = ThresholdRule {
    kind: "pressure",
    field: Field::Pressure,
    severity: Severity::Critical,
    comparison: Comparison::Below(30.0),
    title: "Low Pressure Detected",
    message: "Water pressure critically low",
};

const PRESSURE_WARNING: ThresholdRule = ThresholdRule {
    kind: "pressure",
    field: Field::Pressure,
    severity: Severity::Warning,
    comparison: Comparison::Below(40.0),
    title: "Pressure Dropping",
    message: "Water pressure below normal",
};

const PH_CRITICAL: ThresholdRule = ThresholdRule {
    kind: "ph",
    field: Field::PhLevel,
    severity: Severity::Critical,
    comparison: Comparison::Outside { min: 6.0, max: 9.0 },
    title: "pH Out of Range",
    message: "pH level critically out of range",
};

const PH_WARNING: ThresholdRule = ThresholdRule {
    kind: "ph",
    field: Field::PhLevel,
    severity: Severity::Warning,
    comparison: Comparison::Outside { min: 6.5, max: 8.5 },
    title: "pH Near Limits",
    message: "pH level approaching limits",
};

const LOW_FLOW: ThresholdRule = ThresholdRule {
    kind: "flow",
    field: Field::FlowRate,
    severity: Severity::Warning,
    comparison: Comparison::Below(10.0),
    title: "Low Flow Rate",
    message: "Flow rate below threshold",
};

const HIGH_TEMPERATURE: ThresholdRule = ThresholdRule {
    kind: "temperature",
    field: Field::Temperature,
    severity: Severity::Warning,
    comparison: Comparison::Above(45.0),
    title: "High Temperature",
    message: "Water temperature elevated",
};

const HIGH_TURBIDITY: ThresholdRule = ThresholdRule {
    kind: "turbidity",
    field: Field::Turbidity,
    severity: Severity::Warning,
    comparison: Comparison::Above(20.0),
    title: "High Turbidity",
    message: "Water turbidity elevated",
};

const AQUIFER_CRITICAL: ThresholdRule = ThresholdRule {
    kind: "aquifer",
    field: Field::AquiferDepth,
    severity: Severity::Critical,
    comparison: Comparison::Below(50.0),
    title: "Critical Aquifer Depletion",
    message: "Aquifer depth critically low",
};

const AQUIFER_WARNING: ThresholdRule = ThresholdRule {
    kind: "aquifer",
    field: Field::AquiferDepth,
    severity: Severity::Warning,
    comparison: Comparison::Below(65.0),
    title: "Aquifer Depth Dropping",
    message: "Aquifer depth below normal",
};

const LOW_RECHARGE: ThresholdRule = ThresholdRule {
    kind: "recharge",
    field: Field::RechargeRate,
    severity: Severity::Critical,
    comparison: Comparison::Below(5.0),
    title: "Low Recharge Rate",
    message: "Groundwater recharge critically low",
};

static URBAN_RULES: [ThresholdRule; 5] = [
    PRESSURE_CRITICAL,
    PRESSURE_WARNING,
    PH_CRITICAL,
    PH_WARNING,
    LOW_FLOW,
];

static INDUSTRIAL_RULES: [ThresholdRule; 7] = [
    PH_CRITICAL,
    PH_WARNING,
    PRESSURE_CRITICAL,
    PRESSURE_WARNING,
    HIGH_TEMPERATURE,
    HIGH_TURBIDITY,
    LOW_FLOW,
];

// Synthetic rural readings carry no flow, but metered boreholes do
static RURAL_RULES: [ThresholdRule; 6] = [
    AQUIFER_CRITICAL,
    AQUIFER_WARNING,
    LOW_RECHARGE,
    LOW_FLOW,
    PH_CRITICAL,
    PH_WARNING,
];

/// Threshold rules applying to a category, most severe first per field
pub fn rules_for(category: Category) -> &'static [ThresholdRule] {
    match category {
        Category::Urban => &URBAN_RULES,
        Category::Industrial => &INDUSTRIAL_RULES,
        Category::Rural => &RURAL_RULES,
    }
}

/// Evaluate a reading against its category's rules
///
/// Fields absent from the reading are skipped. At most one breach is
/// returned per field, in table order.
pub fn evaluate(category: Category, reading: &TelemetryReading) -> Vec<Breach> {
    let mut breaches: Vec<Breach> = Vec::new();

    for rule in rules_for(category) {
        if breaches.iter().any(|b| b.rule.field == rule.field) {
            continue;
        }
        if let Some(value) = reading.get(rule.field) {
            if rule.comparison.is_breached(value) {
                breaches.push(Breach { rule, value });
            }
        }
    }

    breaches
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(category: Category, values: &[(Field, f64)]) -> TelemetryReading {
        values
            .iter()
            .fold(TelemetryReading::new(1, category, Utc::now()), |r, (f, v)| {
                r.with(*f, *v)
            })
    }

    #[test]
    fn test_only_most_severe_rule_per_field() {
        let r = reading(Category::Urban, &[(Field::Pressure, 25.0)]);
        let breaches = evaluate(Category::Urban, &r);
        assert_eq!(breaches.len(), 1);
        assert_eq!(breaches[0].severity(), Severity::Critical);
        assert_eq!(breaches[0].threshold(), 30.0);
    }

    #[test]
    fn test_pressure_band_boundaries() {
        let at = |p| evaluate(Category::Urban, &reading(Category::Urban, &[(Field::Pressure, p)]));
        assert_eq!(at(29.99)[0].severity(), Severity::Critical);
        assert_eq!(at(30.0)[0].severity(), Severity::Warning);
        assert_eq!(at(39.99)[0].severity(), Severity::Warning);
        assert!(at(40.0).is_empty());
    }

    #[test]
    fn test_ph_band_boundaries() {
        let at = |ph| {
            evaluate(
                Category::Industrial,
                &reading(Category::Industrial, &[(Field::PhLevel, ph)]),
            )
        };
        assert!(at(6.5).is_empty());
        assert!(at(8.5).is_empty());
        assert_eq!(at(6.0)[0].severity(), Severity::Warning);
        assert_eq!(at(9.0)[0].severity(), Severity::Warning);
        assert_eq!(at(5.99)[0].severity(), Severity::Critical);
        assert_eq!(at(11.0)[0].severity(), Severity::Critical);
        assert_eq!(at(11.0)[0].threshold(), 9.0);
        assert_eq!(at(4.0)[0].threshold(), 6.0);
    }

    #[test]
    fn test_rules_are_category_specific() {
        // Industrial heat is not an urban concern
        let hot = reading(Category::Urban, &[(Field::Temperature, 60.0)]);
        assert!(evaluate(Category::Urban, &hot).is_empty());
        let hot = reading(Category::Industrial, &[(Field::Temperature, 60.0)]);
        assert_eq!(evaluate(Category::Industrial, &hot).len(), 1);

        // Rural pressure-tank readings are not judged against mains pressure
        let tank = reading(Category::Rural, &[(Field::Pressure, 20.0)]);
        assert!(evaluate(Category::Rural, &tank).is_empty());
    }

    #[test]
    fn test_rural_drought_rules() {
        let r = reading(
            Category::Rural,
            &[(Field::AquiferDepth, 55.0), (Field::RechargeRate, 3.0)],
        );
        let breaches = evaluate(Category::Rural, &r);
        let kinds: Vec<_> = breaches.iter().map(|b| (b.rule.kind, b.severity())).collect();
        assert_eq!(
            kinds,
            vec![("aquifer", Severity::Warning), ("recharge", Severity::Critical)]
        );
    }

    #[test]
    fn test_rural_low_flow_only_when_reported() {
        let metered = reading(
            Category::Rural,
            &[(Field::AquiferDepth, 82.0), (Field::FlowRate, 5.0)],
        );
        let breaches = evaluate(Category::Rural, &metered);
        assert_eq!(breaches.len(), 1);
        assert_eq!(breaches[0].rule.kind, "flow");
        assert_eq!(breaches[0].severity(), Severity::Warning);

        let unmetered = reading(Category::Rural, &[(Field::AquiferDepth, 82.0)]);
        assert!(evaluate(Category::Rural, &unmetered).is_empty());
    }

    #[test]
    fn test_describe_limits() {
        assert_eq!(PRESSURE_CRITICAL.comparison.describe(Field::Pressure), "30 PSI");
        assert_eq!(PH_CRITICAL.comparison.describe(Field::PhLevel), "6.0-9.0");
        assert_eq!(
            LOW_RECHARGE.comparison.describe(Field::RechargeRate),
            "5 mm/month"
        );
    }

    #[test]
    fn test_same_field_rules_are_ordered_by_severity() {
        for category in Category::ALL {
            let rules = rules_for(category);
            for (i, rule) in rules.iter().enumerate() {
                for later in &rules[i + 1..] {
                    if later.field == rule.field {
                        assert!(later.severity < rule.severity, "{} {}", category, rule.kind);
                    }
                }
            }
        }
    }
}
