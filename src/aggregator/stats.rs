//! Fleet rollups over node snapshots
//!
//! Every rollup is recomputed from the snapshots it is given. Statuses come
//! from the [`StatusClassifier`], so counts here always match what the alert
//! engine reports for the same input.

use crate::events::{Category, Field, NodeSnapshot, Severity, StatusValue, Timestamp};
use crate::status::{self, StatusClassifier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Group label for nodes lacking the grouping attribute
pub const UNKNOWN_GROUP: &str = "unknown";

/// Node attribute used to break stats down
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    District,
    Facility,
    Category,
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GroupBy::District => "district",
            GroupBy::Facility => "facility",
            GroupBy::Category => "category",
        };
        f.write_str(s)
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "district" => Ok(GroupBy::District),
            "facility" | "facility_type" => Ok(GroupBy::Facility),
            "category" | "node_type" => Ok(GroupBy::Category),
            other => Err(format!("unknown grouping: {}", other)),
        }
    }
}

/// Mean, min and max of one field; all `None` when there is no data
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldSummary {
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    min: f64,
    max: f64,
    samples: usize,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        if self.samples == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.samples += 1;
    }

    fn summary(&self) -> FieldSummary {
        if self.samples == 0 {
            return FieldSummary::default();
        }
        FieldSummary {
            mean: Some(self.sum / self.samples as f64),
            min: Some(self.min),
            max: Some(self.max),
            samples: self.samples,
        }
    }
}

/// Counts and field summaries for a set of nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupStats {
    pub total: usize,
    /// Always carries all four statuses
    pub by_status: BTreeMap<StatusValue, usize>,
    /// Always carries every field
    pub fields: BTreeMap<Field, FieldSummary>,
}

impl GroupStats {
    fn from_snapshots<'a>(
        snapshots: impl Iterator<Item = &'a NodeSnapshot>,
        classifier: &StatusClassifier,
        now: Timestamp,
    ) -> Self {
        let mut by_status: BTreeMap<StatusValue, usize> =
            StatusValue::ALL.iter().map(|s| (*s, 0)).collect();
        let mut accumulators: BTreeMap<Field, Accumulator> =
            Field::ALL.iter().map(|f| (*f, Accumulator::default())).collect();
        let mut total = 0;

        for snapshot in snapshots {
            total += 1;
            *by_status
                .entry(classifier.classify_snapshot(snapshot, now))
                .or_insert(0) += 1;

            // Offline nodes count toward status totals but not field summaries
            if let Ok(reading) =
                classifier.check(snapshot.node.category, snapshot.latest.as_ref(), now)
            {
                for (field, value) in reading.values() {
                    accumulators.entry(field).or_default().push(value);
                }
            }
        }

        Self {
            total,
            by_status,
            fields: accumulators
                .into_iter()
                .map(|(field, acc)| (field, acc.summary()))
                .collect(),
        }
    }

    pub fn status_count(&self, status: StatusValue) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn field(&self, field: Field) -> FieldSummary {
        self.fields.get(&field).copied().unwrap_or_default()
    }
}

/// Result of [`AggregationStats::aggregate`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stats {
    #[serde(flatten)]
    pub overall: GroupStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<GroupBy>,
    /// Per-group breakdown, present only when a grouping was requested
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, GroupStats>,
    pub generated_at: Timestamp,
}

/// pH compliance of one industrial facility
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacilityCompliance {
    pub node_id: u64,
    pub name: String,
    pub facility_type: String,
    pub ph_level: Option<f64>,
    /// `offline` when the facility has no usable reading
    pub ph_status: StatusValue,
}

/// Industrial compliance rollup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceSummary {
    pub facilities: Vec<FacilityCompliance>,
    pub critical_violations: usize,
    pub warning_violations: usize,
    pub violations_by_type: BTreeMap<String, usize>,
    pub average_ph: Option<f64>,
    /// `100 - 10 * critical - 5 * warning`, clamped to [0, 100]
    pub compliance_score: u32,
    pub generated_at: Timestamp,
}

/// Rollups over node snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationStats {
    classifier: StatusClassifier,
}

impl AggregationStats {
    pub fn new(classifier: StatusClassifier) -> Self {
        Self { classifier }
    }

    /// Aggregate counts and field summaries
    ///
    /// # Arguments
    ///
    /// * `snapshots` - Nodes paired with their latest reading
    /// * `group_by` - Optional breakdown attribute
    /// * `now` - Reference time for status classification
    pub fn aggregate(
        &self,
        snapshots: &[NodeSnapshot],
        group_by: Option<GroupBy>,
        now: Timestamp,
    ) -> Stats {
        let overall = GroupStats::from_snapshots(snapshots.iter(), &self.classifier, now);

        let mut groups = BTreeMap::new();
        if let Some(group_by) = group_by {
            let mut members: BTreeMap<String, Vec<&NodeSnapshot>> = BTreeMap::new();
            for snapshot in snapshots {
                members
                    .entry(group_key(snapshot, group_by))
                    .or_default()
                    .push(snapshot);
            }
            for (key, nodes) in members {
                let stats = GroupStats::from_snapshots(nodes.into_iter(), &self.classifier, now);
                groups.insert(key, stats);
            }
        }

        Stats {
            overall,
            group_by,
            groups,
            generated_at: now,
        }
    }

    /// pH compliance across industrial nodes
    pub fn compliance(&self, snapshots: &[NodeSnapshot], now: Timestamp) -> ComplianceSummary {
        let mut facilities = Vec::new();
        let mut critical_violations = 0;
        let mut warning_violations = 0;
        let mut violations_by_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut ph = Accumulator::default();

        for snapshot in snapshots
            .iter()
            .filter(|s| s.node.category == Category::Industrial)
        {
            let node = &snapshot.node;
            let facility_type = node
                .facility_type
                .clone()
                .unwrap_or_else(|| UNKNOWN_GROUP.to_string());

            let (ph_level, ph_status) =
                match self
                    .classifier
                    .check(node.category, snapshot.latest.as_ref(), now)
                {
                    Ok(reading) => {
                        let breach = status::evaluate(node.category, reading)
                            .into_iter()
                            .find(|b| b.rule.field == Field::PhLevel);
                        let ph_status = match breach.map(|b| b.severity()) {
                            Some(Severity::Critical) => StatusValue::Critical,
                            Some(Severity::Warning) => StatusValue::Warning,
                            _ => StatusValue::Normal,
                        };
                        (reading.ph_level, ph_status)
                    }
                    Err(_) => (None, StatusValue::Offline),
                };

            if let Some(value) = ph_level {
                ph.push(value);
            }

            match ph_status {
                StatusValue::Critical => critical_violations += 1,
                StatusValue::Warning => warning_violations += 1,
                _ => {}
            }
            if matches!(ph_status, StatusValue::Critical | StatusValue::Warning) {
                *violations_by_type.entry(facility_type.clone()).or_insert(0) += 1;
            }

            facilities.push(FacilityCompliance {
                node_id: node.id,
                name: node.name.clone(),
                facility_type,
                ph_level,
                ph_status,
            });
        }

        ComplianceSummary {
            facilities,
            critical_violations,
            warning_violations,
            violations_by_type,
            average_ph: ph.summary().mean,
            compliance_score: compliance_score(critical_violations, warning_violations),
            generated_at: now,
        }
    }
}

fn group_key(snapshot: &NodeSnapshot, group_by: GroupBy) -> String {
    let node = &snapshot.node;
    let key = match group_by {
        GroupBy::District => node.district.clone(),
        GroupBy::Facility => node.facility_type.clone(),
        GroupBy::Category => Some(node.category.to_string()),
    };
    key.filter(|k| !k.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_GROUP.to_string())
}

/// `100 - 10 * critical - 5 * warning`, clamped to [0, 100]
pub fn compliance_score(critical: usize, warning: usize) -> u32 {
    let penalty = critical.saturating_mul(10).saturating_add(warning.saturating_mul(5));
    100u32.saturating_sub(penalty.min(100) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Node, TelemetryReading};
    use chrono::{Duration, TimeZone, Utc};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn urban(id: u64, flow: Option<f64>, district: Option<&str>) -> NodeSnapshot {
        let mut node = Node::new(id, format!("Zone {}", id), Category::Urban, 28.6, 77.2);
        node.district = district.map(str::to_string);
        let reading = flow.map(|flow| {
            TelemetryReading::new(id, Category::Urban, now())
                .with(Field::FlowRate, flow)
                .with(Field::Pressure, 65.0)
                .with(Field::PhLevel, 7.2)
                .with(Field::Temperature, 21.0)
                .with(Field::Turbidity, 3.0)
        });
        NodeSnapshot::new(node, reading)
    }

    fn industrial(id: u64, ph: Option<f64>, facility: &str) -> NodeSnapshot {
        let node = Node::new(id, format!("Plant {}", id), Category::Industrial, 28.5, 77.3)
            .with_facility_type(facility);
        let reading = ph.map(|ph| {
            TelemetryReading::new(id, Category::Industrial, now())
                .with(Field::FlowRate, 100.0)
                .with(Field::Pressure, 85.0)
                .with(Field::PhLevel, ph)
                .with(Field::Temperature, 40.0)
                .with(Field::Turbidity, 15.0)
        });
        NodeSnapshot::new(node, reading)
    }

    #[test]
    fn test_mean_excludes_nodes_without_reading() {
        let stats = AggregationStats::default();
        let snapshots = vec![
            urban(1, Some(40.0), None),
            urban(2, Some(50.0), None),
            urban(3, None, None),
        ];

        let result = stats.aggregate(&snapshots, None, now());
        let flow = result.overall.field(Field::FlowRate);
        assert_eq!(flow.mean, Some(45.0));
        assert_eq!(flow.min, Some(40.0));
        assert_eq!(flow.max, Some(50.0));
        assert_eq!(flow.samples, 2);
        assert_eq!(result.overall.total, 3);
        assert_eq!(result.overall.status_count(StatusValue::Normal), 2);
        assert_eq!(result.overall.status_count(StatusValue::Offline), 1);
    }

    #[test]
    fn test_mean_excludes_stale_and_mismatched_readings() {
        let stats = AggregationStats::default();
        let mut stale = urban(2, Some(400.0), None);
        if let Some(reading) = stale.latest.as_mut() {
            reading.timestamp = now() - Duration::days(30);
        }
        let mut mismatched = urban(3, Some(900.0), None);
        if let Some(reading) = mismatched.latest.as_mut() {
            reading.category = Category::Industrial;
        }
        let snapshots = vec![urban(1, Some(40.0), None), stale, mismatched];

        let result = stats.aggregate(&snapshots, Some(GroupBy::Category), now());
        assert_eq!(result.overall.status_count(StatusValue::Offline), 2);
        let flow = result.overall.field(Field::FlowRate);
        assert_eq!(flow.mean, Some(40.0));
        assert_eq!(flow.samples, 1);
        assert_eq!(result.groups["urban"].field(Field::FlowRate).max, Some(40.0));
    }

    #[test]
    fn test_empty_input_is_well_defined() {
        let stats = AggregationStats::default();
        let result = stats.aggregate(&[], Some(GroupBy::District), now());

        assert_eq!(result.overall.total, 0);
        assert_eq!(result.overall.by_status.len(), 4);
        assert!(result.overall.by_status.values().all(|c| *c == 0));
        for field in Field::ALL {
            assert_eq!(result.overall.field(field), FieldSummary::default());
        }
        assert!(result.groups.is_empty());
    }

    #[test]
    fn test_field_without_samples_has_no_mean() {
        let stats = AggregationStats::default();
        let result = stats.aggregate(&[urban(1, Some(40.0), None)], None, now());
        assert_eq!(result.overall.field(Field::AquiferDepth).mean, None);
    }

    #[test]
    fn test_group_by_district_with_unknown() {
        let stats = AggregationStats::default();
        let snapshots = vec![
            urban(1, Some(40.0), Some("Central Delhi")),
            urban(2, Some(60.0), Some("Central Delhi")),
            urban(3, Some(20.0), Some("  ")),
            urban(4, None, None),
        ];

        let result = stats.aggregate(&snapshots, Some(GroupBy::District), now());
        assert_eq!(result.group_by, Some(GroupBy::District));
        assert_eq!(result.groups.len(), 2);

        let central = &result.groups["Central Delhi"];
        assert_eq!(central.total, 2);
        assert_eq!(central.field(Field::FlowRate).mean, Some(50.0));

        let unknown = &result.groups[UNKNOWN_GROUP];
        assert_eq!(unknown.total, 2);
        assert_eq!(unknown.status_count(StatusValue::Offline), 1);
        assert_eq!(unknown.field(Field::FlowRate).mean, Some(20.0));
    }

    #[test]
    fn test_group_by_category_and_facility() {
        let stats = AggregationStats::default();
        let snapshots = vec![
            urban(1, Some(40.0), None),
            industrial(2, Some(7.0), "textile"),
            industrial(3, Some(11.0), "pharma"),
        ];

        let by_category = stats.aggregate(&snapshots, Some(GroupBy::Category), now());
        assert_eq!(by_category.groups["urban"].total, 1);
        assert_eq!(by_category.groups["industrial"].total, 2);
        assert_eq!(
            by_category.groups["industrial"].status_count(StatusValue::Critical),
            1
        );

        let by_facility = stats.aggregate(&snapshots, Some(GroupBy::Facility), now());
        assert_eq!(by_facility.groups["textile"].total, 1);
        assert_eq!(by_facility.groups["pharma"].total, 1);
        assert_eq!(by_facility.groups[UNKNOWN_GROUP].total, 1);
    }

    #[test]
    fn test_compliance_summary() {
        let stats = AggregationStats::default();
        let mut stale = industrial(5, Some(4.0), "chemical");
        if let Some(reading) = stale.latest.as_mut() {
            reading.timestamp = now() - Duration::hours(48);
        }
        let snapshots = vec![
            industrial(1, Some(7.0), "textile"),
            industrial(2, Some(11.0), "textile"),
            industrial(3, Some(8.7), "pharma"),
            industrial(4, None, "pharma"),
            stale,
            urban(6, Some(40.0), None),
        ];

        let summary = stats.compliance(&snapshots, now());
        assert_eq!(summary.facilities.len(), 5);
        assert_eq!(summary.critical_violations, 1);
        assert_eq!(summary.warning_violations, 1);
        assert_eq!(summary.violations_by_type["textile"], 1);
        assert_eq!(summary.violations_by_type["pharma"], 1);
        assert_eq!(summary.compliance_score, 85);

        let mean = summary.average_ph.unwrap();
        assert!((mean - (7.0 + 11.0 + 8.7) / 3.0).abs() < 1e-9);

        let offline: Vec<_> = summary
            .facilities
            .iter()
            .filter(|f| f.ph_status == StatusValue::Offline)
            .map(|f| f.node_id)
            .collect();
        assert_eq!(offline, vec![4, 5]);
    }

    #[test]
    fn test_compliance_without_industrial_nodes() {
        let stats = AggregationStats::default();
        let summary = stats.compliance(&[urban(1, Some(40.0), None)], now());
        assert!(summary.facilities.is_empty());
        assert_eq!(summary.average_ph, None);
        assert_eq!(summary.compliance_score, 100);
    }

    #[test]
    fn test_compliance_score_clamps() {
        assert_eq!(compliance_score(0, 0), 100);
        assert_eq!(compliance_score(2, 3), 65);
        assert_eq!(compliance_score(11, 0), 0);
        assert_eq!(compliance_score(usize::MAX, usize::MAX), 0);
    }

    #[test]
    fn test_group_by_parsing() {
        assert_eq!("District".parse::<GroupBy>(), Ok(GroupBy::District));
        assert_eq!("facility_type".parse::<GroupBy>(), Ok(GroupBy::Facility));
        assert!("zone".parse::<GroupBy>().is_err());
    }

    #[test]
    fn test_stats_serialize_without_nan() {
        let stats = AggregationStats::default();
        let result = stats.aggregate(&[], None, now());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["total"], 0);
        assert_eq!(json["by_status"]["offline"], 0);
        assert!(json["fields"]["flow_rate"]["mean"].is_null());
        assert!(json.get("groups").is_none());
    }
}
