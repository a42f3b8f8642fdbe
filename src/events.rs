//! Core domain types for the water monitoring core
//!
//! This module defines the fundamental data structures shared by the generator,
//! the classifier, the alert engine and the aggregation layer: nodes, their
//! categories, telemetry readings and the derived status and severity enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Identifier of a monitored node
pub type NodeId = u64;

/// Physical domain a node belongs to
///
/// The category decides which telemetry fields a node reports and which
/// thresholds apply to them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Urban distribution network
    Urban,
    /// Industrial effluent monitoring
    Industrial,
    /// Rural groundwater station
    Rural,
}

impl Category {
    /// Every category, in a stable order
    pub const ALL: [Category; 3] = [Category::Urban, Category::Industrial, Category::Rural];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Urban => "urban",
            Category::Industrial => "industrial",
            Category::Rural => "rural",
        }
    }

    /// Fields a well-formed reading of this category must carry
    pub fn required_fields(&self) -> &'static [Field] {
        match self {
            Category::Urban | Category::Industrial => &[
                Field::FlowRate,
                Field::Pressure,
                Field::PhLevel,
                Field::Temperature,
                Field::Turbidity,
            ],
            Category::Rural => &[
                Field::AquiferDepth,
                Field::WaterTable,
                Field::RechargeRate,
            ],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "urban" => Ok(Category::Urban),
            "industrial" => Ok(Category::Industrial),
            "rural" => Ok(Category::Rural),
            other => Err(format!("unknown node category: {}", other)),
        }
    }
}

/// Named telemetry field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FlowRate,
    Pressure,
    PhLevel,
    Temperature,
    Turbidity,
    #[serde(rename = "aquifer_depth_m")]
    AquiferDepth,
    #[serde(rename = "water_table_m")]
    WaterTable,
    RechargeRate,
}

impl Field {
    /// Every field, in wire order
    pub const ALL: [Field; 8] = [
        Field::FlowRate,
        Field::Pressure,
        Field::PhLevel,
        Field::Temperature,
        Field::Turbidity,
        Field::AquiferDepth,
        Field::WaterTable,
        Field::RechargeRate,
    ];

    /// Wire name of the field
    pub fn name(&self) -> &'static str {
        match self {
            Field::FlowRate => "flow_rate",
            Field::Pressure => "pressure",
            Field::PhLevel => "ph_level",
            Field::Temperature => "temperature",
            Field::Turbidity => "turbidity",
            Field::AquiferDepth => "aquifer_depth_m",
            Field::WaterTable => "water_table_m",
            Field::RechargeRate => "recharge_rate",
        }
    }

    /// Display unit, empty for dimensionless fields
    pub fn unit(&self) -> &'static str {
        match self {
            Field::FlowRate => "L/s",
            Field::Pressure => "PSI",
            Field::PhLevel => "",
            Field::Temperature => "°C",
            Field::Turbidity => "NTU",
            Field::AquiferDepth | Field::WaterTable => "m",
            Field::RechargeRate => "mm/month",
        }
    }

    /// Physically meaningful bounds no reading may leave
    pub fn hard_bounds(&self) -> (f64, f64) {
        match self {
            Field::FlowRate => (0.0, 500.0),
            Field::Pressure => (0.0, 200.0),
            Field::PhLevel => (0.0, 14.0),
            Field::Temperature => (0.0, 100.0),
            Field::Turbidity => (0.0, 1000.0),
            Field::AquiferDepth | Field::WaterTable => (0.0, 300.0),
            Field::RechargeRate => (0.0, 100.0),
        }
    }

    /// Format a value with this field's unit
    pub fn format_value(&self, value: f64) -> String {
        match self.unit() {
            "" => format!("{:.2}", value),
            unit => format!("{:.2} {}", value, unit),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Geographic position of a node
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// A monitored physical location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Serialized as `node_type` to match the ingestion API
    #[serde(rename = "node_type")]
    pub category: Category,
    #[serde(flatten)]
    pub location: Location,
    /// District or zone name (urban and rural nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    /// Facility type such as "textile" or "pharma" (industrial nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_type: Option<String>,
    /// Last status computed by the classifier, cached for display
    #[serde(default)]
    pub status: StatusValue,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, category: Category, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            location: Location {
                latitude,
                longitude,
            },
            district: None,
            facility_type: None,
            status: StatusValue::Normal,
        }
    }

    pub fn with_district(mut self, district: impl Into<String>) -> Self {
        self.district = Some(district.into());
        self
    }

    pub fn with_facility_type(mut self, facility_type: impl Into<String>) -> Self {
        self.facility_type = Some(facility_type.into());
        self
    }
}

/// One timestamped set of sensor values for a node
///
/// Every field is optional on the wire; which ones are required depends on
/// the node's category (see [`Category::required_fields`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryReading {
    pub node_id: NodeId,
    pub category: Category,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turbidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aquifer_depth_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_table_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recharge_rate: Option<f64>,
}

impl TelemetryReading {
    /// Create an empty reading; fields are filled with [`TelemetryReading::with`]
    pub fn new(node_id: NodeId, category: Category, timestamp: Timestamp) -> Self {
        Self {
            node_id,
            category,
            timestamp,
            flow_rate: None,
            pressure: None,
            ph_level: None,
            temperature: None,
            turbidity: None,
            aquifer_depth_m: None,
            water_table_m: None,
            recharge_rate: None,
        }
    }

    /// Builder-style setter
    pub fn with(mut self, field: Field, value: f64) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::FlowRate => self.flow_rate,
            Field::Pressure => self.pressure,
            Field::PhLevel => self.ph_level,
            Field::Temperature => self.temperature,
            Field::Turbidity => self.turbidity,
            Field::AquiferDepth => self.aquifer_depth_m,
            Field::WaterTable => self.water_table_m,
            Field::RechargeRate => self.recharge_rate,
        }
    }

    pub fn set(&mut self, field: Field, value: f64) {
        let slot = match field {
            Field::FlowRate => &mut self.flow_rate,
            Field::Pressure => &mut self.pressure,
            Field::PhLevel => &mut self.ph_level,
            Field::Temperature => &mut self.temperature,
            Field::Turbidity => &mut self.turbidity,
            Field::AquiferDepth => &mut self.aquifer_depth_m,
            Field::WaterTable => &mut self.water_table_m,
            Field::RechargeRate => &mut self.recharge_rate,
        };
        *slot = Some(value);
    }

    /// Present fields with their values, in wire order
    pub fn values(&self) -> impl Iterator<Item = (Field, f64)> + '_ {
        Field::ALL
            .iter()
            .filter_map(move |field| self.get(*field).map(|value| (*field, value)))
    }
}

/// A node paired with its latest reading, the input of every read path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSnapshot {
    pub node: Node,
    pub latest: Option<TelemetryReading>,
}

impl NodeSnapshot {
    pub fn new(node: Node, latest: Option<TelemetryReading>) -> Self {
        Self { node, latest }
    }
}

/// Derived operating status of a node
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum StatusValue {
    #[default]
    Normal,
    Warning,
    Critical,
    Offline,
}

impl StatusValue {
    pub const ALL: [StatusValue; 4] = [
        StatusValue::Normal,
        StatusValue::Warning,
        StatusValue::Critical,
        StatusValue::Offline,
    ];
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusValue::Normal => "normal",
            StatusValue::Warning => "warning",
            StatusValue::Critical => "critical",
            StatusValue::Offline => "offline",
        };
        f.write_str(s)
    }
}

/// Severity level for alerts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory, no threshold breached
    Info,
    /// Soft threshold breached
    Warning,
    /// Hard threshold breached
    Critical,
}

/// Emitted by the generator whenever an anomaly replaces a baseline draw
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyEvent {
    pub node_id: NodeId,
    pub field: Field,
    pub label: String,
    pub value: f64,
    pub timestamp: Timestamp,
}
