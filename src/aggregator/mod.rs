/// Fleet rollups and compliance scoring
pub mod stats;

/// Historical trend series
pub mod trends;

pub use stats::{
    compliance_score, AggregationStats, ComplianceSummary, FacilityCompliance, FieldSummary,
    GroupBy, GroupStats, Stats, UNKNOWN_GROUP,
};
pub use trends::{monthly_trend, TrendPoint};
