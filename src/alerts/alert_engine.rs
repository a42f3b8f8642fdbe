use crate::events::{
    Category, Field, Node, NodeId, NodeSnapshot, Severity, TelemetryReading, Timestamp,
};
use crate::status::{Breach, StatusClassifier};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

/// One alert derived from a node's latest reading
///
/// Alerts are never stored; they are recomputed from current telemetry every
/// time they are queried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRecord {
    /// `"{node_id}-{kind}"`
    pub id: String,
    pub node_id: NodeId,
    pub node_name: String,
    pub category: Category,
    /// Alert type such as `pressure`, `ph` or `aquifer`
    pub kind: String,
    pub field: Field,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
    pub value_display: String,
    pub threshold_display: String,
    /// Timestamp of the reading that triggered the alert
    pub timestamp: Timestamp,
}

impl AlertRecord {
    fn from_breach(node: &Node, reading: &TelemetryReading, breach: &Breach) -> Self {
        let rule = breach.rule;
        Self {
            id: format!("{}-{}", node.id, rule.kind),
            node_id: node.id,
            node_name: node.name.clone(),
            category: node.category,
            kind: rule.kind.to_string(),
            field: rule.field,
            severity: rule.severity,
            title: rule.title.to_string(),
            message: format!("{} at {}", rule.message, node.name),
            value: breach.value,
            threshold: breach.threshold(),
            value_display: rule.field.format_value(breach.value),
            threshold_display: rule.comparison.describe(rule.field),
            timestamp: reading.timestamp,
        }
    }

    fn from_advisory(node: &Node, reading: &TelemetryReading, advisory: Advisory) -> Self {
        Self {
            id: format!("{}-{}", node.id, advisory.kind),
            node_id: node.id,
            node_name: node.name.clone(),
            category: node.category,
            kind: advisory.kind,
            field: advisory.field,
            severity: Severity::Info,
            title: advisory.title,
            message: format!("{} at {}", advisory.message, node.name),
            value: advisory.value,
            threshold: advisory.threshold,
            value_display: advisory.field.format_value(advisory.value),
            threshold_display: advisory.field.format_value(advisory.threshold),
            timestamp: reading.timestamp,
        }
    }
}

/// Informational finding produced by an [`AdvisoryRule`]
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory {
    pub kind: String,
    pub field: Field,
    pub title: String,
    /// Message stem; the engine appends the node name
    pub message: String,
    pub value: f64,
    pub threshold: f64,
}

/// Extension point for `info` alerts
///
/// Advisory rules only ever see readings that passed classification, and
/// whatever they return is recorded with [`Severity::Info`].
pub trait AdvisoryRule: Send + Sync {
    /// Rule name for logging
    fn name(&self) -> &str;

    /// Inspect a valid reading and return any advisories
    fn evaluate(&self, node: &Node, reading: &TelemetryReading) -> Vec<Advisory>;
}

/// Summary returned by [`AlertEngine::report`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertReport {
    pub alerts: Vec<AlertRecord>,
    /// Distinct nodes with at least one alert
    pub nodes_affected: usize,
    /// Warning and critical alerts
    pub total_violations: usize,
    /// `"all"` or the category the report was filtered to
    pub context: String,
    pub generated_at: Timestamp,
}

impl AlertReport {
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.alerts.iter().filter(|a| a.severity == severity).count()
    }
}

/// Derives ranked alerts from the latest reading of every node
///
/// Breaches come from the same threshold table the [`StatusClassifier`] uses,
/// so a node's alerts always agree with its status. Readings the classifier
/// would report as offline produce no alerts.
#[derive(Clone, Default)]
pub struct AlertEngine {
    classifier: StatusClassifier,
    advisories: Vec<Arc<dyn AdvisoryRule>>,
}

impl AlertEngine {
    pub fn new(classifier: StatusClassifier) -> Self {
        Self {
            classifier,
            advisories: Vec::new(),
        }
    }

    /// Register an advisory rule
    pub fn with_advisory(mut self, rule: Arc<dyn AdvisoryRule>) -> Self {
        self.advisories.push(rule);
        self
    }

    pub fn classifier(&self) -> &StatusClassifier {
        &self.classifier
    }

    /// Compute alerts across nodes
    ///
    /// # Arguments
    ///
    /// * `snapshots` - Nodes paired with their latest reading
    /// * `context` - Restrict to one category, or `None` for all
    /// * `now` - Reference time for the staleness check
    ///
    /// # Returns
    ///
    /// Alerts ordered by reading timestamp (newest first), then severity
    /// (critical first), then node id, then threshold table order.
    pub fn compute_alerts(
        &self,
        snapshots: &[NodeSnapshot],
        context: Option<Category>,
        now: Timestamp,
    ) -> Vec<AlertRecord> {
        let mut alerts = Vec::new();

        for snapshot in snapshots {
            let node = &snapshot.node;
            if context.is_some_and(|c| c != node.category) {
                continue;
            }

            let reading = match self
                .classifier
                .check(node.category, snapshot.latest.as_ref(), now)
            {
                Ok(reading) => reading,
                Err(_) => continue,
            };

            for breach in crate::status::evaluate(node.category, reading) {
                alerts.push(AlertRecord::from_breach(node, reading, &breach));
            }

            for rule in &self.advisories {
                let advisories = rule.evaluate(node, reading);
                if !advisories.is_empty() {
                    debug!(
                        "Advisory rule {} raised {} alert(s) for node {}",
                        rule.name(),
                        advisories.len(),
                        node.id
                    );
                }
                for advisory in advisories {
                    alerts.push(AlertRecord::from_advisory(node, reading, advisory));
                }
            }
        }

        // Stable sort keeps table order for equal keys
        alerts.sort_by_key(|a| (Reverse(a.timestamp), Reverse(a.severity), a.node_id));
        alerts
    }

    /// Compute alerts and wrap them with summary counts
    pub fn report(
        &self,
        snapshots: &[NodeSnapshot],
        context: Option<Category>,
        now: Timestamp,
    ) -> AlertReport {
        let alerts = self.compute_alerts(snapshots, context, now);
        let nodes_affected = alerts.iter().map(|a| a.node_id).collect::<HashSet<_>>().len();
        let total_violations = alerts
            .iter()
            .filter(|a| a.severity >= Severity::Warning)
            .count();

        AlertReport {
            alerts,
            nodes_affected,
            total_violations,
            context: context.map_or_else(|| "all".to_string(), |c| c.to_string()),
            generated_at: now,
        }
    }
}
