//! In-process append-only store
//!
//! Used by the CLI's `memory` destination and by tests. Every write is
//! classified immediately and the result cached on the node.

use crate::error::{DirectoryError, SubmissionError};
use crate::events::{Category, Node, NodeId, NodeSnapshot, StatusValue, TelemetryReading, Timestamp};
use crate::status::StatusClassifier;
use crate::store::{IngestionSink, NodeDirectory, ReadingStore};
use chrono::Utc;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};

/// Append-only reading store keyed by node
#[derive(Debug, Default)]
pub struct InMemoryStore {
    nodes: RwLock<BTreeMap<NodeId, Node>>,
    readings: RwLock<HashMap<NodeId, Vec<TelemetryReading>>>,
    classifier: StatusClassifier,
}

impl InMemoryStore {
    pub fn new(classifier: StatusClassifier) -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            readings: RwLock::new(HashMap::new()),
            classifier,
        }
    }

    /// Create a store provisioned with `nodes`
    pub fn with_nodes(classifier: StatusClassifier, nodes: impl IntoIterator<Item = Node>) -> Self {
        let store = Self::new(classifier);
        for node in nodes {
            store.add_node(node);
        }
        store
    }

    /// Provision a node, replacing any node with the same id
    pub fn add_node(&self, node: Node) {
        self.nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node.id, node);
    }

    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// All nodes ordered by id
    pub fn nodes(&self) -> Vec<Node> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn reading_count(&self) -> usize {
        self.readings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Append a reading and refresh the node's cached status
    pub fn record(&self, reading: TelemetryReading) -> Result<StatusValue, SubmissionError> {
        self.record_at(reading, Utc::now())
    }

    /// [`record`](Self::record) with an explicit classification time
    pub fn record_at(
        &self,
        reading: TelemetryReading,
        now: Timestamp,
    ) -> Result<StatusValue, SubmissionError> {
        let category = self
            .node(reading.node_id)
            .map(|n| n.category)
            .ok_or_else(|| SubmissionError::Rejected(format!("unknown node {}", reading.node_id)))?;

        if reading.category != category {
            return Err(SubmissionError::Rejected(format!(
                "node {} is {}, reading is {}",
                reading.node_id, category, reading.category
            )));
        }

        let node_id = reading.node_id;
        // Lock order is readings then nodes; holding both keeps the cached
        // status in step with the newest stored reading.
        let mut readings = self.readings.write().unwrap_or_else(PoisonError::into_inner);
        let history = readings.entry(node_id).or_default();
        history.push(reading);
        let latest = newest(history);
        let status = self.classifier.classify(category, latest, now);

        if let Some(node) = self
            .nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&node_id)
        {
            node.status = status;
        }
        drop(readings);

        debug!("Recorded reading for node {} ({})", node_id, status);
        Ok(status)
    }

    /// Every node paired with its latest reading
    pub fn snapshots(&self) -> Vec<NodeSnapshot> {
        crate::store::snapshots(&self.nodes(), self)
    }
}

impl ReadingStore for InMemoryStore {
    fn latest_reading(&self, node_id: NodeId) -> Option<TelemetryReading> {
        self.readings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&node_id)
            .and_then(|readings| newest(readings).cloned())
    }

    fn readings(&self, node_id: NodeId, from: Timestamp, to: Timestamp) -> Vec<TelemetryReading> {
        let mut found: Vec<TelemetryReading> = self
            .readings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&node_id)
            .map(|readings| {
                readings
                    .iter()
                    .filter(|r| r.timestamp >= from && r.timestamp <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // Stable, so equal timestamps keep insertion order
        found.sort_by_key(|r| r.timestamp);
        found
    }
}

impl IngestionSink for InMemoryStore {
    fn submit<'a>(
        &'a self,
        reading: &'a TelemetryReading,
    ) -> Pin<Box<dyn Future<Output = Result<(), SubmissionError>> + Send + 'a>> {
        Box::pin(async move { self.record(reading.clone()).map(|_| ()) })
    }
}

impl NodeDirectory for InMemoryStore {
    fn list_nodes<'a>(
        &'a self,
        category: Option<Category>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Node>, DirectoryError>> + Send + 'a>> {
        Box::pin(async move {
            Ok(self
                .nodes()
                .into_iter()
                .filter(|n| category.map_or(true, |c| n.category == c))
                .collect())
        })
    }
}

/// Newest reading by timestamp; the last of equal maxima wins
fn newest(readings: &[TelemetryReading]) -> Option<&TelemetryReading> {
    readings.iter().max_by_key(|r| r.timestamp)
}
