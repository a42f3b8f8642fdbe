//! Narrow interfaces to the outside world
//!
//! The core never talks to a database or an HTTP router directly. Readings go
//! out through an [`IngestionSink`], the fleet comes in through a
//! [`NodeDirectory`], and the read path pulls the latest reading per node from
//! a [`ReadingStore`].

pub mod http;
pub mod memory;
pub mod mock;

pub use http::HttpIngestClient;
pub use memory::InMemoryStore;
pub use mock::MockSink;

use crate::error::{DirectoryError, SubmissionError};
use crate::events::{Category, Node, NodeId, NodeSnapshot, TelemetryReading, Timestamp};
use std::future::Future;
use std::pin::Pin;

/// Destination for generated readings
pub trait IngestionSink: Send + Sync {
    fn submit<'a>(
        &'a self,
        reading: &'a TelemetryReading,
    ) -> Pin<Box<dyn Future<Output = Result<(), SubmissionError>> + Send + 'a>>;
}

/// Source of the node fleet
pub trait NodeDirectory: Send + Sync {
    /// List nodes, optionally restricted to one category
    fn list_nodes<'a>(
        &'a self,
        category: Option<Category>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Node>, DirectoryError>> + Send + 'a>>;
}

/// Latest and historical reading lookups
#[cfg_attr(test, mockall::automock)]
pub trait ReadingStore: Send + Sync {
    /// Reading with the greatest timestamp; ties go to the later insertion
    fn latest_reading(&self, node_id: NodeId) -> Option<TelemetryReading>;

    /// Readings with `from <= timestamp <= to`, ordered ascending
    fn readings(&self, node_id: NodeId, from: Timestamp, to: Timestamp) -> Vec<TelemetryReading>;
}

/// Pair every node with its latest reading
pub fn snapshots(nodes: &[Node], store: &dyn ReadingStore) -> Vec<NodeSnapshot> {
    nodes
        .iter()
        .map(|node| NodeSnapshot::new(node.clone(), store.latest_reading(node.id)))
        .collect()
}
