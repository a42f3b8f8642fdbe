use crate::error::SubmissionError;
use crate::events::{NodeId, TelemetryReading};
use crate::store::IngestionSink;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Scriptable ingestion sink for tests and dry runs
///
/// Accepts everything except readings from nodes listed as failing, and
/// optionally delays every submission or only those of selected nodes.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    failing: HashSet<NodeId>,
    delay: Option<Duration>,
    node_delays: HashMap<NodeId, Duration>,
    accepted: Arc<Mutex<Vec<TelemetryReading>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockSink {
    /// Sink that accepts every reading
    pub fn success() -> Self {
        Self::default()
    }

    /// Sink that rejects every reading from the given nodes
    pub fn failing_for(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            failing: nodes.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Delay every submission by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay only submissions from `node`, overriding any sink-wide delay
    pub fn with_delay_for(mut self, node: NodeId, delay: Duration) -> Self {
        self.node_delays.insert(node, delay);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Readings accepted so far, in arrival order
    pub fn accepted(&self) -> Vec<TelemetryReading> {
        self.accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl IngestionSink for MockSink {
    fn submit<'a>(
        &'a self,
        reading: &'a TelemetryReading,
    ) -> Pin<Box<dyn Future<Output = Result<(), SubmissionError>> + Send + 'a>> {
        Box::pin(async move {
            *self.call_count.lock().unwrap_or_else(PoisonError::into_inner) += 1;

            let delay = self.node_delays.get(&reading.node_id).copied().or(self.delay);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if self.failing.contains(&reading.node_id) {
                return Err(SubmissionError::Rejected(format!(
                    "mock rejection for node {}",
                    reading.node_id
                )));
            }

            self.accepted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(reading.clone());
            Ok(())
        })
    }
}
