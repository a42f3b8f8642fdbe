use crate::error::SubmissionError;
use crate::events::{Node, NodeId};
use crate::generator::TelemetryGenerator;
use crate::monitoring::{CycleSummary, SimulationMonitor};
use crate::store::IngestionSink;
use chrono::Utc;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Scheduler timing configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Pause between the end of one tick and the start of the next
    pub interval: Duration,
    /// Number of ticks to run; `None` runs until stopped
    pub cycles: Option<u64>,
    /// Upper bound on each individual submission
    pub submit_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            cycles: None,
            submit_timeout: Duration::from_secs(5),
        }
    }
}

/// Lifecycle of a scheduler run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
    /// Ended by a stop request
    Stopped,
    /// Ran its configured number of cycles, or had nothing to run
    Completed,
}

/// Cloneable handle to stop a running scheduler and observe its state
///
/// A stop takes effect at the next tick boundary; a scheduler sleeping
/// between ticks wakes immediately. A stop is permanent for the scheduler it
/// belongs to.
#[derive(Debug, Clone)]
pub struct StopHandle {
    stop: Arc<watch::Sender<bool>>,
    state: watch::Receiver<SchedulerState>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.stop.borrow()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }
}

/// Totals for a whole run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub cycles_completed: u64,
    pub submitted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub anomalies: usize,
    pub final_state: SchedulerState,
}

impl RunReport {
    fn empty(final_state: SchedulerState) -> Self {
        Self {
            cycles_completed: 0,
            submitted: 0,
            failed: 0,
            skipped: 0,
            anomalies: 0,
            final_state,
        }
    }

    fn add(&mut self, cycle: &CycleSummary) {
        self.cycles_completed += 1;
        self.submitted += cycle.submitted;
        self.failed += cycle.failed;
        self.skipped += cycle.skipped;
        self.anomalies += cycle.anomalies;
    }
}

/// Drives repeated generate/submit cycles over a node fleet
///
/// Each tick generates one reading per node, submits them all concurrently
/// (one task per node, each under its own timeout) and waits for every
/// submission before the tick ends. A failed submission is counted and never
/// retried; the node simply gets a fresh reading next tick.
pub struct SimulationScheduler<R = StdRng> {
    generator: TelemetryGenerator<R>,
    sink: Arc<dyn IngestionSink>,
    config: SchedulerConfig,
    monitor: SimulationMonitor,
    stop: Arc<watch::Sender<bool>>,
    state: watch::Sender<SchedulerState>,
}

impl<R: Rng> SimulationScheduler<R> {
    pub fn new(
        generator: TelemetryGenerator<R>,
        sink: Arc<dyn IngestionSink>,
        config: SchedulerConfig,
    ) -> Self {
        let (stop, _) = watch::channel(false);
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            generator,
            sink,
            config,
            monitor: SimulationMonitor::default(),
            stop: Arc::new(stop),
            state,
        }
    }

    /// Record cycle summaries into a shared monitor
    pub fn with_monitor(mut self, monitor: SimulationMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn monitor(&self) -> &SimulationMonitor {
        &self.monitor
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: Arc::clone(&self.stop),
            state: self.state.subscribe(),
        }
    }

    fn set_state(&self, state: SchedulerState) {
        debug!("Scheduler state: {:?}", state);
        self.state.send_replace(state);
    }

    /// Run cycles until the configured count is reached or a stop is requested
    ///
    /// # Arguments
    ///
    /// * `nodes` - Fleet to simulate; every node gets one reading per tick
    ///
    /// # Returns
    ///
    /// Totals for the run. Generation and submission failures are counted,
    /// never returned as errors.
    pub async fn run(&mut self, nodes: &[Node]) -> RunReport {
        if nodes.is_empty() {
            error!("No nodes to simulate, nothing to do");
            self.set_state(SchedulerState::Completed);
            return RunReport::empty(SchedulerState::Completed);
        }

        let mut stop_rx = self.stop.subscribe();
        let mut report = RunReport::empty(SchedulerState::Running);
        self.set_state(SchedulerState::Running);

        info!(
            "Starting simulation for {} nodes (interval {:?}, cycles {})",
            nodes.len(),
            self.config.interval,
            self.config
                .cycles
                .map_or_else(|| "unbounded".to_string(), |c| c.to_string())
        );

        let final_state = loop {
            if *stop_rx.borrow() {
                break SchedulerState::Stopped;
            }
            if self
                .config
                .cycles
                .is_some_and(|limit| report.cycles_completed >= limit)
            {
                break SchedulerState::Completed;
            }

            let summary = self.run_cycle(report.cycles_completed + 1, nodes).await;
            info!(
                "Cycle {}: submitted {}, failed {}, skipped {} ({} anomalies, {:?})",
                summary.cycle,
                summary.submitted,
                summary.failed,
                summary.skipped,
                summary.anomalies,
                summary.duration
            );
            report.add(&summary);
            self.monitor.record_cycle(summary);

            // No pause after the final bounded cycle
            if self
                .config
                .cycles
                .is_some_and(|limit| report.cycles_completed >= limit)
            {
                break SchedulerState::Completed;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = stop_rx.wait_for(|stopped| *stopped) => {
                    info!("Stop requested, ending simulation");
                    break SchedulerState::Stopped;
                }
            }
        };

        self.set_state(final_state);
        report.final_state = final_state;
        info!(
            "Simulation {:?} after {} cycles: {} submitted, {} failed, {} skipped",
            final_state, report.cycles_completed, report.submitted, report.failed, report.skipped
        );
        report
    }

    /// Generate and submit one reading per node
    async fn run_cycle(&mut self, cycle: u64, nodes: &[Node]) -> CycleSummary {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut skipped = 0;
        let mut anomalies = 0;
        let mut tasks: JoinSet<(NodeId, Result<(), SubmissionError>)> = JoinSet::new();

        for node in nodes {
            let generated = match self.generator.generate(node, started_at) {
                Ok(generated) => generated,
                Err(e) => {
                    warn!("Skipping node {} this cycle: {}", node.id, e);
                    skipped += 1;
                    continue;
                }
            };
            anomalies += generated.anomalies.len();
            debug!("Node {} reading: {:?}", node.id, generated.reading);

            let sink = Arc::clone(&self.sink);
            let timeout = self.config.submit_timeout;
            let node_id = node.id;
            let reading = generated.reading;
            tasks.spawn(async move {
                let result = match tokio::time::timeout(timeout, sink.submit(&reading)).await {
                    Ok(result) => result,
                    Err(_) => Err(SubmissionError::Timeout),
                };
                (node_id, result)
            });
        }

        let mut submitted = 0;
        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => submitted += 1,
                Ok((node_id, Err(e))) => {
                    warn!("Submission failed for node {}: {}", node_id, e);
                    failed += 1;
                }
                Err(e) => {
                    warn!("{}", SubmissionError::TaskFailed(e.to_string()));
                    failed += 1;
                }
            }
        }

        CycleSummary {
            cycle,
            started_at,
            submitted,
            failed,
            skipped,
            anomalies,
            duration: start.elapsed(),
        }
    }
}
