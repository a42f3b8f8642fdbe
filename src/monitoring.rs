//! Run-level monitoring for the simulation scheduler
//!
//! The scheduler records one [`CycleSummary`] per tick. The monitor keeps a
//! bounded window of recent cycles plus lifetime totals, and turns them into
//! a [`SimulationMetrics`] snapshot for logging.

use crate::events::Timestamp;
use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Outcome of one generate/submit tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    /// 1-based cycle number
    pub cycle: u64,
    pub started_at: Timestamp,
    /// Readings accepted by the sink
    pub submitted: usize,
    /// Readings rejected, timed out or lost with their task
    pub failed: usize,
    /// Nodes skipped because generation failed
    pub skipped: usize,
    /// Anomalies injected this tick
    pub anomalies: usize,
    pub duration: Duration,
}

impl CycleSummary {
    pub fn attempted(&self) -> usize {
        self.submitted + self.failed
    }
}

/// Snapshot of run-level counters
#[derive(Debug, Clone, Serialize)]
pub struct SimulationMetrics {
    pub cycles: u64,
    pub submitted: u64,
    pub failed: u64,
    pub skipped: u64,
    pub anomalies: u64,
    /// Percentage of attempted submissions accepted (100 with no attempts)
    pub success_rate: f64,
    /// Average tick duration over the recent window
    pub avg_cycle_ms: f64,
    pub timestamp: Timestamp,
}

#[derive(Debug, Default)]
struct Totals {
    cycles: u64,
    submitted: u64,
    failed: u64,
    skipped: u64,
    anomalies: u64,
}

/// Collects cycle summaries; clones share the same state
#[derive(Debug, Clone)]
pub struct SimulationMonitor {
    /// Most recent cycles, oldest first
    recent: Arc<Mutex<VecDeque<CycleSummary>>>,
    totals: Arc<Mutex<Totals>>,
    max_recent: usize,
}

impl Default for SimulationMonitor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl SimulationMonitor {
    /// Create a monitor keeping at most `max_recent` cycle summaries
    pub fn new(max_recent: usize) -> Self {
        Self {
            recent: Arc::new(Mutex::new(VecDeque::with_capacity(max_recent))),
            totals: Arc::new(Mutex::new(Totals::default())),
            max_recent,
        }
    }

    pub fn record_cycle(&self, summary: CycleSummary) {
        debug!("Recording cycle {} summary", summary.cycle);

        {
            let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
            totals.cycles += 1;
            totals.submitted += summary.submitted as u64;
            totals.failed += summary.failed as u64;
            totals.skipped += summary.skipped as u64;
            totals.anomalies += summary.anomalies as u64;
        }

        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        recent.push_back(summary);
        while recent.len() > self.max_recent {
            recent.pop_front();
        }
    }

    /// Recent cycle summaries, oldest first
    pub fn recent_cycles(&self) -> Vec<CycleSummary> {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn last_cycle(&self) -> Option<CycleSummary> {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }

    pub fn collect_metrics(&self) -> SimulationMetrics {
        let (cycles, submitted, failed, skipped, anomalies) = {
            let totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
            (
                totals.cycles,
                totals.submitted,
                totals.failed,
                totals.skipped,
                totals.anomalies,
            )
        };

        let attempted = submitted + failed;
        let success_rate = if attempted == 0 {
            100.0
        } else {
            submitted as f64 / attempted as f64 * 100.0
        };

        let avg_cycle_ms = {
            let recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
            if recent.is_empty() {
                0.0
            } else {
                recent
                    .iter()
                    .map(|c| c.duration.as_secs_f64() * 1000.0)
                    .sum::<f64>()
                    / recent.len() as f64
            }
        };

        SimulationMetrics {
            cycles,
            submitted,
            failed,
            skipped,
            anomalies,
            success_rate,
            avg_cycle_ms,
            timestamp: Utc::now(),
        }
    }

    /// Log the current metrics and warn about a degraded run
    pub fn log_metrics(&self) -> SimulationMetrics {
        let metrics = self.collect_metrics();

        info!(
            "Simulation metrics: cycles={}, submitted={}, failed={}, skipped={}, anomalies={}, success={:.1}%, avg_cycle={:.1}ms",
            metrics.cycles,
            metrics.submitted,
            metrics.failed,
            metrics.skipped,
            metrics.anomalies,
            metrics.success_rate,
            metrics.avg_cycle_ms
        );

        if metrics.success_rate < 90.0 {
            warn!("Low submission success rate: {:.1}%", metrics.success_rate);
        }

        metrics
    }
}
