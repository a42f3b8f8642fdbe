//! End-to-end scenarios across generator, store, classifier, alerts and stats

use aquanexus::aggregator::{AggregationStats, GroupBy};
use aquanexus::alerts::AlertEngine;
use aquanexus::events::{Category, Field, Node, NodeSnapshot, Severity, StatusValue, TelemetryReading};
use aquanexus::generator::TelemetryGenerator;
use aquanexus::scheduler::{SchedulerConfig, SchedulerState, SimulationScheduler};
use aquanexus::status::StatusClassifier;
use aquanexus::store::{InMemoryStore, MockSink};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

fn fleet() -> Vec<Node> {
    vec![
        Node::new(1, "Delhi - Connaught Place", Category::Urban, 28.63, 77.21)
            .with_district("New Delhi"),
        Node::new(2, "Delhi - Okhla Phase II", Category::Industrial, 28.53, 77.27)
            .with_facility_type("textile"),
        Node::new(3, "Delhi - Najafgarh", Category::Rural, 28.61, 76.98)
            .with_district("South West Delhi"),
    ]
}

fn nominal_urban(node_id: u64, at: chrono::DateTime<Utc>) -> TelemetryReading {
    TelemetryReading::new(node_id, Category::Urban, at)
        .with(Field::FlowRate, 45.5)
        .with(Field::Pressure, 65.0)
        .with(Field::PhLevel, 7.2)
        .with(Field::Temperature, 21.0)
        .with(Field::Turbidity, 3.0)
}

#[test]
fn low_urban_pressure_goes_critical_in_store() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let store = InMemoryStore::with_nodes(StatusClassifier::default(), fleet());

    let mut reading = nominal_urban(1, now);
    reading.pressure = Some(25.0);
    let status = store.record_at(reading, now).unwrap();

    assert_eq!(status, StatusValue::Critical);
    assert_eq!(store.node(1).unwrap().status, StatusValue::Critical);
}

#[test]
fn contamination_spike_alert_and_compliance() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let store = InMemoryStore::with_nodes(StatusClassifier::default(), fleet());
    let reading = TelemetryReading::new(2, Category::Industrial, now)
        .with(Field::FlowRate, 100.0)
        .with(Field::Pressure, 85.0)
        .with(Field::PhLevel, 11.0)
        .with(Field::Temperature, 40.0)
        .with(Field::Turbidity, 15.0);
    store.record_at(reading, now).unwrap();
    store.record_at(nominal_urban(1, now), now).unwrap();

    let snapshots = store.snapshots();
    let alerts = AlertEngine::default().compute_alerts(&snapshots, None, now);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].node_id, 2);
    assert_eq!(alerts[0].severity, Severity::Critical);
    assert!(alerts[0].message.contains("pH"));

    let compliance = AggregationStats::default().compliance(&snapshots, now);
    assert_eq!(compliance.critical_violations, 1);
    assert_eq!(compliance.compliance_score, 90);
}

#[test]
fn nominal_urban_reading_is_quiet() {
    let now = Utc::now();
    let snapshot = NodeSnapshot::new(fleet().remove(0), Some(nominal_urban(1, now)));
    let classifier = StatusClassifier::default();

    assert_eq!(classifier.classify_snapshot(&snapshot, now), StatusValue::Normal);
    assert!(AlertEngine::new(classifier)
        .compute_alerts(&[snapshot], None, now)
        .is_empty());
}

#[test]
fn node_without_reading_is_offline_and_excluded_from_means() {
    let now = Utc::now();
    let store = InMemoryStore::with_nodes(StatusClassifier::default(), fleet());
    store.record_at(nominal_urban(1, now), now).unwrap();

    let stats = AggregationStats::default().aggregate(&store.snapshots(), Some(GroupBy::Category), now);
    assert_eq!(stats.overall.status_count(StatusValue::Offline), 2);
    assert_eq!(stats.overall.field(Field::FlowRate).mean, Some(45.5));
    assert_eq!(stats.groups["rural"].status_count(StatusValue::Offline), 1);
}

#[test]
fn flow_mean_skips_missing_readings() {
    let now = Utc::now();
    let snapshots: Vec<_> = [Some(40.0), Some(50.0), None]
        .into_iter()
        .enumerate()
        .map(|(i, flow)| {
            let id = i as u64 + 1;
            let node = Node::new(id, format!("Zone {}", id), Category::Urban, 28.6, 77.2);
            let reading = flow.map(|f| nominal_urban(id, now).with(Field::FlowRate, f));
            NodeSnapshot::new(node, reading)
        })
        .collect();

    let stats = AggregationStats::default().aggregate(&snapshots, None, now);
    assert_eq!(stats.overall.field(Field::FlowRate).mean, Some(45.0));
}

#[test]
fn stale_reading_drops_alerts() {
    let now = Utc::now();
    let mut reading = nominal_urban(1, now - Duration::hours(30));
    reading.pressure = Some(10.0);
    let snapshot = NodeSnapshot::new(fleet().remove(0), Some(reading));

    assert_eq!(
        StatusClassifier::default().classify_snapshot(&snapshot, now),
        StatusValue::Offline
    );
    assert!(AlertEngine::default()
        .compute_alerts(&[snapshot], None, now)
        .is_empty());
}

#[tokio::test]
async fn failing_sink_counts_one_failure_per_cycle() {
    let sink = Arc::new(MockSink::failing_for([3]));
    let mut scheduler = SimulationScheduler::new(
        TelemetryGenerator::seeded(2024),
        sink.clone(),
        SchedulerConfig {
            interval: std::time::Duration::from_millis(5),
            cycles: Some(3),
            submit_timeout: std::time::Duration::from_secs(1),
        },
    );

    let report = scheduler.run(&fleet()).await;

    assert_eq!(report.final_state, SchedulerState::Completed);
    assert_eq!(report.cycles_completed, 3);
    assert_eq!(report.failed, 3);
    assert_eq!(report.submitted, 6);
    for cycle in scheduler.monitor().recent_cycles() {
        assert_eq!(cycle.failed, 1);
    }
    let accepted = sink.accepted();
    assert_eq!(accepted.iter().filter(|r| r.node_id == 1).count(), 3);
    assert_eq!(accepted.iter().filter(|r| r.node_id == 2).count(), 3);
}

#[tokio::test]
async fn simulated_fleet_flows_through_to_alerts_and_stats() {
    let classifier = StatusClassifier::default();
    let store = Arc::new(InMemoryStore::with_nodes(classifier, fleet()));
    let mut scheduler = SimulationScheduler::new(
        TelemetryGenerator::seeded(99),
        store.clone(),
        SchedulerConfig {
            interval: std::time::Duration::from_millis(5),
            cycles: Some(20),
            submit_timeout: std::time::Duration::from_secs(1),
        },
    );

    let report = scheduler.run(&fleet()).await;
    assert_eq!(report.submitted, 60);
    assert_eq!(store.reading_count(), 60);

    let now = Utc::now();
    let snapshots = store.snapshots();
    let stats = AggregationStats::new(classifier).aggregate(&snapshots, None, now);
    assert_eq!(stats.overall.total, 3);
    assert_eq!(stats.overall.status_count(StatusValue::Offline), 0);

    // Cached status agrees with a fresh classification and with the alerts
    let alerts = AlertEngine::new(classifier).compute_alerts(&snapshots, None, now);
    for snapshot in &snapshots {
        let status = classifier.classify_snapshot(snapshot, now);
        assert_eq!(snapshot.node.status, status);
        let worst = alerts
            .iter()
            .filter(|a| a.node_id == snapshot.node.id)
            .map(|a| a.severity)
            .max();
        let expected = match worst {
            Some(Severity::Critical) => StatusValue::Critical,
            Some(Severity::Warning) => StatusValue::Warning,
            _ => StatusValue::Normal,
        };
        assert_eq!(status, expected);
    }
}
