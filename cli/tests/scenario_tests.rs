// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use fleet_core::application::{
    CoordinatorSettings, FleetCoordinator, StopReason, TickDriver,
};
use fleet_core::domain::graph::{Lane, NavGraph, Vertex, VertexId};
use fleet_core::domain::robot::{RobotId, RobotStatus};
use fleet_orchestrator::activity_log::ActivityLog;
use fleet_orchestrator::scenario::{Scenario, ScenarioPlan};
use parking_lot::Mutex;
use std::sync::Arc;

/// V0 - V1 - V2 corridor plus an unreachable V3.
fn corridor() -> Arc<NavGraph> {
    let graph = NavGraph::new(
        vec![
            Vertex::new(0, 0.0, 0.0).named("Dock"),
            Vertex::new(1, 1.0, 0.0),
            Vertex::new(2, 2.0, 0.0).named("Shelf"),
            Vertex::new(3, 9.0, 9.0),
        ],
        vec![Lane::new(0, 0, 1, 1.0), Lane::new(1, 1, 2, 1.0)],
    )
    .unwrap();
    Arc::new(graph)
}

struct Harness {
    _dir: tempfile::TempDir,
    log_path: std::path::PathBuf,
    log: Arc<ActivityLog>,
    fleet: FleetCoordinator,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("logs").join("fleet_logs.txt");
    let log = Arc::new(ActivityLog::create(&log_path).await.unwrap());
    let fleet = FleetCoordinator::new(corridor(), CoordinatorSettings::default(), log.clone());
    Harness {
        _dir: dir,
        log_path,
        log,
        fleet,
    }
}

async fn run(harness: Harness, scenario: &str) -> (ScenarioPlan, FleetCoordinator, String, StopReason) {
    let Harness {
        _dir,
        log_path,
        log,
        mut fleet,
    } = harness;
    let scenario = Scenario::from_yaml_str(scenario).unwrap();
    let mut plan = ScenarioPlan::spawn(&scenario, &mut fleet, &log).unwrap();

    let fleet = Arc::new(Mutex::new(fleet));
    let driver = TickDriver::new(fleet.clone(), 500);
    let outcome = driver
        .run(|fleet| plan.apply(fleet, &log), std::future::pending())
        .await;
    log.close().await.unwrap();

    let content = std::fs::read_to_string(&log_path).unwrap();
    drop(driver);
    let fleet = Arc::try_unwrap(fleet).ok().unwrap().into_inner();
    (plan, fleet, content, outcome.reason)
}

#[test]
fn test_scenario_accepts_indices_labels_and_names() {
    let scenario = Scenario::from_yaml_str(
        r#"
name: mixed
robots:
  - spawn: 0
    destination: Shelf
  - spawn: V2
    tasks:
      - to: Dock
        at_tick: 3
"#,
    )
    .unwrap();
    assert_eq!(scenario.display_name(), "mixed");
    assert_eq!(scenario.robots.len(), 2);
    assert_eq!(scenario.robots[0].assign_at_tick, 0);
    assert_eq!(scenario.robots[1].tasks[0].at_tick, 3);
    assert!(scenario.cancellations.is_empty());
}

#[test]
fn test_cancellation_of_unknown_robot_is_rejected() {
    let err = Scenario::from_yaml_str(
        r#"
robots:
  - spawn: 0
cancellations:
  - robot: 2
    at_tick: 1
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("names robot 2"));
}

#[tokio::test]
async fn test_unknown_spawn_vertex_spawns_nothing() {
    let mut harness = harness().await;
    let scenario = Scenario::from_yaml_str(
        r#"
robots:
  - spawn: 0
  - spawn: Loading Bay
"#,
    )
    .unwrap();
    let err = ScenarioPlan::spawn(&scenario, &mut harness.fleet, &harness.log).unwrap_err();
    assert!(format!("{:#}", err).contains("Robot 2 has an invalid spawn vertex"));
    assert_eq!(harness.fleet.robot_count(), 0);
}

#[tokio::test]
async fn test_head_on_scenario_runs_to_completion() {
    let harness = harness().await;
    let (plan, fleet, log, reason) = run(
        harness,
        r#"
robots:
  - spawn: Dock
    destination: Shelf
  - spawn: Shelf
    destination: Dock
"#,
    )
    .await;

    assert_eq!(reason, StopReason::Quiescent);
    assert_eq!(plan.assigned(), 2);
    assert!(plan.failures().is_empty());

    let first = fleet.robot_status(RobotId(1)).unwrap();
    let second = fleet.robot_status(RobotId(2)).unwrap();
    assert_eq!(first.status, RobotStatus::Complete);
    assert_eq!(first.current_vertex(), Some(VertexId(2)));
    assert_eq!(second.status, RobotStatus::Complete);
    assert_eq!(second.current_vertex(), Some(VertexId(0)));

    let lines: Vec<&str> = log.lines().collect();
    assert!(lines[0].contains(" - INFO - ROBOT_TRANSITION: "));
    assert_eq!(lines.iter().filter(|l| l.contains("- ROBOT_SPAWNED: ")).count(), 2);
    assert_eq!(lines.iter().filter(|l| l.contains("- TASK_ASSIGNED: ")).count(), 2);
    assert!(lines
        .iter()
        .any(|l| l.contains(r#"TASK_ASSIGNED: {"robot_id":1,"from":0,"to":2,"destination_name":"Shelf"}"#)));
    assert!(lines.iter().any(|l| l.contains(r#""kind":"queued""#)));
}

#[tokio::test]
async fn test_unreachable_destination_is_logged_and_run_continues() {
    let harness = harness().await;
    let (plan, fleet, log, reason) = run(
        harness,
        r#"
robots:
  - spawn: 0
    destination: 3
  - spawn: 2
    destination: 1
"#,
    )
    .await;

    assert_eq!(reason, StopReason::Quiescent);
    assert_eq!(plan.assigned(), 1);
    assert_eq!(plan.failures().len(), 1);
    assert_eq!(plan.failures()[0].robot, RobotId(1));
    assert_eq!(plan.failures()[0].destination, VertexId(3));

    assert_eq!(fleet.robot_status(RobotId(1)).unwrap().status, RobotStatus::Idle);
    assert_eq!(fleet.robot_status(RobotId(2)).unwrap().status, RobotStatus::Complete);
    assert!(log.contains(r#"TASK_ASSIGNMENT_FAILED: {"robot_id":1,"from":0,"to":3,"error":"No path from V0 to V3"}"#));
}

#[tokio::test]
async fn test_follow_up_task_waits_for_robot_to_finish() {
    let harness = harness().await;
    let (plan, fleet, log, _) = run(
        harness,
        r#"
robots:
  - spawn: Dock
    destination: Shelf
    tasks:
      - to: Dock
"#,
    )
    .await;

    assert_eq!(plan.assigned(), 2);
    let robot = fleet.robot_status(RobotId(1)).unwrap();
    assert_eq!(robot.status, RobotStatus::Complete);
    assert_eq!(robot.current_vertex(), Some(VertexId(0)));

    let assigned: Vec<&str> = log.lines().filter(|l| l.contains("- TASK_ASSIGNED: ")).collect();
    assert_eq!(assigned.len(), 2);
    assert!(assigned[1].contains(r#""from":2,"to":0"#));
}

#[tokio::test]
async fn test_scheduled_cancellation_stops_robot() {
    let harness = harness().await;
    let (_, fleet, log, reason) = run(
        harness,
        r#"
robots:
  - spawn: Dock
    destination: Shelf
cancellations:
  - robot: 1
    at_tick: 2
"#,
    )
    .await;

    assert_eq!(reason, StopReason::Quiescent);
    let robot = fleet.robot_status(RobotId(1)).unwrap();
    assert_eq!(robot.status, RobotStatus::Idle);
    assert_eq!(robot.current_vertex(), Some(VertexId(0)));
    assert!(robot.held.is_empty());
    assert!(log.contains(r#"TASK_CANCELLED: {"robot_id":1,"tick":2}"#));
}

#[tokio::test]
async fn test_robot_parked_mid_corridor_lets_traffic_through() {
    let harness = harness().await;
    let (plan, fleet, log, reason) = run(
        harness,
        r#"
robots:
  - spawn: Dock
    destination: V1
  - spawn: Shelf
    destination: Dock
"#,
    )
    .await;

    assert_eq!(reason, StopReason::Quiescent);
    assert_eq!(plan.assigned(), 2);

    let parked = fleet.robot_status(RobotId(1)).unwrap();
    let traveller = fleet.robot_status(RobotId(2)).unwrap();
    assert_eq!(parked.status, RobotStatus::Complete);
    assert_eq!(parked.current_vertex(), Some(VertexId(1)));
    assert_eq!(traveller.status, RobotStatus::Complete);
    assert_eq!(traveller.current_vertex(), Some(VertexId(0)));
    assert!(fleet.reservations().holders().next().is_none());
    assert!(!log.contains(r#""kind":"queued""#));
}
